use std::collections::BTreeSet;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use url::Url;

use pulseboard_core::{
    config::{normalize_host, DashboardConfig},
    error::{SkipReason, SkipTally},
    event::Event,
};

use crate::aggregate::Tally;

/// Bucket for referrers that are not parseable URLs with a host.
pub const INVALID_REFERRER: &str = "(Invalid/Other)";
pub const DIRECT_REFERRER: &str = "(direct)";
const APP_SCHEMES: [&str; 2] = ["android-app://", "ios-app://"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: usize,
}

/// Headline numbers shown above the charts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_pageviews: usize,
    pub unique_day_count: usize,
    pub top_country: Option<CountryCount>,
    pub top_referrer_domain: Option<DomainCount>,
}

/// How a raw referrer counts towards the top-referrer statistic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferrerClass {
    /// Empty, direct, app-scheme or same-site referrers.
    Excluded,
    Domain(String),
    Invalid,
}

pub fn referrer_domain(raw: &str, own_host: Option<&str>) -> ReferrerClass {
    let raw = raw.trim();
    if raw.is_empty() || raw == DIRECT_REFERRER {
        return ReferrerClass::Excluded;
    }
    let lower = raw.to_ascii_lowercase();
    if APP_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return ReferrerClass::Excluded;
    }

    let host = match Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) if !host.is_empty() => normalize_host(host),
            _ => return ReferrerClass::Invalid,
        },
        Err(_) => return ReferrerClass::Invalid,
    };
    if own_host.is_some_and(|own| normalize_host(own) == host) {
        return ReferrerClass::Excluded;
    }
    ReferrerClass::Domain(host)
}

/// Calendar date of an event in `tz`.
pub fn local_day(event: &Event, tz: Tz) -> Result<NaiveDate, SkipReason> {
    event
        .occurred_at()
        .map(|at| at.with_timezone(&tz).date_naive())
}

pub fn summarize(events: &[Event], cfg: &DashboardConfig) -> Summary {
    let mut total_pageviews = 0;
    let mut days = BTreeSet::new();
    let mut undated = SkipTally::default();
    let mut countries = Tally::default();
    let mut referrers = Tally::default();

    for event in events {
        if event.is_pageview() {
            total_pageviews += 1;
            match local_day(event, cfg.timezone) {
                Ok(day) => {
                    days.insert(day);
                }
                Err(reason) => undated.record(&reason),
            }
        }

        if let Some(country) = event
            .location
            .as_ref()
            .and_then(|l| l.country.as_deref())
            .filter(|c| !c.is_empty())
        {
            countries.add(country);
        }

        if let Some(raw) = event.referrer.as_deref() {
            match referrer_domain(raw, cfg.site_host.as_deref()) {
                ReferrerClass::Domain(domain) => referrers.add(&domain),
                ReferrerClass::Invalid => referrers.add(INVALID_REFERRER),
                ReferrerClass::Excluded => {}
            }
        }
    }

    if !undated.is_empty() {
        tracing::debug!(
            skipped = undated.total(),
            "Pageviews without a usable date left out of the day count"
        );
    }

    Summary {
        total_pageviews,
        unique_day_count: days.len(),
        top_country: countries.top().map(|(name, count)| CountryCount {
            name: name.to_string(),
            count,
        }),
        top_referrer_domain: referrers.top().map(|(domain, count)| DomainCount {
            domain: domain.to_string(),
            count,
        }),
    }
}
