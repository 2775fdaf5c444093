//! The dashboard's chart presets, each one an [`aggregate`] call.

use chrono::NaiveDate;
use serde::Serialize;

use pulseboard_core::{
    config::DashboardConfig,
    error::SkipReason,
    event::{Event, ANCHOR_CLICK, LINK_CLICK, MODAL_OPEN},
};

use crate::aggregate::{aggregate_with_cap, identity_label, required_key, ChartSeries};
use crate::summary::local_day;

/// Screen width breakpoints, in pixels, and their bucket names.
const SCREEN_BUCKETS: [(f64, &str); 4] = [
    (576.0, "<576px"),
    (768.0, "576-767px"),
    (992.0, "768-991px"),
    (1200.0, "992-1199px"),
];
const WIDEST_BUCKET: &str = "1200px+";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCharts {
    pub views_by_day: ChartSeries,
    pub interactions_by_project: ChartSeries,
    pub link_destination_types: ChartSeries,
    pub click_interaction_types: ChartSeries,
    pub modal_opens_by_id: ChartSeries,
    pub event_type_distribution: ChartSeries,
    pub screen_width_buckets: ChartSeries,
}

impl DashboardCharts {
    pub fn build(events: &[Event], cfg: &DashboardConfig) -> Self {
        let cap = cfg.key_char_cap;
        let limit = cfg.chart_limit;

        let mut views_by_day = aggregate_with_cap(
            events,
            Event::is_pageview,
            |e| Ok(local_day(e, cfg.timezone)?.format("%Y-%m-%d").to_string()),
            identity_label,
            cfg.day_chart_limit,
            cap,
        );
        views_by_day.sort_by_label();
        let format = if spans_years(&views_by_day.labels) {
            "%b %-d, %Y"
        } else {
            "%b %-d"
        };
        views_by_day.relabel(|key| day_label(key, format));

        Self {
            views_by_day,
            interactions_by_project: aggregate_with_cap(
                events,
                |e| !e.is_pageview(),
                |e| required_key(e.project_id()),
                identity_label,
                limit,
                cap,
            ),
            link_destination_types: aggregate_with_cap(
                events,
                |e| matches!(e.kind(), LINK_CLICK | ANCHOR_CLICK),
                |e| required_key(e.link_type()),
                title_label,
                limit,
                cap,
            ),
            click_interaction_types: aggregate_with_cap(
                events,
                |e| e.kind().ends_with("_click"),
                |e| Ok(e.kind().to_string()),
                title_label,
                limit,
                cap,
            ),
            modal_opens_by_id: aggregate_with_cap(
                events,
                |e| e.kind() == MODAL_OPEN,
                |e| required_key(e.modal_id()),
                identity_label,
                limit,
                cap,
            ),
            event_type_distribution: aggregate_with_cap(
                events,
                |_| true,
                |e| Ok(e.kind().to_string()),
                title_label,
                limit,
                cap,
            ),
            screen_width_buckets: aggregate_with_cap(
                events,
                Event::is_pageview,
                |e| required_key(e.screen_width.and_then(screen_bucket)),
                identity_label,
                limit,
                cap,
            ),
        }
    }
}

/// Breakpoint bucket for a viewport width. Non-positive widths have none.
pub fn screen_bucket(width: f64) -> Option<&'static str> {
    if !width.is_finite() || width <= 0.0 {
        return None;
    }
    let bucket = SCREEN_BUCKETS
        .iter()
        .find(|(upper, _)| width < *upper)
        .map_or(WIDEST_BUCKET, |(_, name)| *name);
    Some(bucket)
}

/// `link_click` -> `Link Click`.
pub fn title_case(raw: &str) -> String {
    raw.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_label(key: &str) -> Result<String, SkipReason> {
    match title_case(key) {
        label if label.is_empty() => Err(SkipReason::EmptyKey),
        label => Ok(label),
    }
}

/// Whether ISO-dated labels, sorted ascending, cover more than one year.
fn spans_years(labels: &[String]) -> bool {
    match (labels.first(), labels.last()) {
        (Some(first), Some(last)) => first.get(..4) != last.get(..4),
        _ => false,
    }
}

/// `2024-01-05` -> `Jan 5` (or `Jan 5, 2024` with a year in `format`).
fn day_label(key: &str, format: &str) -> Result<String, SkipReason> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map(|day| day.format(format).to_string())
        .map_err(|e| SkipReason::Extraction(e.to_string()))
}
