use chrono_tz::Tz;

pub const DEFAULT_CHART_LIMIT: usize = 10;
pub const DEFAULT_DAY_CHART_LIMIT: usize = 30;
pub const DEFAULT_TABLE_LIMIT: usize = 500;
/// Upper bound on the length of an aggregation key, in characters.
pub const DEFAULT_KEY_CHAR_CAP: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Number of bars/slices kept per ranked chart.
    pub chart_limit: usize,
    pub day_chart_limit: usize,
    /// Rows kept in the event table after filtering.
    pub table_limit: usize,
    pub key_char_cap: usize,
    /// Timezone used to bucket events into calendar days.
    pub timezone: Tz,
    /// Hostname the dashboard is served from; referrers from it are not external.
    pub site_host: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            chart_limit: DEFAULT_CHART_LIMIT,
            day_chart_limit: DEFAULT_DAY_CHART_LIMIT,
            table_limit: DEFAULT_TABLE_LIMIT,
            key_char_cap: DEFAULT_KEY_CHAR_CAP,
            timezone: Tz::UTC,
            site_host: None,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. `from_env` is this
    /// with the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let limit = |name: &str, default: usize| -> Result<usize, String> {
            match lookup(name) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|e| format!("invalid {name}: {e}")),
                None => Ok(default),
            }
        };

        Ok(Self {
            chart_limit: limit("PULSEBOARD_CHART_LIMIT", DEFAULT_CHART_LIMIT)?,
            day_chart_limit: limit("PULSEBOARD_DAY_CHART_LIMIT", DEFAULT_DAY_CHART_LIMIT)?,
            table_limit: limit("PULSEBOARD_TABLE_LIMIT", DEFAULT_TABLE_LIMIT)?,
            key_char_cap: match limit("PULSEBOARD_KEY_CHAR_CAP", DEFAULT_KEY_CHAR_CAP)? {
                0 => return Err("PULSEBOARD_KEY_CHAR_CAP must be at least 1".to_string()),
                cap => cap,
            },
            timezone: match lookup("PULSEBOARD_TIMEZONE") {
                Some(raw) => raw
                    .trim()
                    .parse::<Tz>()
                    .map_err(|_| format!("invalid PULSEBOARD_TIMEZONE: {raw}"))?,
                None => Tz::UTC,
            },
            site_host: lookup("PULSEBOARD_SITE_HOST")
                .map(|v| normalize_host(&v))
                .filter(|v| !v.is_empty()),
        })
    }
}

/// Lower-cases a hostname and drops a leading `www.`.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}
