use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, SkipReason, SkipTally};

pub const PAGEVIEW: &str = "pageview";
pub const LINK_CLICK: &str = "link_click";
pub const ANCHOR_CLICK: &str = "anchor_click";
pub const MODAL_OPEN: &str = "modal_open";
/// Type reported for events that carry none.
pub const UNKNOWN_TYPE: &str = "Unknown";

/// Where a project identifier may live on an event, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectIdSource {
    TopLevel,
    Detail(&'static str),
}

/// The first non-empty source wins.
pub const PROJECT_ID_CHAIN: [ProjectIdSource; 4] = [
    ProjectIdSource::TopLevel,
    ProjectIdSource::Detail("projectId"),
    ProjectIdSource::Detail("context"),
    ProjectIdSource::Detail("trackId"),
];

/// Shortest digit string read as epoch milliseconds; shorter ones (a bare
/// year, for instance) are rejected.
const MIN_EPOCH_MILLIS_DIGITS: usize = 10;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Geolocation enrichment attached by the ingestion endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub as_organization: Option<String>,
}

/// One tracked interaction, as returned by the events endpoint.
///
/// Every field is optional. Fields of an unexpected JSON shape decode as
/// absent instead of rejecting the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_type: Option<String>,
    /// Server-assigned time. String or epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<Value>,
    /// Client-supplied time, used when `received_at` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, deserialize_with = "lenient_location", skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Legacy modal identifiers sent before they moved into `details`.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub modal_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub modal_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_map", skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl Event {
    pub fn kind(&self) -> &str {
        self.event_type.as_deref().unwrap_or(UNKNOWN_TYPE)
    }

    pub fn is_pageview(&self) -> bool {
        self.kind() == PAGEVIEW
    }

    /// The raw time value in effect: `received_at`, else `timestamp`.
    pub fn raw_time(&self) -> Option<&Value> {
        [self.received_at.as_ref(), self.timestamp.as_ref()]
            .into_iter()
            .flatten()
            .find(|v| is_truthy(v))
    }

    /// The raw time value as text, empty when absent.
    pub fn raw_time_text(&self) -> String {
        match self.raw_time() {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    pub fn occurred_at(&self) -> Result<DateTime<Utc>, SkipReason> {
        match self.raw_time() {
            Some(value) => parse_time(value),
            None => Err(SkipReason::MissingTimestamp),
        }
    }

    /// Time used for display ordering; undated events sort as the Unix epoch.
    pub fn sort_time(&self) -> DateTime<Utc> {
        self.occurred_at().unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// A `details` value as text. Strings and numbers only; empty strings are
    /// treated as absent.
    pub fn detail_text(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.details.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }

    /// Resolves the project identifier through [`PROJECT_ID_CHAIN`].
    pub fn project_id(&self) -> Option<Cow<'_, str>> {
        PROJECT_ID_CHAIN.iter().find_map(|source| match source {
            ProjectIdSource::TopLevel => self
                .project_id
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(Cow::Borrowed),
            ProjectIdSource::Detail(key) => self.detail_text(key),
        })
    }

    pub fn link_type(&self) -> Option<Cow<'_, str>> {
        self.detail_text("linkType")
    }

    pub fn modal_id(&self) -> Option<Cow<'_, str>> {
        self.detail_text("modalId").or_else(|| {
            [self.modal_id.as_deref(), self.modal_type.as_deref()]
                .into_iter()
                .flatten()
                .find(|s| !s.is_empty())
                .map(Cow::Borrowed)
        })
    }
}

/// Events decoded from one fetched payload.
#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    pub events: Vec<Event>,
    /// Array elements that could not be read as an event.
    pub rejected: SkipTally,
}

/// Decodes the events endpoint response.
///
/// The payload itself must be a JSON array. Each element is decoded on its
/// own so one malformed entry only drops that entry.
pub fn decode_events(payload: &[u8]) -> Result<DecodedBatch, CoreError> {
    let items = match serde_json::from_slice::<Value>(payload)? {
        Value::Array(items) => items,
        other => return Err(CoreError::NotAnArray(json_kind(&other))),
    };

    let mut batch = DecodedBatch {
        events: Vec::with_capacity(items.len()),
        rejected: SkipTally::default(),
    };
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<Event>(item) {
            Ok(event) => batch.events.push(event),
            Err(error) => {
                tracing::warn!(index, %error, "Skipping malformed event");
                batch
                    .rejected
                    .record(&SkipReason::Malformed(error.to_string()));
            }
        }
    }
    Ok(batch)
}

pub fn parse_time(value: &Value) -> Result<DateTime<Utc>, SkipReason> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| SkipReason::InvalidTimestamp(n.to_string())),
        Value::String(s) => parse_time_text(s),
        Value::Null => Err(SkipReason::MissingTimestamp),
        other => Err(SkipReason::InvalidTimestamp(other.to_string())),
    }
}

fn parse_time_text(raw: &str) -> Result<DateTime<Utc>, SkipReason> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(SkipReason::MissingTimestamp);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(parsed.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    if text.len() >= MIN_EPOCH_MILLIS_DIGITS && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Some(parsed) = text
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
        {
            return Ok(parsed);
        }
    }
    Err(SkipReason::InvalidTimestamp(text.to_string()))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    })
}

fn lenient_location<'de, D>(deserializer: D) -> Result<Option<Location>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

fn lenient_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    })
}
