use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("event payload must be a JSON array, got {0}")]
    NotAnArray(&'static str),
}

/// Why a single event was left out of a computation.
///
/// Per-item failures never abort a pipeline stage; they are counted in a
/// [`SkipTally`] and the remaining events are processed as usual.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("no key could be derived")]
    MissingKey,

    #[error("derived key was empty")]
    EmptyKey,

    #[error("event carries no timestamp")]
    MissingTimestamp,

    #[error("unparseable timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("malformed event: {0}")]
    Malformed(String),
}

impl SkipReason {
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::MissingKey => "missing_key",
            SkipReason::EmptyKey => "empty_key",
            SkipReason::MissingTimestamp => "missing_timestamp",
            SkipReason::InvalidTimestamp(_) => "invalid_timestamp",
            SkipReason::Extraction(_) => "extraction",
            SkipReason::Malformed(_) => "malformed",
        }
    }
}

/// Count of skipped items per [`SkipReason::kind`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SkipTally(BTreeMap<&'static str, usize>);

impl SkipTally {
    pub fn record(&mut self, reason: &SkipReason) {
        *self.0.entry(reason.kind()).or_insert(0) += 1;
    }

    pub fn get(&self, kind: &str) -> usize {
        self.0.get(kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_by_kind() {
        let mut tally = SkipTally::default();
        tally.record(&SkipReason::MissingKey);
        tally.record(&SkipReason::MissingKey);
        tally.record(&SkipReason::Extraction("boom".to_string()));

        assert_eq!(tally.get("missing_key"), 2);
        assert_eq!(tally.get("extraction"), 1);
        assert_eq!(tally.get("empty_key"), 0);
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn tally_serializes_as_flat_map() {
        let mut tally = SkipTally::default();
        tally.record(&SkipReason::EmptyKey);
        let json = serde_json::to_value(&tally).unwrap();
        assert_eq!(json, serde_json::json!({ "empty_key": 1 }));
    }
}
