//! Ranked label/count series built from an event list.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use pulseboard_core::{
    config::DEFAULT_KEY_CHAR_CAP,
    error::{SkipReason, SkipTally},
    event::Event,
};

/// Parallel label/count arrays, ready for a bar or pie chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
    /// Events that passed the predicate but yielded no usable key.
    #[serde(skip_serializing_if = "SkipTally::is_empty")]
    pub skipped: SkipTally,
}

impl ChartSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Re-orders the entries by label, ascending. Used for date axes where
    /// the labels are ISO dates.
    pub fn sort_by_label(&mut self) {
        let mut pairs: Vec<(String, usize)> = self
            .labels
            .drain(..)
            .zip(self.counts.drain(..))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let (labels, counts): (Vec<String>, Vec<usize>) = pairs.into_iter().unzip();
        self.labels = labels;
        self.counts = counts;
    }

    /// Rewrites every label; a label that fails to map is kept as is.
    pub fn relabel<L>(&mut self, label_fn: L)
    where
        L: Fn(&str) -> Result<String, SkipReason>,
    {
        for label in &mut self.labels {
            if let Ok(mapped) = label_fn(label) {
                *label = mapped;
            }
        }
    }
}

/// Occurrence counter that remembers first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<(String, usize)>,
}

impl Tally {
    pub fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    /// Entries by count descending; equal counts keep first-seen order.
    pub fn into_ranked(self) -> Vec<(String, usize)> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }

    /// The most frequent key. The earliest seen wins a tie.
    pub fn top(&self) -> Option<(&str, usize)> {
        let mut best: Option<&(String, usize)> = None;
        for entry in &self.entries {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(key, count)| (key.as_str(), *count))
    }
}

/// Turns an optional extracted value into a key result.
pub fn required_key<T: Into<String>>(value: Option<T>) -> Result<String, SkipReason> {
    value.map(Into::into).ok_or(SkipReason::MissingKey)
}

/// Labels keys with themselves.
pub fn identity_label(key: &str) -> Result<String, SkipReason> {
    Ok(key.to_string())
}

/// Groups events by a derived key and ranks the keys by frequency.
///
/// Events rejected by `predicate` are ignored. A `key_fn` error or an empty key
/// drops that event only and is recorded in [`ChartSeries::skipped`]. Keys are
/// capped at [`DEFAULT_KEY_CHAR_CAP`] characters before counting. At most
/// `limit` entries are returned, by count descending with first-seen order on
/// ties. A `label_fn` error falls back to the raw key.
///
/// The result is always a valid series: if any of the supplied closures
/// panics, the empty series is returned instead.
pub fn aggregate<P, K, L>(
    events: &[Event],
    predicate: P,
    key_fn: K,
    label_fn: L,
    limit: usize,
) -> ChartSeries
where
    P: Fn(&Event) -> bool,
    K: Fn(&Event) -> Result<String, SkipReason>,
    L: Fn(&str) -> Result<String, SkipReason>,
{
    aggregate_with_cap(events, predicate, key_fn, label_fn, limit, DEFAULT_KEY_CHAR_CAP)
}

/// [`aggregate`] with an explicit key length cap, in characters.
pub fn aggregate_with_cap<P, K, L>(
    events: &[Event],
    predicate: P,
    key_fn: K,
    label_fn: L,
    limit: usize,
    key_char_cap: usize,
) -> ChartSeries
where
    P: Fn(&Event) -> bool,
    K: Fn(&Event) -> Result<String, SkipReason>,
    L: Fn(&str) -> Result<String, SkipReason>,
{
    if limit == 0 || events.is_empty() {
        return ChartSeries::empty();
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        rank(events, &predicate, &key_fn, &label_fn, limit, key_char_cap)
    }));
    match outcome {
        Ok(series) => series,
        Err(_) => {
            tracing::warn!(
                events = events.len(),
                "Aggregation aborted by a panicking extractor; returning empty series"
            );
            ChartSeries::empty()
        }
    }
}

fn rank<P, K, L>(
    events: &[Event],
    predicate: &P,
    key_fn: &K,
    label_fn: &L,
    limit: usize,
    key_char_cap: usize,
) -> ChartSeries
where
    P: Fn(&Event) -> bool,
    K: Fn(&Event) -> Result<String, SkipReason>,
    L: Fn(&str) -> Result<String, SkipReason>,
{
    let mut tally = Tally::default();
    let mut skipped = SkipTally::default();

    for event in events.iter().filter(|e| predicate(*e)) {
        match key_fn(event) {
            Ok(key) => match truncate_chars(&key, key_char_cap) {
                "" => skipped.record(&SkipReason::EmptyKey),
                capped => tally.add(capped),
            },
            Err(reason) => skipped.record(&reason),
        }
    }

    if !skipped.is_empty() {
        tracing::debug!(skipped = skipped.total(), "Events without an aggregation key");
    }

    let (labels, counts): (Vec<String>, Vec<usize>) = tally
        .into_ranked()
        .into_iter()
        .take(limit)
        .map(|(key, count)| match label_fn(&key) {
            Ok(label) => (label, count),
            Err(reason) => {
                tracing::debug!(%key, %reason, "Label lookup failed; using raw key");
                (key, count)
            }
        })
        .unzip();

    ChartSeries {
        labels,
        counts,
        skipped,
    }
}

/// The first `cap` characters of `key`, on a char boundary.
pub fn truncate_chars(key: &str, cap: usize) -> &str {
    match key.char_indices().nth(cap) {
        Some((end, _)) => &key[..end],
        None => key,
    }
}
