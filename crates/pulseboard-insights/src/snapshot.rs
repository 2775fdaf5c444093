//! One dashboard refresh: every view computed from a single fetched batch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use pulseboard_core::{
    config::DashboardConfig,
    error::{CoreError, SkipTally},
    event::{decode_events, Event},
};

use crate::charts::DashboardCharts;
use crate::filter::{filter_events, filter_options, FilterCriteria, FilterOptions};
use crate::geo::{map_points, MapPoint};
use crate::summary::{summarize, Summary};

/// Inputs of one refresh. Nothing is carried over between refreshes.
#[derive(Debug, Clone)]
pub struct RefreshContext {
    pub refresh_id: Uuid,
    pub config: DashboardConfig,
    pub criteria: FilterCriteria,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub refresh_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub event_count: usize,
    /// Payload elements that could not be decoded.
    #[serde(skip_serializing_if = "SkipTally::is_empty")]
    pub rejected: SkipTally,
    pub summary: Summary,
    pub charts: DashboardCharts,
    /// Filtered events, newest first, at most `table_limit` of them.
    pub table: Vec<Event>,
    /// Number of events matching the filters before truncation.
    pub table_total: usize,
    pub filter_options: FilterOptions,
    pub map_points: Vec<MapPoint>,
}

impl RefreshContext {
    pub fn new(config: DashboardConfig, criteria: FilterCriteria) -> Self {
        Self {
            refresh_id: Uuid::new_v4(),
            config,
            criteria,
        }
    }

    /// Decodes a raw events payload and runs the refresh on it.
    pub fn run_payload(&self, payload: &[u8]) -> Result<DashboardSnapshot, CoreError> {
        let batch = decode_events(payload)?;
        let mut snapshot = self.run(&batch.events);
        snapshot.rejected = batch.rejected;
        Ok(snapshot)
    }

    pub fn run(&self, events: &[Event]) -> DashboardSnapshot {
        let span = tracing::info_span!("refresh", refresh_id = %self.refresh_id);
        let _guard = span.enter();

        let summary = summarize(events, &self.config);
        let charts = DashboardCharts::build(events, &self.config);
        let mut table = filter_events(events, &self.criteria);
        let table_total = table.len();
        table.truncate(self.config.table_limit);

        tracing::info!(
            events = events.len(),
            table_total,
            pageviews = summary.total_pageviews,
            "Dashboard refreshed"
        );

        DashboardSnapshot {
            refresh_id: self.refresh_id,
            generated_at: Utc::now(),
            event_count: events.len(),
            rejected: SkipTally::default(),
            summary,
            charts,
            table,
            table_total,
            filter_options: filter_options(events),
            map_points: map_points(events),
        }
    }
}
