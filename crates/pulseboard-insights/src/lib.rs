//! Chart, table, summary and map data for the Pulseboard dashboard.

pub mod aggregate;
pub mod charts;
pub mod filter;
pub mod geo;
pub mod logging;
pub mod snapshot;
pub mod summary;

pub use aggregate::{aggregate, ChartSeries, Tally};
pub use filter::{filter_events, FilterCriteria};
pub use snapshot::{DashboardSnapshot, RefreshContext};
pub use summary::{summarize, Summary};
