//! Optional counters for [`TopTracker`](crate::tracker::TopTracker), enabled
//! with the `metrics` feature.

pub mod cell;
pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use snapshot::TrackerMetricsSnapshot;
pub use traits::{MetricsExporter, MetricsSnapshotProvider};
