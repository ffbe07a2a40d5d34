//! # Metrics Trait Hierarchy
//!
//! Recording, snapshotting and export are split into small traits so the
//! tracker only ever writes counters, while tests and monitoring read them
//! through snapshots.
//!
//! ```text
//!   ┌──────────────────────────────┐   ┌──────────────────────────────┐
//!   │ TrackerMetricsRecorder       │   │ TrackerMetricsReadRecorder   │
//!   │ (&mut self: record_event,    │   │ (&self: top_n, all_entries)  │
//!   │  eviction, top list churn)   │   │                              │
//!   └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                  └───────────────┬──────────────────┘
//!                                  ▼
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │───►│ MetricsExporter<S>           │
//!   │ (bench/test)                 │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```

/// Counters written on the `record_event` path.
pub trait TrackerMetricsRecorder {
    fn record_event_call(&mut self);
    fn record_event_hit(&mut self);
    fn record_event_new(&mut self);
    fn record_empty_key(&mut self);
    fn record_eviction(&mut self);
    fn record_evicted_from_top(&mut self);
    fn record_top_admission(&mut self);
    fn record_top_displacement(&mut self);
    fn record_clear(&mut self);
}

/// Read-only tracker metrics for &self methods (uses interior mutability).
pub trait TrackerMetricsReadRecorder {
    fn record_top_n_call(&self);
    fn record_all_entries_call(&self);
}

/// Snapshot provider for bench/testing.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
