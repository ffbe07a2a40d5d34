use crate::metrics::cell::MetricsCell;
use crate::metrics::traits::{TrackerMetricsReadRecorder, TrackerMetricsRecorder};

#[derive(Debug, Default)]
pub struct TrackerMetrics {
    pub record_calls: u64,
    pub record_hits: u64,
    pub record_new: u64,
    pub empty_keys: u64,
    pub evictions: u64,
    pub evicted_from_top: u64,
    pub top_admissions: u64,
    pub top_displacements: u64,
    pub clears: u64,
    pub top_n_calls: MetricsCell,
    pub all_entries_calls: MetricsCell,
}

impl TrackerMetricsRecorder for TrackerMetrics {
    fn record_event_call(&mut self) {
        self.record_calls += 1;
    }

    fn record_event_hit(&mut self) {
        self.record_hits += 1;
    }

    fn record_event_new(&mut self) {
        self.record_new += 1;
    }

    fn record_empty_key(&mut self) {
        self.empty_keys += 1;
    }

    fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    fn record_evicted_from_top(&mut self) {
        self.evicted_from_top += 1;
    }

    fn record_top_admission(&mut self) {
        self.top_admissions += 1;
    }

    fn record_top_displacement(&mut self) {
        self.top_displacements += 1;
    }

    fn record_clear(&mut self) {
        self.clears += 1;
    }
}

impl TrackerMetricsReadRecorder for TrackerMetrics {
    fn record_top_n_call(&self) {
        self.top_n_calls.incr();
    }

    fn record_all_entries_call(&self) {
        self.all_entries_calls.incr();
    }
}
