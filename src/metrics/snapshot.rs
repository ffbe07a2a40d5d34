#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackerMetricsSnapshot {
    pub record_calls: u64,
    pub record_hits: u64,
    pub record_new: u64,
    pub empty_keys: u64,

    pub evictions: u64,
    pub evicted_from_top: u64, // evicted while listed in the top list

    pub top_admissions: u64,
    pub top_displacements: u64,

    pub top_n_calls: u64,
    pub all_entries_calls: u64,

    pub clears: u64,

    // gauges captured at snapshot time
    pub cache_len: usize,
    pub cache_capacity: usize,
    pub top_len: usize,
    pub top_capacity: usize,
}

impl TrackerMetricsSnapshot {
    /// Fraction of accepted events that hit an already tracked key.
    pub fn hit_ratio(&self) -> f64 {
        let accepted = self.record_hits + self.record_new;
        if accepted == 0 {
            0.0
        } else {
            self.record_hits as f64 / accepted as f64
        }
    }
}
