use std::io::Write;
use std::sync::{Mutex, PoisonError};

use crate::metrics::snapshot::TrackerMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for tracker metrics snapshots.
///
/// This exporter writes in the Prometheus text exposition format so it can be
/// scraped by Prometheus or forwarded to an OpenTelemetry collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send + Sync> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send + Sync> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_metric(&self, kind: &str, name: &str, value: u64) {
        // A panic while holding the lock only ever leaves a partial line.
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_counter(&self, name: &str, value: u64) {
        self.write_metric("counter", name, value);
    }

    fn write_gauge(&self, name: &str, value: u64) {
        self.write_metric("gauge", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send + Sync> MetricsExporter<TrackerMetricsSnapshot>
    for PrometheusTextExporter<W>
{
    fn export(&self, snapshot: &TrackerMetricsSnapshot) {
        self.write_counter(
            &self.metric_name("record_calls_total"),
            snapshot.record_calls,
        );
        self.write_counter(&self.metric_name("record_hits_total"), snapshot.record_hits);
        self.write_counter(&self.metric_name("record_new_total"), snapshot.record_new);
        self.write_counter(&self.metric_name("empty_keys_total"), snapshot.empty_keys);
        self.write_counter(&self.metric_name("evictions_total"), snapshot.evictions);
        self.write_counter(
            &self.metric_name("evicted_from_top_total"),
            snapshot.evicted_from_top,
        );
        self.write_counter(
            &self.metric_name("top_admissions_total"),
            snapshot.top_admissions,
        );
        self.write_counter(
            &self.metric_name("top_displacements_total"),
            snapshot.top_displacements,
        );
        self.write_counter(&self.metric_name("top_n_calls_total"), snapshot.top_n_calls);
        self.write_counter(
            &self.metric_name("all_entries_calls_total"),
            snapshot.all_entries_calls,
        );
        self.write_counter(&self.metric_name("clears_total"), snapshot.clears);
        self.write_gauge(&self.metric_name("cache_len"), snapshot.cache_len as u64);
        self.write_gauge(
            &self.metric_name("cache_capacity"),
            snapshot.cache_capacity as u64,
        );
        self.write_gauge(&self.metric_name("top_len"), snapshot.top_len as u64);
        self.write_gauge(
            &self.metric_name("top_capacity"),
            snapshot.top_capacity as u64,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export_to_string(prefix: &str, snapshot: &TrackerMetricsSnapshot) -> String {
        let exporter = PrometheusTextExporter::new(prefix, Vec::new());
        exporter.export(snapshot);
        String::from_utf8(exporter.into_inner()).unwrap()
    }

    #[test]
    fn exporter_writes_prefixed_counters_and_gauges() {
        let snapshot = TrackerMetricsSnapshot {
            record_calls: 7,
            evictions: 2,
            cache_len: 3,
            cache_capacity: 4,
            ..Default::default()
        };
        let text = export_to_string("flowtop", &snapshot);

        assert!(text.contains("# TYPE flowtop_record_calls_total counter\n"));
        assert!(text.contains("flowtop_record_calls_total 7\n"));
        assert!(text.contains("flowtop_evictions_total 2\n"));
        assert!(text.contains("# TYPE flowtop_cache_len gauge\n"));
        assert!(text.contains("flowtop_cache_capacity 4\n"));
    }

    #[test]
    fn exporter_without_prefix_uses_bare_names() {
        let text = export_to_string("", &TrackerMetricsSnapshot::default());
        assert!(text.contains("\ntop_len 0\n"));
        assert!(!text.contains("_top_len"));
    }
}
