use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[derive(Debug, Default)]
struct InnerMetrics {
    rows_upserted: AtomicU64,
    rows_deleted: AtomicU64,
    batches_run: AtomicU64,
    retries: AtomicU64,
}

/// Process-lifetime counters exposed via a snapshot (§11 supplemented
/// feature); not a metrics-exporter integration, just cheap atomics the CLI
/// can print.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub rows_upserted: u64,
    pub rows_deleted: u64,
    pub batches_run: u64,
    pub retries: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn record_upserted(&self, count: u64) {
        self.inner.rows_upserted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_deleted(&self, count: u64) {
        self.inner.rows_deleted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.inner.batches_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry_count(&self, count: u64) {
        self.inner.retries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_upserted: self.inner.rows_upserted.load(Ordering::Relaxed),
            rows_deleted: self.inner.rows_deleted.load(Ordering::Relaxed),
            batches_run: self.inner.batches_run.load(Ordering::Relaxed),
            retries: self.inner.retries.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counts() {
        let metrics = Metrics::new();
        metrics.record_upserted(10);
        metrics.record_deleted(3);
        metrics.record_batch();
        metrics.record_retry_count(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rows_upserted, 10);
        assert_eq!(snapshot.rows_deleted, 3);
        assert_eq!(snapshot.batches_run, 1);
        assert_eq!(snapshot.retries, 1);
    }
}
