//! Metrics collection for observability
//!
//! Prometheus metrics for record construction. Each [`Metrics`] owns its
//! registry so several record lists (or tests) never collide on names.
//!
//! # Metrics
//!
//! - `records_sealed_total` - Records sealed by `build`
//! - `records_reverted_total` - Reversible builders rolled back
//! - `records_removed_total` - Removable builders dropped by a revert
//! - `child_capacity_exceeded_total` - Slot requests rejected for capacity
//! - `record_list_size` - Histogram of records per user transaction

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::{fmt, sync::Arc};

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total records sealed
    pub records_sealed: IntCounter,

    /// Total reversible builders reverted
    pub records_reverted: IntCounter,

    /// Total removable builders removed
    pub records_removed: IntCounter,

    /// Total capacity rejections
    pub capacity_exceeded: IntCounter,

    /// Records per user transaction
    pub list_size: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let records_sealed =
            IntCounter::new("records_sealed_total", "Total number of records sealed")?;
        registry.register(Box::new(records_sealed.clone()))?;

        let records_reverted = IntCounter::new(
            "records_reverted_total",
            "Total number of reversible records reverted",
        )?;
        registry.register(Box::new(records_reverted.clone()))?;

        let records_removed = IntCounter::new(
            "records_removed_total",
            "Total number of removable records removed",
        )?;
        registry.register(Box::new(records_removed.clone()))?;

        let capacity_exceeded = IntCounter::new(
            "child_capacity_exceeded_total",
            "Total number of child record requests rejected for capacity",
        )?;
        registry.register(Box::new(capacity_exceeded.clone()))?;

        let list_size = Histogram::with_opts(
            HistogramOpts::new("record_list_size", "Histogram of records per user transaction")
                .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 25.0, 50.0]),
        )?;
        registry.register(Box::new(list_size.clone()))?;

        Ok(Self {
            records_sealed,
            records_reverted,
            records_removed,
            capacity_exceeded,
            list_size,
            registry,
        })
    }

    /// Record sealed records
    pub fn record_sealed(&self, count: usize) {
        self.records_sealed.inc_by(count as u64);
        self.list_size.observe(count as f64);
    }

    /// Record a reverted builder
    pub fn record_reverted(&self) {
        self.records_reverted.inc();
    }

    /// Record removed builders
    pub fn record_removed(&self, count: usize) {
        self.records_removed.inc_by(count as u64);
    }

    /// Record a capacity rejection
    pub fn record_capacity_exceeded(&self) {
        self.capacity_exceeded.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("records_sealed", &self.records_sealed.get())
            .field("records_reverted", &self.records_reverted.get())
            .field("records_removed", &self.records_removed.get())
            .field("capacity_exceeded", &self.capacity_exceeded.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.records_sealed.get(), 0);
        assert_eq!(metrics.records_removed.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_reverted();
        assert_eq!(a.records_reverted.get(), 1);
        assert_eq!(b.records_reverted.get(), 0);
    }

    #[test]
    fn test_record_sealed() {
        let metrics = Metrics::new().unwrap();
        metrics.record_sealed(3);
        metrics.record_sealed(1);
        assert_eq!(metrics.records_sealed.get(), 4);
        assert_eq!(metrics.list_size.get_sample_count(), 2);
    }

    #[test]
    fn test_registry_gathers_all_families() {
        let metrics = Metrics::new().unwrap();
        metrics.record_removed(2);
        metrics.record_capacity_exceeded();
        let names: Vec<_> = metrics
            .registry()
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"records_removed_total".to_string()));
        assert!(names.contains(&"child_capacity_exceeded_total".to_string()));
    }
}
