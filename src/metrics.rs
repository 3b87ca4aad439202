//! Metrics collection and export for bounded pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::pool::PoolSize;

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use bounded_pool::{BoundedPool, PoolConfiguration};
///
/// let pool = BoundedPool::new(|| Ok::<_, std::io::Error>(String::new()), PoolConfiguration::default()).unwrap();
///
/// {
///     let _obj = pool.acquire().unwrap();
///     let metrics = pool.get_metrics();
///     assert_eq!(metrics.total_acquired, 1);
///     assert_eq!(metrics.total_created, 1);
///     assert_eq!(metrics.in_use_objects, 1);
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PoolMetrics {
    /// Successful acquisitions
    pub total_acquired: usize,

    /// Instances accepted by the resetter and returned to the idle set
    pub total_released: usize,

    /// Instances constructed by the factory
    pub total_created: usize,

    /// Instances dropped from the pool (rejected, detached or failed during reset)
    pub total_discarded: usize,

    pub construction_failures: usize,

    /// Fail-fast acquisitions that found the pool exhausted
    pub exhausted_events: usize,

    pub timeouts: usize,

    pub cancellations: usize,

    /// Times a caller had to wait for an instance
    pub waits: usize,

    pub idle_objects: usize,
    pub in_use_objects: usize,
    pub total_objects: usize,

    /// In-use share of capacity (0.0 to 1.0)
    pub utilization: f64,

    /// Maximum pool capacity
    pub max_capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("total_discarded".to_string(), self.total_discarded.to_string());
        metrics.insert("construction_failures".to_string(), self.construction_failures.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("timeouts".to_string(), self.timeouts.to_string());
        metrics.insert("cancellations".to_string(), self.cancellations.to_string());
        metrics.insert("waits".to_string(), self.waits.to_string());
        metrics.insert("idle_objects".to_string(), self.idle_objects.to_string());
        metrics.insert("in_use_objects".to_string(), self.in_use_objects.to_string());
        metrics.insert("total_objects".to_string(), self.total_objects.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("max_capacity".to_string(), self.max_capacity.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_pool::{BoundedPool, PoolConfiguration};
    /// use std::collections::HashMap;
    ///
    /// let pool = BoundedPool::new(|| Ok::<_, std::io::Error>(0u8), PoolConfiguration::default()).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags)).unwrap();
    /// assert!(output.contains("boundedpool_objects_in_use"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};

        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());
        if let Some(tags) = tags {
            labels.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        let registry = Registry::new_custom(Some("boundedpool".to_string()), Some(labels))?;

        let gauges = [
            ("objects_idle", "Current idle objects", metrics.idle_objects),
            ("objects_in_use", "Current in-use objects", metrics.in_use_objects),
            ("objects_total", "Current issued objects", metrics.total_objects),
        ];
        for (name, help, value) in gauges {
            let gauge = IntGauge::with_opts(Opts::new(name, help))?;
            gauge.set(value as i64);
            registry.register(Box::new(gauge))?;
        }

        let utilization = Gauge::with_opts(Opts::new("utilization", "Pool utilization ratio"))?;
        utilization.set(metrics.utilization);
        registry.register(Box::new(utilization))?;

        let counters = [
            ("objects_acquired_total", "Total objects acquired", metrics.total_acquired),
            ("objects_released_total", "Total objects returned to idle", metrics.total_released),
            ("objects_created_total", "Total objects constructed", metrics.total_created),
            ("objects_discarded_total", "Total objects discarded", metrics.total_discarded),
            ("construction_failures_total", "Factory failures", metrics.construction_failures),
            ("events_exhausted_total", "Pool exhausted events", metrics.exhausted_events),
            ("events_timeout_total", "Acquire timeouts", metrics.timeouts),
            ("events_cancelled_total", "Cancelled acquisitions", metrics.cancellations),
            ("events_wait_total", "Acquisitions that had to wait", metrics.waits),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::with_opts(Opts::new(name, help))?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter))?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub created: AtomicUsize,
    pub discarded: AtomicUsize,
    pub construction_failures: AtomicUsize,
    pub exhausted: AtomicUsize,
    pub timeouts: AtomicUsize,
    pub cancellations: AtomicUsize,
    pub waits: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metrics(&self, size: PoolSize, capacity: usize) -> PoolMetrics {
        PoolMetrics {
            total_acquired: self.acquired.load(Ordering::Relaxed),
            total_released: self.released.load(Ordering::Relaxed),
            total_created: self.created.load(Ordering::Relaxed),
            total_discarded: self.discarded.load(Ordering::Relaxed),
            construction_failures: self.construction_failures.load(Ordering::Relaxed),
            exhausted_events: self.exhausted.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
            idle_objects: size.idle,
            in_use_objects: size.in_use,
            total_objects: size.total,
            utilization: size.utilization(capacity),
            max_capacity: capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PoolMetrics {
        let tracker = MetricsTracker::new();
        tracker.acquired.fetch_add(1, Ordering::Relaxed);
        tracker.acquired.fetch_add(1, Ordering::Relaxed);
        tracker.created.fetch_add(1, Ordering::Relaxed);
        tracker.timeouts.fetch_add(1, Ordering::Relaxed);

        tracker.get_metrics(
            PoolSize {
                idle: 1,
                in_use: 1,
                total: 2,
            },
            4,
        )
    }

    #[test]
    fn test_snapshot() {
        let metrics = sample();
        assert_eq!(metrics.total_acquired, 2);
        assert_eq!(metrics.total_created, 1);
        assert_eq!(metrics.timeouts, 1);
        assert_eq!(metrics.utilization, 0.25);
    }

    #[test]
    fn test_export_map() {
        let exported = sample().export();
        assert_eq!(exported["total_acquired"], "2");
        assert_eq!(exported["utilization"], "0.25");
        assert_eq!(exported["max_capacity"], "4");
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_export_prometheus() {
        let output = MetricsExporter::export_prometheus(&sample(), "workers", None).unwrap();

        assert!(output.contains("# TYPE boundedpool_objects_in_use gauge"));
        assert!(output.contains("boundedpool_objects_acquired_total{pool=\"workers\"} 2"));
        assert!(output.contains("boundedpool_events_timeout_total{pool=\"workers\"} 1"));
    }
}
