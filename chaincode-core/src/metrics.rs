//! Metrics collection for observability
//!
//! Prometheus metrics for monitoring the handler:
//!
//! - `chaincode_invocations_total{operation}` - Invocations dispatched
//! - `chaincode_failures_total{operation}` - Invocations that returned an error
//! - `chaincode_invoke_duration_seconds` - Histogram of invocation latencies

use crate::error::Result;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Invocations dispatched, labeled by operation name
    pub invocations_total: IntCounterVec,

    /// Failed invocations, labeled by operation name
    pub failures_total: IntCounterVec,

    /// Invocation latency histogram
    pub invoke_duration: Histogram,

    /// Prometheus registry
    registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let invocations_total = IntCounterVec::new(
            Opts::new("chaincode_invocations_total", "Invocations dispatched"),
            &["operation"],
        )?;
        registry.register(Box::new(invocations_total.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new("chaincode_failures_total", "Invocations that failed"),
            &["operation"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let invoke_duration = Histogram::with_opts(
            HistogramOpts::new(
                "chaincode_invoke_duration_seconds",
                "Histogram of invocation latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250]),
        )?;
        registry.register(Box::new(invoke_duration.clone()))?;

        Ok(Self {
            invocations_total,
            failures_total,
            invoke_duration,
            registry,
        })
    }

    /// Record a dispatched invocation
    pub fn record_invocation(&self, operation: &str) {
        self.invocations_total.with_label_values(&[operation]).inc();
    }

    /// Record a failed invocation
    pub fn record_failure(&self, operation: &str) {
        self.failures_total.with_label_values(&[operation]).inc();
    }

    /// Record invocation duration
    pub fn record_duration(&self, duration_seconds: f64) {
        self.invoke_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(
            metrics.invocations_total.with_label_values(&["queryUser"]).get(),
            0
        );
    }

    #[test]
    fn test_record_invocation_and_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_invocation("videoUplink");
        metrics.record_invocation("videoUplink");
        metrics.record_failure("videoUplink");

        assert_eq!(
            metrics
                .invocations_total
                .with_label_values(&["videoUplink"])
                .get(),
            2
        );
        assert_eq!(
            metrics.failures_total.with_label_values(&["videoUplink"]).get(),
            1
        );
    }

    #[test]
    fn test_independent_registries() {
        // Each collector owns its registry, so tests can create several.
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_invocation("queryUser");
        assert_eq!(b.invocations_total.with_label_values(&["queryUser"]).get(), 0);
    }
}
