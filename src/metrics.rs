//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `pawn_operations_total{operation, outcome}` - Operation counts
//! - `pawn_operation_duration_seconds` - Histogram of operation latencies
//! - `pawn_loans_opened_total` - Loans opened by deposit
//! - `pawn_loans_repaid_total` - Loans settled by repay

use crate::error::{Error, Result};
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Debug, Clone)]
pub struct Metrics {
    /// Operation counts by operation name and ok/rejected outcome
    pub operations_total: IntCounterVec,

    /// Operation duration histogram
    pub operation_duration: Histogram,

    /// Loans opened
    pub loans_opened_total: IntCounter,

    /// Loans repaid
    pub loans_repaid_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create a new metrics collector with its own registry.
    ///
    /// Metrics register only against this registry, never the process-global
    /// default, so multiple ledgers can coexist in one process.
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = IntCounterVec::new(
            Opts::new("pawn_operations_total", "Operation counts"),
            &["operation", "outcome"],
        )
        .map_err(|e| Error::Config(format!("metrics: {}", e)))?;
        registry
            .register(Box::new(operations_total.clone()))
            .map_err(|e| Error::Config(format!("metrics: {}", e)))?;

        let operation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pawn_operation_duration_seconds",
                "Histogram of operation latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )
        .map_err(|e| Error::Config(format!("metrics: {}", e)))?;
        registry
            .register(Box::new(operation_duration.clone()))
            .map_err(|e| Error::Config(format!("metrics: {}", e)))?;

        let loans_opened_total =
            IntCounter::new("pawn_loans_opened_total", "Loans opened by deposit")
                .map_err(|e| Error::Config(format!("metrics: {}", e)))?;
        registry
            .register(Box::new(loans_opened_total.clone()))
            .map_err(|e| Error::Config(format!("metrics: {}", e)))?;

        let loans_repaid_total =
            IntCounter::new("pawn_loans_repaid_total", "Loans settled by repay")
                .map_err(|e| Error::Config(format!("metrics: {}", e)))?;
        registry
            .register(Box::new(loans_repaid_total.clone()))
            .map_err(|e| Error::Config(format!("metrics: {}", e)))?;

        Ok(Self {
            operations_total,
            operation_duration,
            loans_opened_total,
            loans_repaid_total,
            registry,
        })
    }

    /// Record one operation outcome.
    pub fn observe(&self, operation: &str, ok: bool, seconds: f64) {
        let outcome = if ok { "ok" } else { "rejected" };
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.operation_duration.observe(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let metrics = Metrics::new().unwrap();
        metrics.observe("lend", true, 0.001);
        metrics.observe("lend", false, 0.002);
        metrics.loans_opened_total.inc();

        assert_eq!(
            metrics
                .operations_total
                .with_label_values(&["lend", "ok"])
                .get(),
            1
        );
        assert_eq!(
            metrics
                .operations_total
                .with_label_values(&["lend", "rejected"])
                .get(),
            1
        );
        assert_eq!(metrics.loans_opened_total.get(), 1);
    }

    #[test]
    fn test_independent_registries() {
        // Two collectors must not clash over metric names.
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.loans_repaid_total.inc();
        assert_eq!(b.loans_repaid_total.get(), 0);
    }
}
