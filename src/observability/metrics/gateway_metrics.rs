//! # Gateway Metrics
//!
//! Metrics for calls made through the remote resource gateway.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec};
use std::sync::LazyLock;

static GATEWAY_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "credential_provisioner_gateway_operations_total",
            "Total number of gateway calls, by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create GATEWAY_OPERATIONS_TOTAL metric - this should never happen")
});

static GATEWAY_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "credential_provisioner_gateway_errors_total",
            "Total number of failed gateway calls, by operation and error status",
        ),
        &["operation", "status"],
    )
    .expect("Failed to create GATEWAY_ERRORS_TOTAL metric - this should never happen")
});

static GATEWAY_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "credential_provisioner_gateway_duration_seconds",
            "Duration of gateway calls in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["operation"],
    )
    .expect("Failed to create GATEWAY_DURATION metric - this should never happen")
});

/// Register gateway metrics with the registry
pub(crate) fn register_gateway_metrics() -> Result<()> {
    REGISTRY.register(Box::new(GATEWAY_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GATEWAY_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GATEWAY_DURATION.clone()))?;
    Ok(())
}

/// Record a completed gateway call
pub fn record_gateway_operation(operation: &str, duration: f64) {
    GATEWAY_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
    GATEWAY_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_gateway_errors(operation: &str, status: &str) {
    GATEWAY_ERRORS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}
