//! # Session Metrics
//!
//! Metrics for provisioning sessions: starts, terminal outcomes, status
//! polling and compensation deletes.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::LazyLock;

static SESSIONS_STARTED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "credential_provisioner_sessions_started_total",
            "Total number of provisioning sessions started, by credential kind",
        ),
        &["kind"],
    )
    .expect("Failed to create SESSIONS_STARTED_TOTAL metric - this should never happen")
});

static SESSIONS_REJECTED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "credential_provisioner_sessions_rejected_total",
            "Total number of sessions rejected before any remote call, by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create SESSIONS_REJECTED_TOTAL metric - this should never happen")
});

static SESSION_OUTCOMES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "credential_provisioner_session_outcomes_total",
            "Total number of sessions reaching a terminal state, by kind and state",
        ),
        &["kind", "state"],
    )
    .expect("Failed to create SESSION_OUTCOMES_TOTAL metric - this should never happen")
});

static SESSION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "credential_provisioner_session_duration_seconds",
            "Time from session start to terminal state in seconds",
        )
        .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .expect("Failed to create SESSION_DURATION metric - this should never happen")
});

static POLL_ATTEMPTS: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "credential_provisioner_poll_attempts",
            "Number of status fetches needed before polling stopped",
        )
        .buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 30.0]),
    )
    .expect("Failed to create POLL_ATTEMPTS metric - this should never happen")
});

static POLL_TIMEOUTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "credential_provisioner_poll_timeouts_total",
        "Total number of status polls that exhausted their attempt budget",
    )
    .expect("Failed to create POLL_TIMEOUTS_TOTAL metric - this should never happen")
});

static COMPENSATION_DELETES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "credential_provisioner_compensation_deletes_total",
            "Total number of compensating deletes, by target and result",
        ),
        &["target", "result"],
    )
    .expect("Failed to create COMPENSATION_DELETES_TOTAL metric - this should never happen")
});

/// Register session metrics with the registry
pub(crate) fn register_session_metrics() -> Result<()> {
    REGISTRY.register(Box::new(SESSIONS_STARTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SESSIONS_REJECTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SESSION_OUTCOMES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SESSION_DURATION.clone()))?;
    REGISTRY.register(Box::new(POLL_ATTEMPTS.clone()))?;
    REGISTRY.register(Box::new(POLL_TIMEOUTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COMPENSATION_DELETES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_sessions_started(kind: &str) {
    SESSIONS_STARTED_TOTAL.with_label_values(&[kind]).inc();
}

/// Reason is one of `invalid_draft` or `duplicate_session`
pub fn increment_sessions_rejected(reason: &str) {
    SESSIONS_REJECTED_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_session_outcome(kind: &str, state: &str, duration: f64) {
    SESSION_OUTCOMES_TOTAL.with_label_values(&[kind, state]).inc();
    SESSION_DURATION.observe(duration);
}

pub fn observe_poll_attempts(attempts: u32) {
    POLL_ATTEMPTS.observe(f64::from(attempts));
}

pub fn increment_poll_timeouts() {
    POLL_TIMEOUTS_TOTAL.inc();
}

pub fn increment_compensation_deletes(target: &str, result: &str) {
    COMPENSATION_DELETES_TOTAL
        .with_label_values(&[target, result])
        .inc();
}
