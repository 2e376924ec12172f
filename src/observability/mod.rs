//! # Observability
//!
//! Prometheus metrics for provisioning sessions and gateway calls.
//! Logging goes through `tracing` directly at each call site.

pub mod metrics;
