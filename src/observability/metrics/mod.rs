//! # Metrics Module
//!
//! Prometheus metrics, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup and registration
//! - `session_metrics` - Session lifecycle metrics (starts, outcomes, polling, compensation)
//! - `gateway_metrics` - Remote API call metrics (operations, errors, latency)

pub mod gateway_metrics;
pub mod registry;
pub mod session_metrics;

pub use gateway_metrics::*;
pub use registry::*;
pub use session_metrics::*;
