//! # Session Configuration
//!
//! Namespace and polling budget used by provisioning sessions.

use super::env_var_or_default;
use std::time::Duration;

/// Provisioning session configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    /// Namespace where credential resources and secrets are created
    pub namespace: String,
    /// Delay between two status polls (milliseconds)
    pub poll_interval_ms: u64,
    /// Status polls before the session times out
    /// The effective timeout is `poll_interval_ms * max_poll_attempts`
    pub max_poll_attempts: u32,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            namespace: DEFAULT_CREDENTIALS_NAMESPACE.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl ProvisionerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            namespace: env_var_or_default(
                "CREDENTIALS_NAMESPACE",
                DEFAULT_CREDENTIALS_NAMESPACE.to_string(),
            ),
            poll_interval_ms: env_var_or_default("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            max_poll_attempts: env_var_or_default("MAX_POLL_ATTEMPTS", DEFAULT_MAX_POLL_ATTEMPTS),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Total time a session waits for the reconciler before timing out
    ///
    /// Saturates at `Duration::MAX` for oversized settings.
    pub fn poll_timeout(&self) -> Duration {
        self.poll_interval().saturating_mul(self.max_poll_attempts)
    }
}
