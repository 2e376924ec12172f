//! # Provisioner Configuration
//!
//! Settings loaded from environment variables with defaults from [`crate::constants`].
//!
//! The CLI loads this once at startup and lets command-line flags override individual values.

mod provisioner;

pub use provisioner::ProvisionerConfig;

/// Load configuration from environment variables with defaults
pub fn load_config() -> ProvisionerConfig {
    ProvisionerConfig::from_env()
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
