//! # Constants
//!
//! Default values and well-known names shared across the provisioner.

/// Default namespace for credential resources and their secrets
pub const DEFAULT_CREDENTIALS_NAMESPACE: &str = "migration-system";

/// Default delay between two status polls (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default number of status polls before a session times out
/// Together with the interval this gives a 60 second validation budget
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;

/// API group of the credential custom resources
pub const CREDENTIALS_GROUP: &str = "vjailbreak.k8s.pf9.io";

/// API version of the credential custom resources
pub const CREDENTIALS_VERSION: &str = "v1alpha1";

/// Label marking how a credential came into existence
pub const CREDENTIAL_SOURCE_LABEL: &str = "vjailbreak.k8s.pf9.io/credential-source";

/// Value of [`CREDENTIAL_SOURCE_LABEL`] for credentials created through this client
/// Auto-discovered credentials carry a different value
pub const CREDENTIAL_SOURCE_MANUAL: &str = "manual";

/// Standard managed-by label
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`]
pub const MANAGED_BY_VALUE: &str = "credctl";

/// Field manager name used for every write
pub const FIELD_MANAGER: &str = "credctl";

/// Validation status values reported by the credential reconciler
pub const VALIDATION_STATUS_SUCCEEDED: &str = "Succeeded";
pub const VALIDATION_STATUS_AWAITING_CREDENTIALS: &str = "AwaitingCredentials";
pub const VALIDATION_STATUS_VALIDATING: &str = "Validating";
pub const VALIDATION_STATUS_PENDING: &str = "Pending";
