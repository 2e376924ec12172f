//! Session failure reasons and start-up rejections.

use crate::builder::BuildError;
use crate::crd::CredentialKind;
use crate::gateway::{GatewayError, GatewayOperation};
use crate::poller::PollTimeoutError;
use thiserror::Error;

/// Why a session did not end in `Validated`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    #[error("{operation} failed: {source}")]
    Gateway {
        operation: GatewayOperation,
        source: GatewayError,
    },

    /// The credential resource already exists; nothing is cleaned up
    #[error("{kind} credential '{name}' already exists")]
    AlreadyExists { kind: CredentialKind, name: String },

    #[error("credential validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("timed out waiting for validation: {0}")]
    TimedOut(#[from] PollTimeoutError),

    #[error("provisioning cancelled")]
    Cancelled,
}

/// A session could not be started
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("a provisioning session for {kind} credential {namespace}/{name} is already active")]
    DuplicateSession {
        kind: CredentialKind,
        namespace: String,
        name: String,
    },
}
