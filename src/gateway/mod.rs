//! # Remote Resource Gateway
//!
//! The single seam between a provisioning session and the cluster API.
//! Sessions only ever talk to a [`RemoteResourceGateway`], so tests can swap
//! in a scripted implementation and production uses [`KubeGateway`].

mod kube_gateway;

pub use kube_gateway::KubeGateway;

use crate::crd::CredentialKind;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::core::DynamicObject;
use std::fmt;
use thiserror::Error;

/// Coarse classification of a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayStatus {
    NotFound,
    Conflict,
    Other,
}

impl GatewayStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            404 => GatewayStatus::NotFound,
            409 => GatewayStatus::Conflict,
            _ => GatewayStatus::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayStatus::NotFound => "not_found",
            GatewayStatus::Conflict => "conflict",
            GatewayStatus::Other => "other",
        }
    }
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote call failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", .code.map(|c| format!(" (HTTP {c})")).unwrap_or_default())]
pub struct GatewayError {
    pub status: GatewayStatus,
    /// HTTP status code, when the failure came from an API response
    pub code: Option<u16>,
    pub message: String,
}

impl GatewayError {
    pub fn from_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: GatewayStatus::from_code(code),
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_code(404, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::from_code(409, message)
    }

    /// Transport or client-side failure with no HTTP status
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            status: GatewayStatus::Other,
            code: None,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == GatewayStatus::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.status == GatewayStatus::Conflict
    }
}

/// Which gateway call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOperation {
    CreateSecret,
    CreateResource,
    GetResource,
    DeleteResource,
    DeleteSecret,
}

impl GatewayOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayOperation::CreateSecret => "create_secret",
            GatewayOperation::CreateResource => "create_resource",
            GatewayOperation::GetResource => "get_resource",
            GatewayOperation::DeleteResource => "delete_resource",
            GatewayOperation::DeleteSecret => "delete_secret",
        }
    }
}

impl fmt::Display for GatewayOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote API used by provisioning sessions
///
/// Implementations must be safe to share between concurrently running
/// sessions.
#[async_trait]
pub trait RemoteResourceGateway: Send + Sync {
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret, GatewayError>;

    async fn create_resource(
        &self,
        kind: CredentialKind,
        namespace: &str,
        body: &DynamicObject,
    ) -> Result<DynamicObject, GatewayError>;

    async fn get_resource(
        &self,
        kind: CredentialKind,
        name: &str,
        namespace: &str,
    ) -> Result<DynamicObject, GatewayError>;

    async fn delete_resource(
        &self,
        kind: CredentialKind,
        name: &str,
        namespace: &str,
    ) -> Result<(), GatewayError>;

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_code() {
        assert_eq!(GatewayStatus::from_code(404), GatewayStatus::NotFound);
        assert_eq!(GatewayStatus::from_code(409), GatewayStatus::Conflict);
        assert_eq!(GatewayStatus::from_code(500), GatewayStatus::Other);
        assert_eq!(GatewayStatus::from_code(403), GatewayStatus::Other);
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::conflict("arraycreds \"pure-01\" already exists");
        assert!(err.is_conflict());
        assert_eq!(
            err.to_string(),
            "arraycreds \"pure-01\" already exists (HTTP 409)"
        );
        assert_eq!(GatewayError::other("connection reset").to_string(), "connection reset");
    }
}
