//! # Compensation Executor
//!
//! Undoes the remote side-effects of a provisioning session that did not
//! end in success. The credential resource is deleted before its secret, each
//! delete is attempted independently, and an already-missing object counts
//! as cleaned up. Compensation never fails as a whole; per-side failures are
//! reported in the [`CompensationResult`] so callers can advise manual
//! cleanup.

use crate::crd::CredentialKind;
use crate::gateway::{GatewayError, RemoteResourceGateway};
use crate::observability::metrics;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

/// What a session created and may need to undo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationTarget {
    pub kind: CredentialKind,
    pub namespace: String,
    pub resource_name: String,
    pub secret_name: String,
    pub created_resource: bool,
    pub created_secret: bool,
}

/// Result of one compensating delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The object was already gone
    AlreadyGone,
    /// Never created, so nothing to delete
    Skipped,
    Failed(GatewayError),
}

impl DeleteOutcome {
    pub fn is_clean(&self) -> bool {
        !matches!(self, DeleteOutcome::Failed(_))
    }

    fn as_str(&self) -> &'static str {
        match self {
            DeleteOutcome::Deleted => "deleted",
            DeleteOutcome::AlreadyGone => "already_gone",
            DeleteOutcome::Skipped => "skipped",
            DeleteOutcome::Failed(_) => "failed",
        }
    }
}

/// Which side a compensating delete targeted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationSide {
    Resource,
    Secret,
}

impl fmt::Display for CompensationSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompensationSide::Resource => f.write_str("resource"),
            CompensationSide::Secret => f.write_str("secret"),
        }
    }
}

/// A compensating delete failed and the object may be left behind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to delete {side} {namespace}/{name}: {source}")]
pub struct CompensationError {
    pub side: CompensationSide,
    pub namespace: String,
    pub name: String,
    pub source: GatewayError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationResult {
    pub target: CompensationTarget,
    pub resource: DeleteOutcome,
    pub secret: DeleteOutcome,
}

impl CompensationResult {
    /// Errors for the deletes that failed, resource first
    pub fn errors(&self) -> Vec<CompensationError> {
        [
            (CompensationSide::Resource, &self.resource, &self.target.resource_name),
            (CompensationSide::Secret, &self.secret, &self.target.secret_name),
        ]
        .into_iter()
        .filter_map(|(side, outcome, name)| match outcome {
            DeleteOutcome::Failed(source) => Some(CompensationError {
                side,
                namespace: self.target.namespace.clone(),
                name: name.clone(),
                source: source.clone(),
            }),
            _ => None,
        })
        .collect()
    }

    pub fn requires_manual_cleanup(&self) -> bool {
        !(self.resource.is_clean() && self.secret.is_clean())
    }
}

pub struct CompensationExecutor<'a> {
    gateway: &'a dyn RemoteResourceGateway,
}

impl fmt::Debug for CompensationExecutor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompensationExecutor").finish_non_exhaustive()
    }
}

impl<'a> CompensationExecutor<'a> {
    pub fn new(gateway: &'a dyn RemoteResourceGateway) -> Self {
        Self { gateway }
    }

    /// Delete whatever the target says was created, resource before secret
    pub async fn compensate(&self, target: &CompensationTarget) -> CompensationResult {
        let resource = if target.created_resource {
            settle(
                self.gateway
                    .delete_resource(target.kind, &target.resource_name, &target.namespace)
                    .await,
            )
        } else {
            DeleteOutcome::Skipped
        };
        metrics::increment_compensation_deletes("resource", resource.as_str());

        let secret = if target.created_secret {
            settle(
                self.gateway
                    .delete_secret(&target.secret_name, &target.namespace)
                    .await,
            )
        } else {
            DeleteOutcome::Skipped
        };
        metrics::increment_compensation_deletes("secret", secret.as_str());

        let result = CompensationResult {
            target: target.clone(),
            resource,
            secret,
        };

        if result.requires_manual_cleanup() {
            for error in result.errors() {
                warn!(
                    credential.kind = target.kind.as_str(),
                    "Compensation incomplete, delete manually: {}", error
                );
            }
        } else {
            info!(
                credential.kind = target.kind.as_str(),
                credential.name = %target.resource_name,
                resource = result.resource.as_str(),
                secret = result.secret.as_str(),
                "Compensation complete"
            );
        }

        result
    }
}

fn settle(result: Result<(), GatewayError>) -> DeleteOutcome {
    match result {
        Ok(()) => DeleteOutcome::Deleted,
        Err(e) if e.is_not_found() => DeleteOutcome::AlreadyGone,
        Err(e) => DeleteOutcome::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> CompensationTarget {
        CompensationTarget {
            kind: CredentialKind::VMware,
            namespace: "migration-system".to_string(),
            resource_name: "vc-lab".to_string(),
            secret_name: "vc-lab-vmware-secret".to_string(),
            created_resource: true,
            created_secret: true,
        }
    }

    #[test]
    fn test_settle() {
        assert_eq!(settle(Ok(())), DeleteOutcome::Deleted);
        assert_eq!(
            settle(Err(GatewayError::not_found("gone"))),
            DeleteOutcome::AlreadyGone
        );
        assert!(matches!(
            settle(Err(GatewayError::from_code(500, "boom"))),
            DeleteOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_errors_only_for_failed_sides() {
        let result = CompensationResult {
            target: target(),
            resource: DeleteOutcome::AlreadyGone,
            secret: DeleteOutcome::Failed(GatewayError::from_code(403, "forbidden")),
        };

        assert!(result.requires_manual_cleanup());
        let errors = result.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].side, CompensationSide::Secret);
        assert_eq!(errors[0].name, "vc-lab-vmware-secret");
        assert!(errors[0]
            .to_string()
            .starts_with("failed to delete secret migration-system/vc-lab-vmware-secret"));
    }

    #[test]
    fn test_clean_result() {
        let result = CompensationResult {
            target: target(),
            resource: DeleteOutcome::Deleted,
            secret: DeleteOutcome::Skipped,
        };
        assert!(!result.requires_manual_cleanup());
        assert!(result.errors().is_empty());
    }
}
