//! # Resource Spec Builder
//!
//! Turns a [`CredentialDraft`] into the two payloads a provisioning session
//! creates: the secret holding the sensitive fields and the credential custom
//! resource that references it.
//!
//! Building is pure. It never touches the network, and a draft that fails
//! here never reaches the gateway.
//!
//! ## Sub-modules
//!
//! - `draft` - The in-memory form input
//! - `validation` - Name and field-combination checks shared by all kinds
//! - `vmware`, `openstack`, `array` - Per-kind field rules and resource bodies

mod array;
mod draft;
mod openstack;
mod validation;
mod vmware;

pub use draft::CredentialDraft;

use crate::constants::{
    CREDENTIAL_SOURCE_LABEL, CREDENTIAL_SOURCE_MANUAL, MANAGED_BY_LABEL, MANAGED_BY_VALUE,
};
use crate::crd::{CredentialKind, SecretRef};
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use kube::core::DynamicObject;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// One problem found in a draft
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldIssue {
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("{field} is required")]
    Missing { field: String },
    #[error("conflicting fields {}: provide only one of them", .fields.join(", "))]
    Conflict { fields: Vec<String> },
    #[error("incomplete field group: {} set but {} missing", .present.join(", "), .missing.join(", "))]
    Incomplete {
        present: Vec<String>,
        missing: Vec<String>,
    },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("unknown field {field}")]
    Unknown { field: String },
}

/// A draft could not be turned into payloads
///
/// Lists every issue found, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} credential '{name}': {}", summarize(.issues))]
pub struct BuildError {
    pub kind: CredentialKind,
    pub name: String,
    pub issues: Vec<FieldIssue>,
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl BuildError {
    /// Names of every field involved in a conflict
    pub fn conflicting_fields(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                FieldIssue::Conflict { fields } => Some(fields),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// Bodies for one provisioning attempt
pub struct ProvisioningPayload {
    pub kind: CredentialKind,
    pub namespace: String,
    pub resource_name: String,
    pub secret_name: String,
    /// Secret to create first; `None` when the kind allows a credential without one
    pub secret: Option<Secret>,
    /// Credential resource, referencing the secret by name
    pub resource: DynamicObject,
}

impl fmt::Debug for ProvisioningPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningPayload")
            .field("kind", &self.kind)
            .field("namespace", &self.namespace)
            .field("resource_name", &self.resource_name)
            .field("secret_name", &self.secret_name)
            .field("has_secret", &self.secret.is_some())
            .finish_non_exhaustive()
    }
}

/// Per-kind field rules and resource construction
///
/// Every credential kind goes through [`build`] via this one interface.
trait KindRules {
    /// Secret field names the kind accepts
    const SECRET_FIELDS: &'static [&'static str];
    /// Resource spec field names the kind accepts
    const RESOURCE_FIELDS: &'static [&'static str];

    /// Push every field-combination problem in the draft
    fn check(draft: &CredentialDraft, issues: &mut Vec<FieldIssue>);

    /// Whether this draft produces a secret at all
    fn needs_secret(_draft: &CredentialDraft) -> bool {
        true
    }

    /// Build the typed credential resource as JSON
    fn resource(
        draft: &CredentialDraft,
        secret_ref: Option<SecretRef>,
    ) -> Result<serde_json::Value, serde_json::Error>;
}

/// Build the secret and resource payloads for a draft
///
/// # Errors
///
/// Returns a [`BuildError`] listing every missing, conflicting or malformed field.
pub fn build(draft: &CredentialDraft, namespace: &str) -> Result<ProvisioningPayload, BuildError> {
    match draft.kind {
        CredentialKind::VMware => assemble::<vmware::VMwareRules>(draft, namespace),
        CredentialKind::OpenStack => assemble::<openstack::OpenStackRules>(draft, namespace),
        CredentialKind::StorageArray => assemble::<array::ArrayRules>(draft, namespace),
    }
}

fn assemble<R: KindRules>(
    draft: &CredentialDraft,
    namespace: &str,
) -> Result<ProvisioningPayload, BuildError> {
    let mut issues = Vec::new();
    validation::check_name(&draft.name, &mut issues);
    validation::check_known(&draft.secret_fields, R::SECRET_FIELDS, &mut issues);
    validation::check_known(&draft.resource_fields, R::RESOURCE_FIELDS, &mut issues);
    R::check(draft, &mut issues);

    let fail = |issues| BuildError {
        kind: draft.kind,
        name: draft.name.clone(),
        issues,
    };

    if !issues.is_empty() {
        return Err(fail(issues));
    }

    let secret_name = draft.kind.secret_name(&draft.name);
    let labels = provenance_labels();

    let secret = R::needs_secret(draft).then(|| Secret {
        metadata: ObjectMeta {
            name: Some(secret_name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        string_data: Some(
            draft
                .secret_fields
                .iter()
                .filter(|(_, value)| !value.trim().is_empty())
                .map(|(key, value)| (key.clone(), value.trim().to_string()))
                .collect(),
        ),
        ..Default::default()
    });

    let secret_ref = secret.as_ref().map(|_| SecretRef {
        name: secret_name.clone(),
    });

    let mut resource = R::resource(draft, secret_ref)
        .and_then(serde_json::from_value::<DynamicObject>)
        .map_err(|e| {
            fail(vec![FieldIssue::InvalidValue {
                field: "spec".to_string(),
                reason: format!("failed to serialize resource: {e}"),
            }])
        })?;
    resource.metadata.namespace = Some(namespace.to_string());
    resource.metadata.labels = Some(labels);

    Ok(ProvisioningPayload {
        kind: draft.kind,
        namespace: namespace.to_string(),
        resource_name: draft.name.clone(),
        secret_name,
        secret,
        resource,
    })
}

fn provenance_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            CREDENTIAL_SOURCE_LABEL.to_string(),
            CREDENTIAL_SOURCE_MANUAL.to_string(),
        ),
        (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
    ])
}

/// Serialize a typed custom resource for conversion into a `DynamicObject`
fn to_json<K: Serialize>(resource: &K) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openstack_token_only_builds() {
        let draft = CredentialDraft::new(CredentialKind::OpenStack, "pcd-east")
            .with_secret("OS_AUTH_URL", "https://keystone.example.com/v3")
            .with_secret("OS_AUTH_TOKEN", "gAAAAAB-token")
            .with_secret("OS_REGION_NAME", "RegionOne");

        let payload = build(&draft, "migration-system").unwrap();

        assert_eq!(payload.resource_name, "pcd-east");
        assert_eq!(payload.secret_name, "pcd-east-openstack-secret");
        let secret = payload.secret.as_ref().unwrap();
        assert_eq!(
            secret.metadata.name.as_deref(),
            Some("pcd-east-openstack-secret")
        );
        assert_eq!(secret.metadata.namespace.as_deref(), Some("migration-system"));
        let data = secret.string_data.as_ref().unwrap();
        assert_eq!(data.get("OS_AUTH_TOKEN").map(String::as_str), Some("gAAAAAB-token"));
        assert!(!data.contains_key("OS_USERNAME"));

        let types = payload.resource.types.as_ref().unwrap();
        assert_eq!(types.kind, "OpenstackCreds");
        assert_eq!(types.api_version, "vjailbreak.k8s.pf9.io/v1alpha1");
        assert_eq!(payload.resource.metadata.name.as_deref(), Some("pcd-east"));
        assert_eq!(
            payload.resource.data["spec"]["secretRef"]["name"],
            "pcd-east-openstack-secret"
        );
    }

    #[test]
    fn test_token_and_password_conflict_names_both() {
        let draft = CredentialDraft::new(CredentialKind::OpenStack, "pcd-east")
            .with_secret("OS_AUTH_URL", "https://keystone.example.com/v3")
            .with_secret("OS_AUTH_TOKEN", "gAAAAAB-token")
            .with_secret("OS_USERNAME", "admin")
            .with_secret("OS_PASSWORD", "secret");

        let err = build(&draft, "migration-system").unwrap_err();

        let conflicting = err.conflicting_fields();
        assert!(conflicting.contains(&"OS_AUTH_TOKEN"));
        assert!(conflicting.contains(&"OS_USERNAME"));
        assert!(conflicting.contains(&"OS_PASSWORD"));
        assert!(err.to_string().contains("conflicting fields"));
    }

    #[test]
    fn test_every_issue_is_reported() {
        let draft = CredentialDraft::new(CredentialKind::VMware, "VC_Lab")
            .with_secret("VCENTER_HOST", "vcenter.example.com")
            .with_secret("VCENTER_INSECURE", "maybe")
            .with_secret("VCENTER_PASSWROD", "typo");

        let err = build(&draft, "migration-system").unwrap_err();

        assert!(err
            .issues
            .iter()
            .any(|i| matches!(i, FieldIssue::InvalidName { .. })));
        assert!(err.issues.contains(&FieldIssue::Missing {
            field: "VCENTER_USERNAME".to_string()
        }));
        assert!(err.issues.contains(&FieldIssue::Missing {
            field: "VCENTER_PASSWORD".to_string()
        }));
        assert!(err.issues.contains(&FieldIssue::Unknown {
            field: "VCENTER_PASSWROD".to_string()
        }));
        assert!(err
            .issues
            .iter()
            .any(|i| matches!(i, FieldIssue::InvalidValue { field, .. } if field == "VCENTER_INSECURE")));
    }

    #[test]
    fn test_provenance_label_on_both_bodies() {
        let draft = CredentialDraft::new(CredentialKind::VMware, "vc-lab")
            .with_secret("VCENTER_HOST", "vcenter.example.com")
            .with_secret("VCENTER_USERNAME", "administrator@vsphere.local")
            .with_secret("VCENTER_PASSWORD", "secret")
            .with_field("datacenter", "dc1");

        let payload = build(&draft, "migration-system").unwrap();

        let secret_labels = payload.secret.unwrap().metadata.labels.unwrap();
        let resource_labels = payload.resource.metadata.labels.unwrap();
        for labels in [secret_labels, resource_labels] {
            assert_eq!(
                labels.get(CREDENTIAL_SOURCE_LABEL).map(String::as_str),
                Some(CREDENTIAL_SOURCE_MANUAL)
            );
        }
        assert_eq!(payload.resource.data["spec"]["datacenter"], "dc1");
    }

    #[test]
    fn test_payload_debug_omits_secret_data() {
        let draft = CredentialDraft::new(CredentialKind::VMware, "vc-lab")
            .with_secret("VCENTER_HOST", "vcenter.example.com")
            .with_secret("VCENTER_USERNAME", "administrator@vsphere.local")
            .with_secret("VCENTER_PASSWORD", "hunter2");
        let payload = build(&draft, "migration-system").unwrap();
        assert!(!format!("{payload:?}").contains("hunter2"));
    }
}
