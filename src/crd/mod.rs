//! # Custom Resource Definitions
//!
//! CRD types for the three credential kinds managed by the provisioner.
//!
//! Every credential resource references a core `Secret` holding the sensitive
//! fields and reports the reconciler's verdict in `status.validationStatus`.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: vjailbreak.k8s.pf9.io/v1alpha1
//! kind: OpenstackCreds
//! metadata:
//!   name: pcd-east
//!   namespace: migration-system
//!   labels:
//!     vjailbreak.k8s.pf9.io/credential-source: manual
//! spec:
//!   secretRef:
//!     name: pcd-east-openstack-secret
//! status:
//!   validationStatus: Succeeded
//!   validationMessage: Credentials are valid
//! ```

mod kind;
mod status;

pub use kind::{CredentialKind, ParseCredentialKindError};
pub use status::CredentialStatus;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to the secret that holds a credential's sensitive fields
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    /// Name of the secret in the credential's namespace
    pub name: String,
}

/// VMware vCenter credentials
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "VMwareCreds",
    group = "vjailbreak.k8s.pf9.io",
    version = "v1alpha1",
    namespaced,
    status = "CredentialStatus",
    plural = "vmwarecreds",
    shortname = "vmwc",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.validationStatus"}, {"name":"Message", "type":"string", "jsonPath":".status.validationMessage"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VMwareCredsSpec {
    pub secret_ref: SecretRef,
    /// Datacenter to scope discovery to (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
}

/// OpenStack credentials
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "OpenstackCreds",
    group = "vjailbreak.k8s.pf9.io",
    version = "v1alpha1",
    namespaced,
    status = "CredentialStatus",
    plural = "openstackcreds",
    shortname = "osc",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.validationStatus"}, {"name":"Message", "type":"string", "jsonPath":".status.validationMessage"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OpenstackCredsSpec {
    pub secret_ref: SecretRef,
}

/// Storage array credentials
///
/// The secret is optional: arrays may be registered for inventory before
/// management credentials are known.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ArrayCreds",
    group = "vjailbreak.k8s.pf9.io",
    version = "v1alpha1",
    namespaced,
    status = "CredentialStatus",
    plural = "arraycreds",
    shortname = "arrc",
    printcolumn = r#"{"name":"Vendor", "type":"string", "jsonPath":".spec.vendorType"}, {"name":"Status", "type":"string", "jsonPath":".status.validationStatus"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ArrayCredsSpec {
    /// Storage vendor, e.g. "pure" or "netapp"
    pub vendor_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::{CustomResourceExt, Resource};

    #[test]
    fn test_crd_names() {
        assert_eq!(VMwareCreds::crd_name(), "vmwarecreds.vjailbreak.k8s.pf9.io");
        assert_eq!(
            OpenstackCreds::crd_name(),
            "openstackcreds.vjailbreak.k8s.pf9.io"
        );
        assert_eq!(ArrayCreds::crd_name(), "arraycreds.vjailbreak.k8s.pf9.io");
    }

    #[test]
    fn test_spec_serializes_camel_case() {
        let creds = VMwareCreds::new(
            "vc-lab",
            VMwareCredsSpec {
                secret_ref: SecretRef {
                    name: "vc-lab-vmware-secret".to_string(),
                },
                datacenter: None,
            },
        );
        let value = serde_json::to_value(&creds).unwrap();
        assert_eq!(value["spec"]["secretRef"]["name"], "vc-lab-vmware-secret");
        assert!(value["spec"].get("datacenter").is_none());
        assert_eq!(VMwareCreds::kind(&()), "VMwareCreds");
    }
}
