//! # Credential Kinds
//!
//! The closed set of credential kinds and their per-kind naming conventions.

use super::{ArrayCreds, OpenstackCreds, VMwareCreds};
use kube::core::ApiResource;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of credential being provisioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    VMware,
    OpenStack,
    StorageArray,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 3] = [
        CredentialKind::VMware,
        CredentialKind::OpenStack,
        CredentialKind::StorageArray,
    ];

    /// Short identifier used in logs, metrics labels and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::VMware => "vmware",
            CredentialKind::OpenStack => "openstack",
            CredentialKind::StorageArray => "array",
        }
    }

    /// Kubernetes kind of the credential resource
    pub fn resource_kind(&self) -> &'static str {
        match self {
            CredentialKind::VMware => "VMwareCreds",
            CredentialKind::OpenStack => "OpenstackCreds",
            CredentialKind::StorageArray => "ArrayCreds",
        }
    }

    /// API resource for untyped access through `Api<DynamicObject>`
    pub fn api_resource(&self) -> ApiResource {
        match self {
            CredentialKind::VMware => ApiResource::erase::<VMwareCreds>(&()),
            CredentialKind::OpenStack => ApiResource::erase::<OpenstackCreds>(&()),
            CredentialKind::StorageArray => ApiResource::erase::<ArrayCreds>(&()),
        }
    }

    /// Suffix appended to the credential name to derive its secret name
    pub fn secret_suffix(&self) -> &'static str {
        match self {
            CredentialKind::VMware => "vmware-secret",
            CredentialKind::OpenStack => "openstack-secret",
            CredentialKind::StorageArray => "array-secret",
        }
    }

    /// Deterministic secret name for a credential of this kind
    pub fn secret_name(&self, resource_name: &str) -> String {
        format!("{}-{}", resource_name, self.secret_suffix())
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown credential kind '{0}' (expected vmware, openstack or array)")]
pub struct ParseCredentialKindError(String);

impl FromStr for CredentialKind {
    type Err = ParseCredentialKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vmware" | "vmwarecreds" => Ok(CredentialKind::VMware),
            "openstack" | "openstackcreds" => Ok(CredentialKind::OpenStack),
            "array" | "storagearray" | "arraycreds" => Ok(CredentialKind::StorageArray),
            _ => Err(ParseCredentialKindError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_names_are_deterministic_per_kind() {
        assert_eq!(
            CredentialKind::VMware.secret_name("vc-lab"),
            "vc-lab-vmware-secret"
        );
        assert_eq!(
            CredentialKind::OpenStack.secret_name("pcd"),
            "pcd-openstack-secret"
        );
        assert_eq!(
            CredentialKind::StorageArray.secret_name("pure-01"),
            "pure-01-array-secret"
        );
    }

    #[test]
    fn test_parse_round_trips_short_names() {
        for kind in CredentialKind::ALL {
            assert_eq!(kind.as_str().parse::<CredentialKind>().unwrap(), kind);
        }
        assert_eq!(
            "OpenstackCreds".parse::<CredentialKind>().unwrap(),
            CredentialKind::OpenStack
        );
        assert!("azure".parse::<CredentialKind>().is_err());
    }

    #[test]
    fn test_api_resource_matches_crd() {
        let ar = CredentialKind::StorageArray.api_resource();
        assert_eq!(ar.group, crate::constants::CREDENTIALS_GROUP);
        assert_eq!(ar.version, crate::constants::CREDENTIALS_VERSION);
        assert_eq!(ar.kind, "ArrayCreds");
        assert_eq!(ar.plural, "arraycreds");
    }
}
