//! # Credential Status
//!
//! Status written by the credential reconciler after it validates a credential.

use kube::core::DynamicObject;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of a credential resource
///
/// Only the reconciler writes this; the provisioner reads it while polling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    /// Validation verdict
    /// Values: AwaitingCredentials, Validating, Succeeded, Failed
    #[serde(default)]
    pub validation_status: Option<String>,
    /// Human-readable detail for the verdict, e.g. the authentication error
    #[serde(default)]
    pub validation_message: Option<String>,
}

impl CredentialStatus {
    /// Extract the status block from an untyped credential resource
    ///
    /// A missing or null status reads as the default (no verdict yet). A
    /// status block of the wrong shape is an error.
    pub fn from_object(obj: &DynamicObject) -> Result<Self, serde_json::Error> {
        match obj.data.get("status") {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(status) => Self::deserialize(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
    use serde_json::json;

    fn object_with(data: serde_json::Value) -> DynamicObject {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk(
            "vjailbreak.k8s.pf9.io",
            "v1alpha1",
            "OpenstackCreds",
        ));
        DynamicObject::new("pcd", &ar).data(data)
    }

    #[test]
    fn test_reads_validation_fields() {
        let obj = object_with(json!({
            "spec": {},
            "status": {"validationStatus": "Failed", "validationMessage": "auth error"}
        }));
        let status = CredentialStatus::from_object(&obj).unwrap();
        assert_eq!(status.validation_status.as_deref(), Some("Failed"));
        assert_eq!(status.validation_message.as_deref(), Some("auth error"));
    }

    #[test]
    fn test_missing_status_is_default() {
        let obj = object_with(json!({"spec": {}}));
        assert_eq!(
            CredentialStatus::from_object(&obj).unwrap(),
            CredentialStatus::default()
        );
    }

    #[test]
    fn test_malformed_status_is_an_error() {
        let obj = object_with(json!({
            "spec": {},
            "status": {"validationStatus": 3}
        }));
        assert!(matches!(CredentialStatus::from_object(&obj), Err(_)));
    }
}
