//! Storage array credential rules.
//!
//! Management access is optional, but if any of endpoint, username or
//! password is given then all three must be.

use super::validation::{check_all_or_none, check_required, check_url, is_present};
use super::{to_json, CredentialDraft, FieldIssue, KindRules};
use crate::crd::{ArrayCreds, ArrayCredsSpec, SecretRef};

pub(super) const ARRAY_MANAGEMENT_ENDPOINT: &str = "ARRAY_MANAGEMENT_ENDPOINT";
pub(super) const ARRAY_USERNAME: &str = "ARRAY_USERNAME";
pub(super) const ARRAY_PASSWORD: &str = "ARRAY_PASSWORD";
pub(super) const VENDOR_TYPE: &str = "vendorType";

const MANAGEMENT_ACCESS: [&str; 3] = [ARRAY_MANAGEMENT_ENDPOINT, ARRAY_USERNAME, ARRAY_PASSWORD];

pub(super) struct ArrayRules;

impl KindRules for ArrayRules {
    const SECRET_FIELDS: &'static [&'static str] = &MANAGEMENT_ACCESS;
    const RESOURCE_FIELDS: &'static [&'static str] = &[VENDOR_TYPE];

    fn check(draft: &CredentialDraft, issues: &mut Vec<FieldIssue>) {
        check_required(&draft.resource_fields, &[VENDOR_TYPE], issues);
        check_all_or_none(&draft.secret_fields, &MANAGEMENT_ACCESS, issues);
        check_url(&draft.secret_fields, ARRAY_MANAGEMENT_ENDPOINT, issues);
    }

    fn needs_secret(draft: &CredentialDraft) -> bool {
        MANAGEMENT_ACCESS
            .iter()
            .all(|field| is_present(&draft.secret_fields, field))
    }

    fn resource(
        draft: &CredentialDraft,
        secret_ref: Option<SecretRef>,
    ) -> Result<serde_json::Value, serde_json::Error> {
        let vendor_type = draft
            .resource_fields
            .get(VENDOR_TYPE)
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_default();
        to_json(&ArrayCreds::new(
            &draft.name,
            ArrayCredsSpec {
                vendor_type,
                secret_ref,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::build;
    use super::*;
    use crate::crd::CredentialKind;

    #[test]
    fn test_inventory_only_array_has_no_secret() {
        let draft = CredentialDraft::new(CredentialKind::StorageArray, "pure-01")
            .with_field(VENDOR_TYPE, "Pure");
        let payload = build(&draft, "migration-system").unwrap();
        assert!(payload.secret.is_none());
        assert_eq!(payload.resource.data["spec"]["vendorType"], "pure");
        assert!(payload.resource.data["spec"].get("secretRef").is_none());
    }

    #[test]
    fn test_full_management_access_references_secret() {
        let draft = CredentialDraft::new(CredentialKind::StorageArray, "pure-01")
            .with_field(VENDOR_TYPE, "pure")
            .with_secret(ARRAY_MANAGEMENT_ENDPOINT, "https://pure-01.example.com")
            .with_secret(ARRAY_USERNAME, "pureuser")
            .with_secret(ARRAY_PASSWORD, "secret");
        let payload = build(&draft, "migration-system").unwrap();
        assert!(payload.secret.is_some());
        assert_eq!(
            payload.resource.data["spec"]["secretRef"]["name"],
            "pure-01-array-secret"
        );
    }

    #[test]
    fn test_partial_management_access_is_rejected() {
        let draft = CredentialDraft::new(CredentialKind::StorageArray, "pure-01")
            .with_field(VENDOR_TYPE, "pure")
            .with_secret(ARRAY_USERNAME, "pureuser");
        let err = build(&draft, "migration-system").unwrap_err();
        assert_eq!(
            err.issues,
            vec![FieldIssue::Incomplete {
                present: vec![ARRAY_USERNAME.to_string()],
                missing: vec![
                    ARRAY_MANAGEMENT_ENDPOINT.to_string(),
                    ARRAY_PASSWORD.to_string()
                ],
            }]
        );
    }

    #[test]
    fn test_vendor_type_required() {
        let draft = CredentialDraft::new(CredentialKind::StorageArray, "pure-01");
        let err = build(&draft, "migration-system").unwrap_err();
        assert!(err.issues.contains(&FieldIssue::Missing {
            field: VENDOR_TYPE.to_string()
        }));
    }
}
