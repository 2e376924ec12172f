//! VMware vCenter credential rules.

use super::validation::{check_bool, check_required};
use super::{to_json, CredentialDraft, FieldIssue, KindRules};
use crate::crd::{SecretRef, VMwareCreds, VMwareCredsSpec};

pub(super) const VCENTER_HOST: &str = "VCENTER_HOST";
pub(super) const VCENTER_USERNAME: &str = "VCENTER_USERNAME";
pub(super) const VCENTER_PASSWORD: &str = "VCENTER_PASSWORD";
pub(super) const VCENTER_INSECURE: &str = "VCENTER_INSECURE";

pub(super) struct VMwareRules;

impl KindRules for VMwareRules {
    const SECRET_FIELDS: &'static [&'static str] = &[
        VCENTER_HOST,
        VCENTER_USERNAME,
        VCENTER_PASSWORD,
        VCENTER_INSECURE,
    ];
    const RESOURCE_FIELDS: &'static [&'static str] = &["datacenter"];

    fn check(draft: &CredentialDraft, issues: &mut Vec<FieldIssue>) {
        check_required(
            &draft.secret_fields,
            &[VCENTER_HOST, VCENTER_USERNAME, VCENTER_PASSWORD],
            issues,
        );
        check_bool(&draft.secret_fields, VCENTER_INSECURE, issues);
    }

    fn resource(
        draft: &CredentialDraft,
        secret_ref: Option<SecretRef>,
    ) -> Result<serde_json::Value, serde_json::Error> {
        let Some(secret_ref) = secret_ref else {
            return Err(serde::ser::Error::custom(
                "VMware credentials always reference a secret",
            ));
        };
        let datacenter = draft
            .resource_fields
            .get("datacenter")
            .map(|dc| dc.trim().to_string())
            .filter(|dc| !dc.is_empty());
        to_json(&VMwareCreds::new(
            &draft.name,
            VMwareCredsSpec {
                secret_ref,
                datacenter,
            },
        ))
    }
}
