//! OpenStack credential rules.
//!
//! Keystone accepts either a pre-issued token or a username/password/domain
//! triple. Exactly one of the two must be supplied, and the triple must be
//! complete.

use super::validation::{check_all_or_none, check_bool, check_required, check_url, is_present};
use super::{to_json, CredentialDraft, FieldIssue, KindRules};
use crate::crd::{OpenstackCreds, OpenstackCredsSpec, SecretRef};

pub(super) const OS_AUTH_URL: &str = "OS_AUTH_URL";
pub(super) const OS_AUTH_TOKEN: &str = "OS_AUTH_TOKEN";
pub(super) const OS_USERNAME: &str = "OS_USERNAME";
pub(super) const OS_PASSWORD: &str = "OS_PASSWORD";
pub(super) const OS_DOMAIN_NAME: &str = "OS_DOMAIN_NAME";
pub(super) const OS_REGION_NAME: &str = "OS_REGION_NAME";
pub(super) const OS_TENANT_NAME: &str = "OS_TENANT_NAME";
pub(super) const OS_INSECURE: &str = "OS_INSECURE";

const PASSWORD_AUTH: [&str; 3] = [OS_USERNAME, OS_PASSWORD, OS_DOMAIN_NAME];

pub(super) struct OpenStackRules;

impl KindRules for OpenStackRules {
    const SECRET_FIELDS: &'static [&'static str] = &[
        OS_AUTH_URL,
        OS_AUTH_TOKEN,
        OS_USERNAME,
        OS_PASSWORD,
        OS_DOMAIN_NAME,
        OS_REGION_NAME,
        OS_TENANT_NAME,
        OS_INSECURE,
    ];
    const RESOURCE_FIELDS: &'static [&'static str] = &[];

    fn check(draft: &CredentialDraft, issues: &mut Vec<FieldIssue>) {
        let fields = &draft.secret_fields;
        check_required(fields, &[OS_AUTH_URL], issues);
        check_url(fields, OS_AUTH_URL, issues);
        check_bool(fields, OS_INSECURE, issues);

        let has_token = is_present(fields, OS_AUTH_TOKEN);
        let password_fields: Vec<String> = PASSWORD_AUTH
            .iter()
            .filter(|field| is_present(fields, field))
            .map(ToString::to_string)
            .collect();

        if has_token && !password_fields.is_empty() {
            let mut conflicting = vec![OS_AUTH_TOKEN.to_string()];
            conflicting.extend(password_fields);
            issues.push(FieldIssue::Conflict {
                fields: conflicting,
            });
            return;
        }

        if !has_token && password_fields.is_empty() {
            issues.push(FieldIssue::Missing {
                field: format!("{OS_AUTH_TOKEN} or {}", PASSWORD_AUTH.join(" + ")),
            });
            return;
        }

        if !has_token {
            check_all_or_none(fields, &PASSWORD_AUTH, issues);
        }
    }

    fn resource(
        draft: &CredentialDraft,
        secret_ref: Option<SecretRef>,
    ) -> Result<serde_json::Value, serde_json::Error> {
        let Some(secret_ref) = secret_ref else {
            return Err(serde::ser::Error::custom(
                "OpenStack credentials always reference a secret",
            ));
        };
        to_json(&OpenstackCreds::new(
            &draft.name,
            OpenstackCredsSpec { secret_ref },
        ))
    }
}
