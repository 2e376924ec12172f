//! # Field Validation
//!
//! Name and field-combination checks shared by every credential kind.
//! Checks push [`FieldIssue`]s instead of returning early so a single
//! build reports every problem at once.

use super::FieldIssue;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// RFC 1123 label: lowercase alphanumerics and hyphens, alphanumeric at both ends
static DNS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("DNS label regex is valid")
});

static HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("URL regex is valid"));

/// Kubernetes label length limit
const MAX_NAME_LEN: usize = 63;

/// Validate a credential name as a Kubernetes DNS label
pub(crate) fn check_name(name: &str, issues: &mut Vec<FieldIssue>) {
    if name.is_empty() {
        issues.push(FieldIssue::InvalidName {
            name: name.to_string(),
            reason: "name cannot be empty".to_string(),
        });
        return;
    }

    if name.len() > MAX_NAME_LEN {
        issues.push(FieldIssue::InvalidName {
            name: name.to_string(),
            reason: format!(
                "exceeds maximum length of {MAX_NAME_LEN} characters (got {})",
                name.len()
            ),
        });
        return;
    }

    if !DNS_LABEL.is_match(name) {
        issues.push(FieldIssue::InvalidName {
            name: name.to_string(),
            reason: "must be lowercase alphanumeric or '-', starting and ending with an alphanumeric character".to_string(),
        });
    }
}

/// A field counts as present only when it carries a non-blank value
pub(crate) fn is_present(fields: &BTreeMap<String, String>, field: &str) -> bool {
    fields.get(field).is_some_and(|v| !v.trim().is_empty())
}

pub(crate) fn check_required(
    fields: &BTreeMap<String, String>,
    required: &[&str],
    issues: &mut Vec<FieldIssue>,
) {
    for field in required {
        if !is_present(fields, field) {
            issues.push(FieldIssue::Missing {
                field: (*field).to_string(),
            });
        }
    }
}

/// Check that a group of fields is either fully present or fully absent
///
/// Returns true when the whole group is present.
pub(crate) fn check_all_or_none(
    fields: &BTreeMap<String, String>,
    group: &[&str],
    issues: &mut Vec<FieldIssue>,
) -> bool {
    let (present, missing): (Vec<&str>, Vec<&str>) =
        group.iter().copied().partition(|field| is_present(fields, field));

    if !present.is_empty() && !missing.is_empty() {
        issues.push(FieldIssue::Incomplete {
            present: present.iter().map(ToString::to_string).collect(),
            missing: missing.iter().map(ToString::to_string).collect(),
        });
    }

    missing.is_empty()
}

pub(crate) fn check_bool(
    fields: &BTreeMap<String, String>,
    field: &str,
    issues: &mut Vec<FieldIssue>,
) {
    if let Some(value) = fields.get(field) {
        if !matches!(value.trim(), "true" | "false") {
            issues.push(FieldIssue::InvalidValue {
                field: field.to_string(),
                reason: format!("expected 'true' or 'false', got '{}'", value.trim()),
            });
        }
    }
}

pub(crate) fn check_url(fields: &BTreeMap<String, String>, field: &str, issues: &mut Vec<FieldIssue>) {
    if let Some(value) = fields.get(field) {
        if is_present(fields, field) && !HTTP_URL.is_match(value.trim()) {
            issues.push(FieldIssue::InvalidValue {
                field: field.to_string(),
                reason: "must be a URL starting with http:// or https://".to_string(),
            });
        }
    }
}

/// Reject field names the kind does not know about
pub(crate) fn check_known(
    fields: &BTreeMap<String, String>,
    allowed: &[&str],
    issues: &mut Vec<FieldIssue>,
) {
    for field in fields.keys() {
        if !allowed.contains(&field.as_str()) {
            issues.push(FieldIssue::Unknown {
                field: field.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_valid_names() {
        for name in ["a", "vc-lab", "pcd-east-01", "0abc"] {
            let mut issues = Vec::new();
            check_name(name, &mut issues);
            assert!(issues.is_empty(), "{name} should be valid: {issues:?}");
        }
    }

    #[test]
    fn test_invalid_names() {
        let too_long = "a".repeat(64);
        for name in ["", "-lab", "lab-", "Lab", "vc_lab", "vc.lab", too_long.as_str()] {
            let mut issues = Vec::new();
            check_name(name, &mut issues);
            assert_eq!(issues.len(), 1, "{name} should be rejected");
        }
    }

    #[test]
    fn test_blank_value_is_absent() {
        let f = fields(&[("A", "  ")]);
        assert!(!is_present(&f, "A"));
        assert!(!is_present(&f, "B"));
    }

    #[test]
    fn test_all_or_none() {
        let group = ["A", "B", "C"];

        let mut issues = Vec::new();
        assert!(!check_all_or_none(&fields(&[]), &group, &mut issues));
        assert!(issues.is_empty());

        assert!(check_all_or_none(
            &fields(&[("A", "1"), ("B", "2"), ("C", "3")]),
            &group,
            &mut issues
        ));
        assert!(issues.is_empty());

        assert!(!check_all_or_none(&fields(&[("B", "2")]), &group, &mut issues));
        assert_eq!(
            issues,
            vec![FieldIssue::Incomplete {
                present: vec!["B".to_string()],
                missing: vec!["A".to_string(), "C".to_string()],
            }]
        );
    }

    #[test]
    fn test_bool_and_url() {
        let mut issues = Vec::new();
        check_bool(&fields(&[("INSECURE", "yes")]), "INSECURE", &mut issues);
        check_url(&fields(&[("URL", "keystone:5000")]), "URL", &mut issues);
        check_url(&fields(&[("URL", "https://keystone:5000/v3")]), "URL", &mut issues);
        assert_eq!(issues.len(), 2);
    }
}
