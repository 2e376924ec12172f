//! # Credential Draft
//!
//! In-memory form input for one credential. Never persisted; secret values are
//! wiped when the draft is dropped.

use crate::crd::CredentialKind;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

/// Validated-by-the-form input for one credential submission
pub struct CredentialDraft {
    pub kind: CredentialKind,
    /// Resource name (must be a DNS label)
    pub name: String,
    /// Sensitive fields stored in the secret, keyed by field name
    pub secret_fields: BTreeMap<String, String>,
    /// Non-secret spec fields of the credential resource
    pub resource_fields: BTreeMap<String, String>,
}

impl CredentialDraft {
    pub fn new(kind: CredentialKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            secret_fields: BTreeMap::new(),
            resource_fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_secret(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.secret_fields.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.resource_fields.insert(field.into(), value.into());
        self
    }

    /// Merge secret fields from a dotenv-style file (`KEY=value` per line)
    ///
    /// Later entries win over earlier ones and over fields already set.
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn load_secret_env_file(&mut self, path: &Path) -> Result<usize> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open secrets file {}", path.display()))?;
        let mut loaded = 0;
        for item in dotenvy::from_read_iter(file) {
            let (key, value) = item
                .with_context(|| format!("Failed to parse secrets file {}", path.display()))?;
            self.secret_fields.insert(key, value);
            loaded += 1;
        }
        Ok(loaded)
    }
}

impl Drop for CredentialDraft {
    fn drop(&mut self) {
        for value in self.secret_fields.values_mut() {
            value.zeroize();
        }
    }
}

// Secret values never reach logs; only the field names are shown.
impl fmt::Debug for CredentialDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialDraft")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("secret_fields", &self.secret_fields.keys().collect::<Vec<_>>())
            .field("resource_fields", &self.resource_fields)
            .finish()
    }
}
