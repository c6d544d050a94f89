//! Credential table and verification.
//!
//! A table maps an identity to its salt and stored hash. Tables are written
//! once by the `relay-credential` utility and only read afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CredentialErrorKind, RelayError};

use super::hashing::{generate_salt, hashes_match, salted_hash};

/// Identity of the built-in placeholder record.
pub const PLACEHOLDER_IDENTITY: &str = "dummy@dummy";

/// Salt and hash stored for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub salt: String,
    pub password_hash: String,
}

/// Read-only map from identity to credential record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialTable {
    records: BTreeMap<String, CredentialRecord>,
}

impl CredentialTable {
    /// Table holding only the placeholder record, which nothing verifies against.
    pub fn placeholder() -> Self {
        let mut records = BTreeMap::new();
        records.insert(
            PLACEHOLDER_IDENTITY.to_string(),
            CredentialRecord {
                salt: String::new(),
                password_hash: String::new(),
            },
        );
        Self { records }
    }

    /// Load a table from the JSON the provisioning utility prints.
    ///
    /// Several printed records may be merged into one JSON object.
    pub fn load(path: &Path) -> Result<Self, RelayError> {
        let unreadable = |message: String| RelayError::Credential {
            kind: CredentialErrorKind::TableUnreadable { message },
        };

        let content = std::fs::read_to_string(path)
            .map_err(|e| unreadable(format!("{}: {}", path.display(), e)))?;
        let table: Self = serde_json::from_str(&content)
            .map_err(|e| unreadable(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), identities = table.len(), "Loaded credential table");
        Ok(table)
    }

    pub fn get(&self, identity: &str) -> Option<&CredentialRecord> {
        self.records.get(identity)
    }

    pub fn insert(&mut self, identity: impl Into<String>, record: CredentialRecord) {
        self.records.insert(identity.into(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Check `secret` against the record stored for `identity`.
///
/// Unknown identities return `false` without hashing. Every failure,
/// including malformed salts or stored hashes, is reported only as `false`.
pub fn verify(identity: &str, secret: &str, table: &CredentialTable) -> bool {
    let Some(record) = table.get(identity) else {
        debug!("Credential check for unknown identity");
        return false;
    };

    match salted_hash(secret, &record.salt) {
        Ok(computed) => hashes_match(&computed, &record.password_hash),
        Err(e) => {
            debug!(error = %e, "Credential record unusable");
            false
        }
    }
}

/// Create a table entry for `identity` with a fresh salt.
pub fn provision_entry(identity: &str, secret: &str) -> Result<CredentialTable, RelayError> {
    let salt = generate_salt()?;
    let password_hash = salted_hash(secret, &salt)?;

    let mut table = CredentialTable::default();
    table.insert(identity, CredentialRecord { salt, password_hash });
    Ok(table)
}
