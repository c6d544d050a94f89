//! Credential verification module.
//!
//! Salted Argon2id hashing, the read-only credential table, and the
//! provisioning helper used by `relay-credential`.

mod credentials;
mod hashing;

pub use credentials::{
    provision_entry, verify, CredentialRecord, CredentialTable, PLACEHOLDER_IDENTITY,
};
pub use hashing::{generate_salt, hashes_match, salted_hash};
