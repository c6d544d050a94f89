//! Salted Argon2id hashing for credential records.
//!
//! Every credential uses the same memory, iteration and parallelism
//! parameters, so a hash is fully determined by the secret and its salt.

use argon2::password_hash::{PasswordHash, PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{CredentialErrorKind, RelayError};

const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 1;

/// Raw salt length in bytes before base64 encoding.
const SALT_LEN: usize = 16;

fn argon2_config() -> Result<Argon2<'static>, RelayError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None).map_err(|e| {
        RelayError::Credential {
            kind: CredentialErrorKind::HashingFailed {
                message: e.to_string(),
            },
        }
    })?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Generate a fresh salt from the OS CSPRNG, as unpadded base64.
pub fn generate_salt() -> Result<String, RelayError> {
    let mut raw = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut raw)
        .map_err(|_| RelayError::Credential {
            kind: CredentialErrorKind::RandomUnavailable,
        })?;

    let salt = SaltString::encode_b64(&raw).map_err(|e| RelayError::Credential {
        kind: CredentialErrorKind::InvalidSalt {
            message: e.to_string(),
        },
    })?;
    Ok(salt.as_str().to_string())
}

/// Hash `secret` with `salt` and return the PHC string.
///
/// Deterministic for a given secret and salt.
pub fn salted_hash(secret: &str, salt: &str) -> Result<String, RelayError> {
    let salt = SaltString::from_b64(salt).map_err(|e| RelayError::Credential {
        kind: CredentialErrorKind::InvalidSalt {
            message: e.to_string(),
        },
    })?;

    let hash = argon2_config()?
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| RelayError::Credential {
            kind: CredentialErrorKind::HashingFailed {
                message: e.to_string(),
            },
        })?;
    Ok(hash.to_string())
}

/// Compare two PHC strings by their hash output.
///
/// The output comparison is constant-time. Unparseable input never matches.
pub fn hashes_match(computed: &str, stored: &str) -> bool {
    let (computed, stored) = match (PasswordHash::new(computed), PasswordHash::new(stored)) {
        (Ok(c), Ok(s)) => (c, s),
        _ => return false,
    };

    match (computed.hash, stored.hash) {
        (Some(c), Some(s)) => c == s,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salted_hash_is_deterministic() {
        let salt = generate_salt().unwrap();
        let first = salted_hash("correct horse", &salt).unwrap();
        let second = salted_hash("correct horse", &salt).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("$argon2id$"));
    }

    #[test]
    fn test_salts_are_fresh() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
    }

    #[test]
    fn test_invalid_salt() {
        assert!(matches!(
            salted_hash("secret", ""),
            Err(RelayError::Credential {
                kind: CredentialErrorKind::InvalidSalt { .. }
            })
        ));
    }

    #[test]
    fn test_hashes_match() {
        let salt = generate_salt().unwrap();
        let good = salted_hash("secret", &salt).unwrap();
        let bad = salted_hash("other", &salt).unwrap();
        assert!(hashes_match(&good, &good));
        assert!(!hashes_match(&bad, &good));
        assert!(!hashes_match(&good, ""));
        assert!(!hashes_match("not a hash", &good));
    }
}
