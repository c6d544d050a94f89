//! Bucket and object key validation.
//!
//! Buckets and keys map onto single path components in the filesystem
//! store, so both must be plain names that cannot escape their parent.

use crate::error::{ProviderErrorKind, RelayError};

/// Maximum length of a bucket name or object key.
const MAX_NAME_LENGTH: usize = 255;

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LENGTH
        && !name.starts_with('.')
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control())
}

/// Validate an object key.
pub fn validate_object_key(key: &str) -> Result<(), RelayError> {
    if is_plain_name(key) {
        Ok(())
    } else {
        Err(RelayError::Provider {
            kind: ProviderErrorKind::InvalidKey {
                key: key.to_string(),
            },
        })
    }
}

/// Validate a bucket name.
pub fn validate_bucket_name(bucket: &str) -> Result<(), RelayError> {
    if is_plain_name(bucket) {
        Ok(())
    } else {
        Err(RelayError::Provider {
            kind: ProviderErrorKind::BucketUnavailable {
                bucket: bucket.to_string(),
                message: "invalid bucket name".to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert!(validate_object_key("3f2a-task.ogg").is_ok());
        assert!(validate_object_key("speech output.mp3").is_ok());
    }

    #[test]
    fn test_rejects_traversal() {
        assert!(validate_object_key("../etc/passwd").is_err());
        assert!(validate_object_key("a/b.ogg").is_err());
        assert!(validate_object_key("a\\b.ogg").is_err());
        assert!(validate_object_key("..").is_err());
    }

    #[test]
    fn test_rejects_hidden_and_empty() {
        assert!(validate_object_key("").is_err());
        assert!(validate_object_key(".partial").is_err());
        assert!(validate_bucket_name("").is_err());
    }

    #[test]
    fn test_rejects_control_characters() {
        assert!(validate_object_key("bad\nkey").is_err());
        assert!(validate_object_key("bad\0key").is_err());
    }

    #[test]
    fn test_rejects_long_names() {
        let long = "a".repeat(MAX_NAME_LENGTH + 1);
        assert!(validate_object_key(&long).is_err());
    }
}
