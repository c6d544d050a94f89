//! Parameter sanitization for audit logging.
//!
//! Decoded request bodies are copied into the audit log, so credentials are
//! redacted and synthesis text is cut down before an entry is written.

use serde_json::{Map, Value};

/// Key fragments whose values are always redacted.
const SENSITIVE_KEYS: &[&str] = &["password", "secret", "token", "credential", "auth"];

/// Longest text kept verbatim in truncatable fields.
const MAX_STRING_LENGTH: usize = 256;

/// Key fragments whose string values are truncated when long.
const TRUNCATABLE_KEYS: &[&str] = &["ssml", "text", "body"];

/// Return a copy of `params` that is safe to write to the audit log.
///
/// Matching on key fragments is case-insensitive and applies at every
/// nesting level.
pub fn sanitize_params(params: &Value) -> Value {
    sanitize_value(params, false)
}

fn sanitize_value(value: &Value, is_truncatable: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = Map::new();
            for (key, val) in map {
                let key_lower = key.to_lowercase();
                let is_sensitive = SENSITIVE_KEYS.iter().any(|&s| key_lower.contains(s));
                let should_truncate = TRUNCATABLE_KEYS.iter().any(|&s| key_lower.contains(s));

                if is_sensitive {
                    sanitized.insert(key.clone(), Value::String("[REDACTED]".to_string()));
                } else {
                    sanitized.insert(key.clone(), sanitize_value(val, should_truncate));
                }
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => Value::Array(
            arr.iter()
                .map(|v| sanitize_value(v, is_truncatable))
                .collect(),
        ),
        Value::String(s) if is_truncatable && s.len() > MAX_STRING_LENGTH => {
            Value::String(format!("[TRUNCATED - {} bytes]", s.len()))
        }
        _ => value.clone(),
    }
}
