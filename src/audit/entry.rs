//! Audit entry types.

use serde::Serialize;
use uuid::Uuid;

use crate::router::Invocation;

use super::sanitize::sanitize_params;

/// Operation name recorded when an invocation failed before dispatch.
pub const UNDISPATCHED: &str = "none";

/// One audit log line.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// RFC 3339 timestamp when the invocation finished.
    pub timestamp: String,
    pub request_id: Uuid,
    /// Operation that ran, or `"none"` if the request never reached dispatch.
    pub operation: String,
    /// Sanitized request body; null when the body could not be decoded.
    pub params: serde_json::Value,
    pub result: AuditResult,
    pub duration_ms: u64,
}

impl AuditEntry {
    /// Build an entry from a finished invocation.
    pub fn from_invocation(timestamp: String, invocation: &Invocation, duration_ms: u64) -> Self {
        let response = &invocation.response;
        let result = if response.is_ok() {
            AuditResult::Success {
                status_code: response.status_code,
            }
        } else {
            AuditResult::Failure {
                status_code: response.status_code,
                error_message: response.error_message.clone().unwrap_or_default(),
            }
        };

        Self {
            timestamp,
            request_id: invocation.request_id,
            operation: invocation.operation.unwrap_or(UNDISPATCHED).to_string(),
            params: invocation
                .params
                .as_ref()
                .map(sanitize_params)
                .unwrap_or(serde_json::Value::Null),
            result,
            duration_ms,
        }
    }
}

/// Outcome of an invocation for audit purposes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum AuditResult {
    #[serde(rename = "success")]
    Success { status_code: u16 },
    #[serde(rename = "failure")]
    Failure {
        status_code: u16,
        error_message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResponseEnvelope;
    use serde_json::json;

    #[test]
    fn test_success_entry() {
        let invocation = Invocation {
            request_id: Uuid::nil(),
            operation: Some("task_status"),
            params: Some(json!({"taskStatus": "", "task_id": "abc"})),
            response: ResponseEnvelope::ok_text("RUNNING"),
        };
        let entry = AuditEntry::from_invocation("2026-01-15T10:30:45Z".to_string(), &invocation, 7);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["operation"], "task_status");
        assert_eq!(json["params"]["task_id"], "abc");
        assert_eq!(json["result"]["status"], "success");
        assert_eq!(json["result"]["status_code"], 200);
        assert_eq!(json["duration_ms"], 7);
    }

    #[test]
    fn test_failure_before_dispatch() {
        let invocation = Invocation {
            request_id: Uuid::nil(),
            operation: None,
            params: None,
            response: ResponseEnvelope::error("Invalid event received - no headers"),
        };
        let entry = AuditEntry::from_invocation("2026-01-15T10:30:45Z".to_string(), &invocation, 0);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["operation"], UNDISPATCHED);
        assert!(json["params"].is_null());
        assert_eq!(json["result"]["status"], "failure");
        assert_eq!(json["result"]["status_code"], 500);
        assert_eq!(
            json["result"]["error_message"],
            "Invalid event received - no headers"
        );
    }
}
