//! Response envelope returned for every invocation.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RelayError;

/// Status code for handled requests, including failed synthesis jobs.
pub const STATUS_OK: u16 = 200;

/// Status code for malformed input and operational errors.
pub const STATUS_ERROR: u16 = 500;

/// Headers value sent with JSON bodies.
pub const JSON_HEADERS: &str = "text/json";

/// A response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,

    /// Content description; either a bare media type or a JSON header object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<String>,

    #[serde(default)]
    pub is_base64_encoded: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Error details on a 500 response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ResponseEnvelope {
    /// A 200 response with a plain text body.
    pub fn ok_text(body: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_OK,
            headers: None,
            is_base64_encoded: false,
            body: Some(body.into()),
            error_message: None,
        }
    }

    /// A 200 response carrying serialized JSON.
    pub fn ok_json<T: Serialize>(value: &T) -> Result<Self, RelayError> {
        Ok(Self {
            status_code: STATUS_OK,
            headers: Some(JSON_HEADERS.to_string()),
            is_base64_encoded: false,
            body: Some(serde_json::to_string(value)?),
            error_message: None,
        })
    }

    /// A 200 response carrying binary data as base64.
    pub fn ok_binary(data: &[u8], content_type: &str) -> Self {
        Self {
            status_code: STATUS_OK,
            headers: Some(format!("{{ \"Content-Type\": \"{}\" }}", content_type)),
            is_base64_encoded: true,
            body: Some(STANDARD.encode(data)),
            error_message: None,
        }
    }

    /// A 500 response with a message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_ERROR,
            headers: None,
            is_base64_encoded: false,
            body: None,
            error_message: Some(message.into()),
        }
    }

    /// Convert an error into its 500 response.
    pub fn from_error(err: &RelayError) -> Self {
        debug!(error = %err, "Converting error to response envelope");
        Self::error(err.client_message())
    }

    /// Whether this response reports a handled request.
    pub fn is_ok(&self) -> bool {
        self.status_code == STATUS_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationErrorKind;

    #[test]
    fn test_text_response() {
        let response = ResponseEnvelope::ok_text("OK");
        assert!(response.is_ok());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"], "OK");
        assert_eq!(json["isBase64Encoded"], false);
        assert!(json.get("errorMessage").is_none());
    }

    #[test]
    fn test_binary_response() {
        let response = ResponseEnvelope::ok_binary(b"abc", "audio/ogg");
        assert!(response.is_base64_encoded);
        assert_eq!(response.body.as_deref(), Some("YWJj"));
        assert_eq!(
            response.headers.as_deref(),
            Some("{ \"Content-Type\": \"audio/ogg\" }")
        );
    }

    #[test]
    fn test_error_response() {
        let err = RelayError::Operation {
            kind: OperationErrorKind::NoAudioGenerated,
        };
        let response = ResponseEnvelope::from_error(&err);
        assert_eq!(response.status_code, 500);
        assert_eq!(response.error_message.as_deref(), Some("No Audio Generated"));

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"errorMessage\":\"No Audio Generated\""));
        assert!(!json.contains("\"body\""));
    }
}
