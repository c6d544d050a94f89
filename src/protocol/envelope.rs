//! Inbound invocation envelope.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{Map, Value};

use crate::error::{EnvelopeErrorKind, RelayError};

/// A validated inbound envelope.
///
/// Construction through [`Envelope::parse`] guarantees that the header and
/// request-context checks passed; the body is still raw and is decoded
/// separately so body failures stay distinguishable from envelope failures.
#[derive(Debug, Clone)]
pub struct Envelope {
    headers: Map<String, Value>,
    method: String,
    body: Option<Value>,
    is_base64_encoded: bool,
}

fn invalid(kind: EnvelopeErrorKind) -> RelayError {
    RelayError::Envelope { kind }
}

impl Envelope {
    /// Validate an event, checking fields in a fixed order.
    ///
    /// The first failing check determines the error.
    pub fn parse(event: &Value) -> Result<Self, RelayError> {
        let headers = event
            .get("headers")
            .ok_or_else(|| invalid(EnvelopeErrorKind::MissingHeaders))?;
        let request_context = event
            .get("requestContext")
            .ok_or_else(|| invalid(EnvelopeErrorKind::MissingRequestContext))?;

        let content_type = headers
            .get("content-type")
            .ok_or_else(|| invalid(EnvelopeErrorKind::MissingContentType))?;
        if !content_type.as_str().is_some_and(|ct| ct.contains("json")) {
            return Err(invalid(EnvelopeErrorKind::NotJsonContent));
        }

        let http = request_context
            .get("http")
            .ok_or_else(|| invalid(EnvelopeErrorKind::NotHttpOrigin))?;
        let method = http
            .get("method")
            .ok_or_else(|| invalid(EnvelopeErrorKind::MissingMethod))?;
        let method = match method.as_str() {
            Some("POST") => "POST".to_string(),
            _ => return Err(invalid(EnvelopeErrorKind::NotPost)),
        };

        Ok(Self {
            headers: headers.as_object().cloned().unwrap_or_default(),
            method,
            body: event.get("body").cloned(),
            is_base64_encoded: event
                .get("isBase64Encoded")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }

    /// Look up a header value by its exact key.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(Value::as_str)
    }

    /// The validated HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Decode the body into the operation parameter mapping.
    ///
    /// String bodies are parsed as JSON (after base64 decoding when the
    /// envelope says so). A body that is already a JSON value is used as is.
    pub fn decode_body(&self) -> Result<Value, RelayError> {
        let undecodable = |message: String| invalid(EnvelopeErrorKind::UndecodableBody { message });

        match &self.body {
            None | Some(Value::Null) => Err(undecodable("no body".to_string())),
            Some(Value::String(text)) if self.is_base64_encoded => {
                let bytes = STANDARD
                    .decode(text.as_bytes())
                    .map_err(|e| undecodable(format!("invalid base64: {}", e)))?;
                serde_json::from_slice(&bytes).map_err(|e| undecodable(e.to_string()))
            }
            Some(Value::String(text)) => {
                serde_json::from_str(text).map_err(|e| undecodable(e.to_string()))
            }
            Some(other) => Ok(other.clone()),
        }
    }
}
