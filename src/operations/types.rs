//! Operation parameters and execution context.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::error::{OperationErrorKind, RelayError, RelayResult};
use crate::providers::{Engine, ObjectStore, SynthesisProvider};

/// Wrapper around a decoded request body with typed accessors.
#[derive(Debug, Clone)]
pub struct OperationParams {
    inner: Value,
}

impl OperationParams {
    pub fn new(value: Value) -> Self {
        Self { inner: value }
    }

    pub fn as_value(&self) -> &Value {
        &self.inner
    }

    /// Whether the body is a JSON object.
    pub fn is_object(&self) -> bool {
        self.inner.is_object()
    }

    /// Check if a parameter is present, whatever its value.
    pub fn has(&self, key: &str) -> bool {
        self.inner.get(key).is_some()
    }

    /// Get a required string parameter.
    ///
    /// A missing key and a present non-string value are distinct errors.
    pub fn get_string(&self, key: &str) -> RelayResult<String> {
        match self.inner.get(key) {
            None => Err(RelayError::missing_param(key)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(not_a_string(key)),
        }
    }

    /// Get an optional string parameter. Non-string values read as absent.
    pub fn get_optional_string(&self, key: &str) -> Option<String> {
        self.inner.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
    }

    /// Get an optional string parameter that must be a string when present.
    ///
    /// Only an absent key reads as `None`; an explicit `null` is rejected.
    pub fn get_strict_optional_string(&self, key: &str) -> RelayResult<Option<String>> {
        match self.inner.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(not_a_string(key)),
        }
    }
}

fn not_a_string(key: &str) -> RelayError {
    RelayError::Operation {
        kind: OperationErrorKind::InvalidParameter {
            param: key.to_string(),
            message: "expected a string".to_string(),
        },
    }
}

impl From<Value> for OperationParams {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Everything an operation needs to run one invocation.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Unique identifier for this invocation.
    pub request_id: Uuid,
    pub synthesis: Arc<dyn SynthesisProvider>,
    pub storage: Arc<dyn ObjectStore>,
    /// Bucket holding synthesized audio.
    pub bucket: String,
    /// Engine tier for new jobs and voice listings.
    pub engine: Engine,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("request_id", &self.request_id)
            .field("bucket", &self.bucket)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
