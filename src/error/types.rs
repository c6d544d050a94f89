//! Error types for the speech relay.

use thiserror::Error;

/// Main error type for the relay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Socket-related errors.
    #[error("Socket error: {message}")]
    Socket { message: String },

    /// The inbound envelope failed validation.
    #[error("{kind}")]
    Envelope { kind: EnvelopeErrorKind },

    /// Credential verification or provisioning errors.
    #[error("Credential error: {kind}")]
    Credential { kind: CredentialErrorKind },

    /// Operation selection or execution errors.
    #[error("{kind}")]
    Operation { kind: OperationErrorKind },

    /// Errors reported by a synthesis or storage provider.
    #[error("Provider error: {kind}")]
    Provider { kind: ProviderErrorKind },

    /// Transport protocol errors.
    #[error("Protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Envelope validation failures, in the order they are checked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeErrorKind {
    #[error("Invalid event received - no headers")]
    MissingHeaders,

    #[error("Invalid event received - no requestContext")]
    MissingRequestContext,

    #[error("Invalid event received - no content-type")]
    MissingContentType,

    #[error("Invalid event received - not json content")]
    NotJsonContent,

    #[error("Invalid event received - not http origin")]
    NotHttpOrigin,

    #[error("Invalid event received - no method in http")]
    MissingMethod,

    #[error("Invalid event received - not POST")]
    NotPost,

    #[error("Unable to decode post_data: {message}")]
    UndecodableBody { message: String },
}

/// Credential error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialErrorKind {
    #[error("Unauthorized request")]
    Unauthorized,

    #[error("Invalid salt: {message}")]
    InvalidSalt { message: String },

    #[error("Hashing failed: {message}")]
    HashingFailed { message: String },

    #[error("Secure random generator unavailable")]
    RandomUnavailable,

    #[error("Credential table unreadable: {message}")]
    TableUnreadable { message: String },
}

/// Operation error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationErrorKind {
    #[error("Invalid post_data received")]
    InvalidPostData,

    #[error("Missing required parameter: {param}")]
    MissingParameter { param: String },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("No Audio Generated")]
    NoAudioGenerated,

    #[error("Error reading audio stream: {message}")]
    StreamRead { message: String },

    #[error("Delete incomplete: {failed} of {total} objects could not be removed")]
    PartialDelete { failed: usize, total: usize },
}

/// Provider error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorKind {
    #[error("Synthesis task not found: {task_id}")]
    UnknownTask { task_id: String },

    #[error("Bucket '{bucket}' unavailable: {message}")]
    BucketUnavailable { bucket: String, message: String },

    #[error("Object '{key}' not found in bucket '{bucket}'")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Invalid object key: {key}")]
    InvalidKey { key: String },

    #[error("Synthesis engine failed: {message}")]
    EngineFailed { message: String },

    #[error("Synthesis engine timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
}

/// Protocol error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    #[error("Message too large: {size} bytes exceeds maximum of {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timed out")]
    ConnectionTimeout,

    #[error("Invalid message format: {message}")]
    InvalidMessageFormat { message: String },
}

impl RelayError {
    /// Text placed in the `errorMessage` field of a response envelope.
    ///
    /// Envelope and operation failures carry their exact contract messages;
    /// credential failures always collapse to one message so callers cannot
    /// tell an unknown identity from a wrong secret.
    pub fn client_message(&self) -> String {
        match self {
            RelayError::Envelope { kind } => kind.to_string(),
            RelayError::Operation { kind } => kind.to_string(),
            RelayError::Credential { .. } => CredentialErrorKind::Unauthorized.to_string(),
            other => other.to_string(),
        }
    }

    pub(crate) fn missing_param(param: &str) -> Self {
        RelayError::Operation {
            kind: OperationErrorKind::MissingParameter {
                param: param.to_string(),
            },
        }
    }

    pub(crate) fn engine_failed(message: impl Into<String>) -> Self {
        RelayError::Provider {
            kind: ProviderErrorKind::EngineFailed {
                message: message.into(),
            },
        }
    }
}

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
