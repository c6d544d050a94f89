//! Request router.
//!
//! Turns one inbound envelope into exactly one response envelope: validate
//! the envelope, optionally check caller credentials, decode the body,
//! select an operation and run it against the providers. Every error is
//! converted to a 500 response here; nothing escapes [`Router::handle`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{verify, CredentialTable};
use crate::config::{Settings, StorageBackend};
use crate::error::{CredentialErrorKind, RelayError, RelayResult};
use crate::operations::{select, ExecutionContext, OperationParams};
use crate::protocol::{Envelope, ResponseEnvelope};
use crate::providers::{
    CliSynthesisProvider, Engine, FsObjectStore, InMemoryObjectStore, ObjectStore,
    SynthesisProvider,
};

/// Header carrying the caller identity.
pub const IDENTITY_HEADER: &str = "authorization_email";

/// Header carrying the caller secret.
pub const SECRET_HEADER: &str = "authorization_password";

/// Outcome of one invocation, with what the audit log needs to know.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: Uuid,
    /// Selected operation, if dispatch got that far.
    pub operation: Option<&'static str>,
    /// Decoded body, if decoding succeeded.
    pub params: Option<Value>,
    pub response: ResponseEnvelope,
}

/// Stateless dispatcher holding the injected providers.
#[derive(Clone)]
pub struct Router {
    synthesis: Arc<dyn SynthesisProvider>,
    storage: Arc<dyn ObjectStore>,
    bucket: String,
    engine: Engine,
    /// When set, every request must carry valid credentials.
    credentials: Option<Arc<CredentialTable>>,
}

impl Router {
    pub fn new(
        synthesis: Arc<dyn SynthesisProvider>,
        storage: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        engine: Engine,
    ) -> Self {
        Self {
            synthesis,
            storage,
            bucket: bucket.into(),
            engine,
            credentials: None,
        }
    }

    /// Require callers to present credentials found in `table`.
    pub fn with_credentials(mut self, table: Arc<CredentialTable>) -> Self {
        self.credentials = Some(table);
        self
    }

    /// Build a router and its providers from configuration.
    pub fn from_settings(settings: &Settings) -> RelayResult<Self> {
        let storage: Arc<dyn ObjectStore> = match settings.storage.backend {
            StorageBackend::Filesystem => Arc::new(FsObjectStore::new(&settings.storage.root)),
            StorageBackend::Memory => Arc::new(InMemoryObjectStore::new()),
        };
        let synthesis: Arc<dyn SynthesisProvider> = Arc::new(CliSynthesisProvider::new(
            settings.synthesis.clone(),
            Arc::clone(&storage),
        ));

        let mut router = Self::new(
            synthesis,
            storage,
            settings.storage.bucket.clone(),
            settings.synthesis.engine,
        );

        if settings.credentials.required {
            let table = match &settings.credentials.table_path {
                Some(path) => CredentialTable::load(path)?,
                None => {
                    return Err(RelayError::Config {
                        message: "credentials.required is set but credentials.table_path is not"
                            .to_string(),
                    })
                }
            };
            router = router.with_credentials(Arc::new(table));
        }

        info!(
            bucket = %router.bucket,
            engine = %router.engine,
            backend = ?settings.storage.backend,
            credentials_required = router.credentials.is_some(),
            "Router configured"
        );
        Ok(router)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// Handle one envelope.
    pub fn handle(&self, event: &Value) -> ResponseEnvelope {
        self.invoke(Uuid::new_v4(), event).response
    }

    /// Handle one envelope and report what happened along the way.
    pub fn invoke(&self, request_id: Uuid, event: &Value) -> Invocation {
        let mut invocation = Invocation {
            request_id,
            operation: None,
            params: None,
            response: ResponseEnvelope::error(""),
        };

        invocation.response = match self.route(&mut invocation, event) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    operation = invocation.operation.unwrap_or("none"),
                    error = %e,
                    "Invocation failed"
                );
                ResponseEnvelope::from_error(&e)
            }
        };

        debug!(
            request_id = %request_id,
            status_code = invocation.response.status_code,
            "Invocation handled"
        );
        invocation
    }

    fn route(&self, invocation: &mut Invocation, event: &Value) -> RelayResult<ResponseEnvelope> {
        let envelope = Envelope::parse(event)?;
        self.check_credentials(&envelope)?;

        let body = envelope.decode_body()?;
        invocation.params = Some(body.clone());

        let params = OperationParams::new(body);
        let operation = select(&params)?;
        invocation.operation = Some(operation.name());

        debug!(
            request_id = %invocation.request_id,
            operation = operation.name(),
            "Dispatching operation"
        );

        let ctx = ExecutionContext {
            request_id: invocation.request_id,
            synthesis: Arc::clone(&self.synthesis),
            storage: Arc::clone(&self.storage),
            bucket: self.bucket.clone(),
            engine: self.engine,
        };
        operation.execute(&ctx)
    }

    fn check_credentials(&self, envelope: &Envelope) -> RelayResult<()> {
        let Some(table) = &self.credentials else {
            return Ok(());
        };

        let identity = envelope.header(IDENTITY_HEADER);
        let secret = envelope.header(SECRET_HEADER);
        match (identity, secret) {
            (Some(identity), Some(secret)) if verify(identity, secret, table) => Ok(()),
            _ => Err(RelayError::Credential {
                kind: CredentialErrorKind::Unauthorized,
            }),
        }
    }
}
