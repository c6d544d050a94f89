//! Per-connection handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditLogger};
use crate::config::Settings;
use crate::error::{ProtocolErrorKind, RelayError};
use crate::protocol::{read_message_with_timeout, write_message_with_timeout, ResponseEnvelope};
use crate::router::{Invocation, Router};

/// Shared state handed to every connection task.
#[derive(Clone)]
pub struct ConnectionContext {
    pub settings: Arc<Settings>,
    pub router: Arc<Router>,
    pub audit_logger: Option<Arc<AuditLogger>>,
}

/// Handle a single client connection.
///
/// Each frame carries one envelope and gets one framed response. The
/// connection stays open until the client closes it or goes idle.
pub async fn handle_connection(stream: UnixStream, ctx: ConnectionContext) -> Result<(), RelayError> {
    let (mut reader, mut writer) = stream.into_split();

    loop {
        match process_request(&mut reader, &mut writer, &ctx).await {
            Ok(()) => continue,
            Err(RelayError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed,
            }) => {
                debug!("Client disconnected");
                return Ok(());
            }
            Err(RelayError::Protocol {
                kind: ProtocolErrorKind::ConnectionTimeout,
            }) => {
                warn!("Connection timed out");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Read one envelope, route it, and write the response.
async fn process_request<R, W>(
    reader: &mut R,
    writer: &mut W,
    ctx: &ConnectionContext,
) -> Result<(), RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let socket_timeout = Duration::from_secs(ctx.settings.limits.socket_timeout_seconds);
    let msg = read_message_with_timeout(reader, ctx.settings.limits.max_message_size, socket_timeout).await?;

    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    let invocation = match serde_json::from_slice::<Value>(&msg) {
        Ok(event) => {
            let router = Arc::clone(&ctx.router);
            // Providers block, so routing runs on the blocking pool
            match tokio::task::spawn_blocking(move || router.invoke(request_id, &event)).await {
                Ok(invocation) => invocation,
                Err(e) => {
                    error!(request_id = %request_id, error = %e, "Router task panicked");
                    Invocation {
                        request_id,
                        operation: None,
                        params: None,
                        response: ResponseEnvelope::error("Internal error"),
                    }
                }
            }
        }
        Err(e) => {
            let err = RelayError::Protocol {
                kind: ProtocolErrorKind::InvalidMessageFormat {
                    message: e.to_string(),
                },
            };
            warn!(request_id = %request_id, error = %err, "Rejected frame");
            Invocation {
                request_id,
                operation: None,
                params: None,
                response: ResponseEnvelope::from_error(&err),
            }
        }
    };

    let duration_ms = start_time.elapsed().as_millis() as u64;
    info!(
        request_id = %request_id,
        operation = invocation.operation.unwrap_or("none"),
        status_code = invocation.response.status_code,
        duration_ms,
        "Request completed"
    );

    if let Some(logger) = &ctx.audit_logger {
        let entry = AuditEntry::from_invocation(Utc::now().to_rfc3339(), &invocation, duration_ms);
        if let Err(e) = logger.log(&entry) {
            error!(error = %e, "Failed to write audit log entry");
        }
    }

    let response_bytes = serde_json::to_vec(&invocation.response)?;
    write_message_with_timeout(writer, &response_bytes, socket_timeout).await?;

    Ok(())
}
