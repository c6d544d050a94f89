//! Unix socket listener.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use crate::audit::AuditLogger;
use crate::config::Settings;
use crate::error::{ProtocolErrorKind, RelayError};
use crate::router::Router;

use super::{handle_connection, ConnectionContext};

/// Connection counters shared with every connection task.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    /// Connections handled to completion.
    pub connections_total: AtomicU64,
    /// Connections that ended with a transport error.
    pub connections_failed: AtomicU64,
    pub active_connections: AtomicUsize,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection(&self, success: bool) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.connections_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total_connections(&self) -> u64 {
        self.connections_total.load(Ordering::Relaxed)
    }

    pub fn failed_connections(&self) -> u64 {
        self.connections_failed.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }
}

fn socket_error(action: &str, path: &Path, e: impl std::fmt::Display) -> RelayError {
    RelayError::Socket {
        message: format!("{} {}: {}", action, path.display(), e),
    }
}

/// Remove a socket left behind by a previous run. Symlinks are refused.
fn clear_stale_socket(path: &Path) -> Result<(), RelayError> {
    let Ok(metadata) = std::fs::symlink_metadata(path) else {
        return Ok(());
    };
    if metadata.file_type().is_symlink() {
        return Err(socket_error("Refusing to replace symlink at", path, "not a socket"));
    }
    debug!(path = %path.display(), "Removing stale socket");
    std::fs::remove_file(path).map_err(|e| socket_error("Failed to remove stale socket", path, e))
}

fn apply_permissions(path: &Path, octal: &str) -> Result<(), RelayError> {
    let mode = u32::from_str_radix(octal, 8).map_err(|e| RelayError::Socket {
        message: format!("Invalid socket permissions '{}': {}", octal, e),
    })?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| socket_error("Failed to set permissions on", path, e))
}

/// Open the audit log if enabled. A log that cannot be opened disables auditing.
fn open_audit_logger(settings: &Settings) -> Option<Arc<AuditLogger>> {
    if !settings.audit.enabled {
        info!("Audit logging disabled");
        return None;
    }
    let path = &settings.audit.log_path;
    match AuditLogger::new(path) {
        Ok(logger) => {
            info!(path = %path.display(), "Audit logging enabled");
            Some(Arc::new(logger))
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Audit log unavailable, continuing without it");
            None
        }
    }
}

/// Unix socket server.
pub struct SocketListener {
    listener: UnixListener,
    ctx: ConnectionContext,
    metrics: Arc<ConnectionMetrics>,
    /// One permit per live connection.
    permits: Arc<Semaphore>,
}

impl SocketListener {
    /// Bind the configured socket and prepare to serve `router`.
    pub async fn bind(settings: Arc<Settings>, router: Arc<Router>) -> Result<Self, RelayError> {
        let path = settings.socket.path.as_path();

        clear_stale_socket(path)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| socket_error("Failed to create socket directory", parent, e))?;
        }

        let listener =
            UnixListener::bind(path).map_err(|e| socket_error("Failed to bind to socket", path, e))?;
        apply_permissions(path, &settings.socket.permissions)?;

        let max_connections = settings.limits.max_concurrent_requests;
        let audit_logger = open_audit_logger(&settings);
        info!(
            path = %path.display(),
            max_connections,
            "Socket listener bound"
        );

        Ok(Self {
            listener,
            permits: Arc::new(Semaphore::new(max_connections)),
            metrics: Arc::new(ConnectionMetrics::new()),
            ctx: ConnectionContext {
                settings,
                router,
                audit_logger,
            },
        })
    }

    pub fn metrics(&self) -> Arc<ConnectionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Accept connections until `shutdown` is notified.
    ///
    /// Connections already accepted keep running; see [`wait_for_drain`](Self::wait_for_drain).
    pub async fn run(&self, shutdown: Arc<Notify>) -> Result<(), RelayError> {
        info!("Accepting connections");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => self.admit(stream),
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                },
                _ = shutdown.notified() => {
                    info!("Listener stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Start a task for `stream`, or drop it when every permit is taken.
    fn admit(&self, stream: UnixStream) {
        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            warn!(
                max = self.ctx.settings.limits.max_concurrent_requests,
                "Connection limit reached, dropping connection"
            );
            return;
        };

        self.metrics.active_connections.fetch_add(1, Ordering::Relaxed);
        debug!(active = self.metrics.active(), "Connection accepted");
        tokio::spawn(serve_connection(
            stream,
            self.ctx.clone(),
            Arc::clone(&self.metrics),
            permit,
        ));
    }

    /// Wait for all active connections to finish.
    pub async fn wait_for_drain(&self) {
        while self.metrics.active() > 0 {
            debug!(active = self.metrics.active(), "Waiting for connections to drain");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        info!("All connections drained");
    }
}

async fn serve_connection(
    stream: UnixStream,
    ctx: ConnectionContext,
    metrics: Arc<ConnectionMetrics>,
    _permit: OwnedSemaphorePermit,
) {
    let success = match handle_connection(stream, ctx).await {
        Ok(()) => true,
        Err(RelayError::Protocol {
            kind: ProtocolErrorKind::ConnectionClosed,
        }) => false,
        Err(e) => {
            error!(error = %e, "Connection handler error");
            false
        }
    };

    metrics.record_connection(success);
    metrics.active_connections.fetch_sub(1, Ordering::Relaxed);
    debug!(active = metrics.active(), success, "Connection closed");
}
