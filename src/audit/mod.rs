//! Audit logging module.
//!
//! Every invocation handled by the socket transport produces one JSON line
//! recording the operation, sanitized parameters, status and duration.

mod entry;
mod logger;
mod sanitize;

pub use entry::{AuditEntry, AuditResult, UNDISPATCHED};
pub use logger::AuditLogger;
pub use sanitize::sanitize_params;
