//! Unix socket transport.
//!
//! Accepts framed envelopes over a Unix socket and answers each with a
//! framed response envelope.

mod connection;
mod listener;

pub use connection::{handle_connection, ConnectionContext};
pub use listener::{ConnectionMetrics, SocketListener};
