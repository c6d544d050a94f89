//! Invocation protocol module.
//!
//! Defines the inbound envelope, the response envelope, and message framing
//! for socket communication.
//!
//! ## Wire Format
//!
//! Each frame carries one JSON envelope:
//! ```text
//! [4 bytes: length (big-endian u32)][JSON payload]
//! ```

mod envelope;
mod response;
mod wire;

pub use envelope::Envelope;
pub use response::{ResponseEnvelope, JSON_HEADERS, STATUS_ERROR, STATUS_OK};
pub use wire::{
    read_message, read_message_with_timeout, write_message, write_message_with_timeout,
    DEFAULT_MAX_MESSAGE_SIZE,
};
