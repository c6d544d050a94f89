//! Error types for the speech relay.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
