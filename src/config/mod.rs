//! Configuration module for the speech relay.
//!
//! Handles loading and validating relay configuration from TOML files.

mod settings;

pub use settings::*;
