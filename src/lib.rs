//! Speech Relay Library
//!
//! Routes speech synthesis and audio storage requests. An inbound envelope
//! is validated, dispatched to one of six operations and answered with a
//! normalized response envelope. Synthesis and storage are reached through
//! the traits in [`providers`].

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod executor;
pub mod operations;
pub mod protocol;
pub mod providers;
pub mod router;
pub mod socket;
pub mod validation;
