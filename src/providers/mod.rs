//! Synthesis and storage providers.
//!
//! The router reaches external collaborators only through the
//! [`SynthesisProvider`] and [`ObjectStore`] traits. This module also ships
//! local implementations of both.

mod cli_engine;
mod filesystem;
mod memory;
mod traits;
mod types;

pub use cli_engine::{parse_voice_listing, CliSynthesisProvider};
pub use filesystem::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use traits::{ObjectStore, SynthesisProvider};
pub use types::{
    Engine, ObjectStream, ObjectSummary, OutputFormat, SynthesisJob, SynthesisTask, TaskStatus,
    TextType, Voice, VoiceCatalog,
};
