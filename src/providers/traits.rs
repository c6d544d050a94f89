//! Provider traits.
//!
//! Defines the narrow interfaces through which the router reaches the
//! synthesis engine and object storage. Implementations are injected into
//! the router so tests can substitute doubles.

use crate::error::RelayError;

use super::types::{Engine, ObjectStream, ObjectSummary, SynthesisJob, SynthesisTask, VoiceCatalog};

/// An asynchronous text-to-speech provider.
///
/// Calls block until the provider answers; the synthesis work itself runs
/// inside the provider and is observed by polling
/// [`get_synthesis_task`](SynthesisProvider::get_synthesis_task).
pub trait SynthesisProvider: Send + Sync {
    /// Submit a job and return the task as first recorded.
    fn start_synthesis_task(&self, job: &SynthesisJob) -> Result<SynthesisTask, RelayError>;

    /// Current view of a previously submitted task.
    fn get_synthesis_task(&self, task_id: &str) -> Result<SynthesisTask, RelayError>;

    /// Voices available for an engine tier.
    fn describe_voices(&self, engine: Engine) -> Result<VoiceCatalog, RelayError>;
}

/// A bucketed object store.
pub trait ObjectStore: Send + Sync {
    /// Create `bucket` unless it already exists.
    fn create_bucket_if_absent(&self, bucket: &str) -> Result<(), RelayError>;

    /// List the objects in `bucket`, ordered by key.
    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, RelayError>;

    /// Open an object for reading.
    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, RelayError>;

    /// Store an object, replacing any existing one with the same key.
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<(), RelayError>;

    /// Remove an object. Removing a missing object is not an error.
    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), RelayError>;

    /// Locator handed back to callers for an object.
    ///
    /// The returned string always contains `key` verbatim.
    fn object_uri(&self, bucket: &str, key: &str) -> String;
}
