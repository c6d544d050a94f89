//! Provider doubles for operation tests.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{ProviderErrorKind, RelayError};
use crate::providers::{
    Engine, InMemoryObjectStore, ObjectStore, ObjectStream, ObjectSummary, SynthesisJob,
    SynthesisProvider, SynthesisTask, TaskStatus, Voice, VoiceCatalog,
};

use super::types::ExecutionContext;

pub(crate) const BUCKET: &str = "lambdaspeach";

pub(crate) fn context(
    synthesis: Arc<dyn SynthesisProvider>,
    storage: Arc<dyn ObjectStore>,
) -> ExecutionContext {
    ExecutionContext {
        request_id: Uuid::new_v4(),
        synthesis,
        storage,
        bucket: BUCKET.to_string(),
        engine: Engine::Neural,
    }
}

fn voice(id: &str, engines: Vec<Engine>) -> Voice {
    Voice {
        gender: "Male".to_string(),
        id: id.to_string(),
        language_code: "en-GB".to_string(),
        language_name: "British English".to_string(),
        name: id.to_string(),
        additional_language_codes: Vec::new(),
        supported_engines: engines,
    }
}

/// Synthesis provider that records jobs and never renders anything.
pub(crate) struct FakeSynthesis {
    tasks: Mutex<HashMap<String, SynthesisTask>>,
    jobs: Mutex<Vec<SynthesisJob>>,
    next_id: AtomicUsize,
    status_queries: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeSynthesis {
    pub(crate) fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            jobs: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            status_queries: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn seed_task(&self, status: TaskStatus) -> String {
        let task_id = format!("seeded-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.tasks.lock().unwrap().insert(
            task_id.clone(),
            SynthesisTask {
                task_id: task_id.clone(),
                output_uri: format!("memory://{}/{}.ogg", BUCKET, task_id),
                status,
                status_reason: None,
                output_format: crate::providers::OutputFormat::OggVorbis,
                voice_id: "Brian".to_string(),
                creation_time: Utc::now(),
            },
        );
        task_id
    }

    pub(crate) fn set_status(&self, task_id: &str, status: TaskStatus) {
        if let Some(task) = self.tasks.lock().unwrap().get_mut(task_id) {
            task.status = status;
        }
    }

    pub(crate) fn jobs(&self) -> Vec<SynthesisJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub(crate) fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SynthesisProvider for FakeSynthesis {
    fn start_synthesis_task(&self, job: &SynthesisJob) -> Result<SynthesisTask, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let task_id = format!("task-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let task = SynthesisTask {
            task_id: task_id.clone(),
            output_uri: format!(
                "memory://{}/{}.{}",
                job.output_bucket,
                task_id,
                job.output_format.extension()
            ),
            status: TaskStatus::Scheduled,
            status_reason: None,
            output_format: job.output_format,
            voice_id: job.voice_id.clone(),
            creation_time: Utc::now(),
        };
        self.jobs.lock().unwrap().push(job.clone());
        self.tasks.lock().unwrap().insert(task_id, task.clone());
        Ok(task)
    }

    fn get_synthesis_task(&self, task_id: &str) -> Result<SynthesisTask, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        self.tasks
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .ok_or_else(|| RelayError::Provider {
                kind: ProviderErrorKind::UnknownTask {
                    task_id: task_id.to_string(),
                },
            })
    }

    fn describe_voices(&self, _engine: Engine) -> Result<VoiceCatalog, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Unfiltered on purpose; callers narrow it to their tier
        Ok(VoiceCatalog {
            voices: vec![
                voice("Brian", vec![Engine::Standard, Engine::Neural]),
                voice("Celine", vec![Engine::Standard]),
            ],
        })
    }
}

struct TrackedReader {
    data: Cursor<Vec<u8>>,
    fail: bool,
    released: Arc<AtomicBool>,
}

impl Read for TrackedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::Other, "connection reset"));
        }
        self.data.read(buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Store holding one object whose stream reports when it is dropped.
pub(crate) struct TrackedStore {
    fail_read: bool,
    listed_size: u64,
    released: Arc<AtomicBool>,
}

impl TrackedStore {
    pub(crate) const KEY: &'static str = "tracked.ogg";

    pub(crate) fn new(fail_read: bool) -> Self {
        Self {
            fail_read,
            listed_size: 5,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Report `size` in listings regardless of the stored body.
    pub(crate) fn with_listed_size(mut self, size: u64) -> Self {
        self.listed_size = size;
        self
    }

    pub(crate) fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl ObjectStore for TrackedStore {
    fn create_bucket_if_absent(&self, _bucket: &str) -> Result<(), RelayError> {
        Ok(())
    }

    fn list_objects(&self, _bucket: &str) -> Result<Vec<ObjectSummary>, RelayError> {
        Ok(vec![ObjectSummary {
            key: Self::KEY.to_string(),
            size: self.listed_size,
            last_modified: None,
        }])
    }

    fn get_object(&self, _bucket: &str, key: &str) -> Result<ObjectStream, RelayError> {
        Ok(ObjectStream::new(
            key,
            Box::new(TrackedReader {
                data: Cursor::new(b"audio".to_vec()),
                fail: self.fail_read,
                released: Arc::clone(&self.released),
            }),
        ))
    }

    fn put_object(&self, _bucket: &str, _key: &str, _data: &[u8]) -> Result<(), RelayError> {
        Ok(())
    }

    fn delete_object(&self, _bucket: &str, _key: &str) -> Result<(), RelayError> {
        Ok(())
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        format!("tracked://{}/{}", bucket, key)
    }
}

/// In-memory store that refuses to delete one key.
pub(crate) struct FlakyDeleteStore {
    inner: InMemoryObjectStore,
    stuck_key: String,
}

impl FlakyDeleteStore {
    pub(crate) fn new(stuck_key: &str) -> Self {
        Self {
            inner: InMemoryObjectStore::new(),
            stuck_key: stuck_key.to_string(),
        }
    }
}

impl ObjectStore for FlakyDeleteStore {
    fn create_bucket_if_absent(&self, bucket: &str) -> Result<(), RelayError> {
        self.inner.create_bucket_if_absent(bucket)
    }

    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, RelayError> {
        self.inner.list_objects(bucket)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, RelayError> {
        self.inner.get_object(bucket, key)
    }

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<(), RelayError> {
        self.inner.put_object(bucket, key, data)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), RelayError> {
        if key == self.stuck_key {
            return Err(RelayError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "object locked",
            )));
        }
        self.inner.delete_object(bucket, key)
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        self.inner.object_uri(bucket, key)
    }
}
