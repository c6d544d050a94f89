//! Process-local object store.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::{ProviderErrorKind, RelayError};
use crate::validation::{validate_bucket_name, validate_object_key};

use super::traits::ObjectStore;
use super::types::{ObjectStream, ObjectSummary};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

type Buckets = BTreeMap<String, BTreeMap<String, StoredObject>>;

/// Object store that keeps buckets in memory.
///
/// Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    buckets: Mutex<Buckets>,
}

fn missing_bucket(bucket: &str) -> RelayError {
    RelayError::Provider {
        kind: ProviderErrorKind::BucketUnavailable {
            bucket: bucket.to_string(),
            message: "no such bucket".to_string(),
        },
    }
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        // A poisoned map is still structurally valid
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether `bucket` exists.
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.lock().contains_key(bucket)
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn create_bucket_if_absent(&self, bucket: &str) -> Result<(), RelayError> {
        validate_bucket_name(bucket)?;
        self.lock().entry(bucket.to_string()).or_default();
        Ok(())
    }

    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, RelayError> {
        let buckets = self.lock();
        let objects = buckets.get(bucket).ok_or_else(|| missing_bucket(bucket))?;
        Ok(objects
            .iter()
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: Some(object.last_modified),
            })
            .collect())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, RelayError> {
        let buckets = self.lock();
        let objects = buckets.get(bucket).ok_or_else(|| missing_bucket(bucket))?;
        let object = objects.get(key).ok_or_else(|| RelayError::Provider {
            kind: ProviderErrorKind::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
        })?;
        Ok(ObjectStream::new(key, Box::new(Cursor::new(object.data.clone()))))
    }

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<(), RelayError> {
        validate_object_key(key)?;
        let mut buckets = self.lock();
        let objects = buckets.get_mut(bucket).ok_or_else(|| missing_bucket(bucket))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), RelayError> {
        let mut buckets = self.lock();
        let objects = buckets.get_mut(bucket).ok_or_else(|| missing_bucket(bucket))?;
        objects.remove(key);
        Ok(())
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        format!("memory://{}/{}", bucket, key)
    }
}
