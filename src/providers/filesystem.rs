//! Filesystem-backed object store.
//!
//! Each bucket is a directory under the configured root and each object is a
//! regular file inside it. Writes go to a hidden temporary file first and are
//! renamed into place, so readers never observe partial objects.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ProviderErrorKind, RelayError};
use crate::validation::{validate_bucket_name, validate_object_key};

use super::traits::ObjectStore;
use super::types::{ObjectStream, ObjectSummary};

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

fn bucket_error(bucket: &str, err: impl std::fmt::Display) -> RelayError {
    RelayError::Provider {
        kind: ProviderErrorKind::BucketUnavailable {
            bucket: bucket.to_string(),
            message: err.to_string(),
        },
    }
}

impl FsObjectStore {
    /// Create a store rooted at `root`. The directory is created on demand.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, RelayError> {
        validate_bucket_name(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, RelayError> {
        validate_object_key(key)?;
        Ok(self.bucket_dir(bucket)?.join(key))
    }
}

impl ObjectStore for FsObjectStore {
    fn create_bucket_if_absent(&self, bucket: &str) -> Result<(), RelayError> {
        let dir = self.bucket_dir(bucket)?;
        if dir.is_dir() {
            return Ok(());
        }

        fs::create_dir_all(&dir).map_err(|e| bucket_error(bucket, e))?;
        info!(bucket = %bucket, path = %dir.display(), "Created bucket");
        Ok(())
    }

    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectSummary>, RelayError> {
        let dir = self.bucket_dir(bucket)?;
        let entries = fs::read_dir(&dir).map_err(|e| bucket_error(bucket, e))?;

        let mut objects = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| bucket_error(bucket, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            // Temporary files from in-flight writes are hidden
            if name.starts_with('.') {
                continue;
            }
            let metadata = entry.metadata().map_err(|e| bucket_error(bucket, e))?;
            if !metadata.is_file() {
                continue;
            }
            objects.push(ObjectSummary {
                key: name,
                size: metadata.len(),
                last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(bucket = %bucket, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, RelayError> {
        let path = self.object_path(bucket, key)?;
        let file = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RelayError::Provider {
                kind: ProviderErrorKind::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                },
            },
            _ => RelayError::Io(e),
        })?;
        Ok(ObjectStream::new(key, Box::new(file)))
    }

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> Result<(), RelayError> {
        let path = self.object_path(bucket, key)?;
        let dir = self.bucket_dir(bucket)?;
        let temp_path = dir.join(format!(".{}.{}", key, Uuid::new_v4()));

        let write_result = (|| -> std::io::Result<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
            fs::rename(&temp_path, &path)
        })();

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(bucket_error(bucket, e));
        }

        debug!(bucket = %bucket, key = %key, bytes = data.len(), "Stored object");
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), RelayError> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(bucket = %bucket, key = %key, "Deleted object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RelayError::Io(e)),
        }
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        format!("file://{}/{}", self.root.join(bucket).display(), key)
    }
}
