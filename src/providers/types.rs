//! Value types shared by synthesis and storage providers.

use std::fmt;
use std::io::Read;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Synthesis engine tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Standard,
    Neural,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Standard => "standard",
            Engine::Neural => "neural",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audio container produced by a synthesis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Mp3,
    OggVorbis,
}

impl OutputFormat {
    /// Normalize a caller-supplied `filetype`.
    ///
    /// Only `"mp3"` selects mp3; absence and every other value select
    /// ogg vorbis.
    pub fn from_filetype(filetype: Option<&str>) -> Self {
        match filetype {
            Some("mp3") => OutputFormat::Mp3,
            _ => OutputFormat::OggVorbis,
        }
    }

    /// Provider-facing format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::OggVorbis => "ogg_vorbis",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "audio/mp3",
            OutputFormat::OggVorbis => "audio/ogg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::OggVorbis => "ogg",
        }
    }
}

/// How the job text should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextType {
    Ssml,
    Text,
}

/// Lifecycle state of an asynchronous synthesis task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Scheduled,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Caller-facing status word.
    pub fn normalized(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "COMPLETE",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Scheduled | TaskStatus::InProgress => "RUNNING",
        }
    }
}

/// A synthesis job submitted to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisJob {
    pub text: String,
    pub text_type: TextType,
    pub voice_id: String,
    pub output_format: OutputFormat,
    pub output_bucket: String,
    pub engine: Engine,
}

/// Provider view of a synthesis task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisTask {
    pub task_id: String,
    pub output_uri: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    pub output_format: OutputFormat,
    pub voice_id: String,
    pub creation_time: DateTime<Utc>,
}

/// One synthetic voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Voice {
    pub gender: String,
    pub id: String,
    pub language_code: String,
    pub language_name: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_language_codes: Vec<String>,
    pub supported_engines: Vec<Engine>,
}

/// Voice catalog as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceCatalog {
    pub voices: Vec<Voice>,
}

impl VoiceCatalog {
    /// Keep only voices that support `engine`.
    pub fn for_engine(self, engine: Engine) -> Self {
        Self {
            voices: self
                .voices
                .into_iter()
                .filter(|v| v.supported_engines.contains(&engine))
                .collect(),
        }
    }
}

/// Listing entry for a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Readable body of a stored object.
///
/// The underlying handle is released when the stream is dropped, so every
/// exit path of a reader releases it.
pub struct ObjectStream {
    key: String,
    inner: Box<dyn Read + Send>,
}

impl ObjectStream {
    pub fn new(key: impl Into<String>, inner: Box<dyn Read + Send>) -> Self {
        Self {
            key: key.into(),
            inner,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Read for ObjectStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for ObjectStream {
    fn drop(&mut self) {
        debug!(key = %self.key, "Object stream released");
    }
}

impl fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream").field("key", &self.key).finish()
    }
}
