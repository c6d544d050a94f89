//! Configuration settings for the speech relay.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::RelayError;
use crate::providers::Engine;
use crate::validation::validate_bucket_name;

/// Main configuration structure for the relay.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub socket: SocketConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Socket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketConfig {
    /// Path to the Unix socket file.
    pub path: PathBuf,
    /// Socket file permissions (e.g., "0660").
    #[serde(default = "default_socket_permissions")]
    pub permissions: String,
}

/// Which object store backs the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    Memory,
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    /// Root directory holding one subdirectory per bucket.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Bucket that receives synthesized audio.
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

/// Synthesis engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// Engine tier requested for jobs and used to filter the voice catalog.
    #[serde(default = "default_engine")]
    pub engine: Engine,
    /// Speech engine binary.
    #[serde(default = "default_espeak_bin")]
    pub espeak_bin: PathBuf,
    /// Transcoder binary used to produce mp3 / ogg output.
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: PathBuf,
    /// Per-subprocess timeout in seconds.
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_seconds: u64,
    /// Scratch directory for intermediate audio.
    #[serde(default = "std::env::temp_dir")]
    pub temp_dir: PathBuf,
    /// Worker threads rendering jobs; further jobs queue.
    #[serde(default = "default_synthesis_workers")]
    pub max_workers: usize,
    /// Seconds a finished task stays queryable.
    #[serde(default = "default_task_retention")]
    pub task_retention_seconds: u64,
}

/// Credential table configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    /// JSON file produced by `relay-credential`.
    pub table_path: Option<PathBuf>,
    /// Verify `authorization_email` / `authorization_password` headers.
    #[serde(default)]
    pub required: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum frame size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum concurrent connections.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// Socket read/write timeout in seconds.
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_seconds: u64,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Path to the audit log file.
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

// Default value functions
fn default_socket_permissions() -> String {
    "0660".to_string()
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Filesystem
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("/var/lib/speech-relay/objects")
}

fn default_bucket() -> String {
    "lambdaspeach".to_string()
}

fn default_engine() -> Engine {
    Engine::Neural
}

fn default_espeak_bin() -> PathBuf {
    PathBuf::from("espeak-ng")
}

fn default_ffmpeg_bin() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_synthesis_timeout() -> u64 {
    120
}

fn default_synthesis_workers() -> usize {
    4
}

fn default_task_retention() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_message_size() -> usize {
    // Audio bodies travel base64-encoded
    crate::protocol::DEFAULT_MAX_MESSAGE_SIZE
}

fn default_max_concurrent() -> usize {
    32
}

fn default_socket_timeout() -> u64 {
    30
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("/var/log/speech-relay/audit.log")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            root: default_storage_root(),
            bucket: default_bucket(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            espeak_bin: default_espeak_bin(),
            ffmpeg_bin: default_ffmpeg_bin(),
            timeout_seconds: default_synthesis_timeout(),
            temp_dir: std::env::temp_dir(),
            max_workers: default_synthesis_workers(),
            task_retention_seconds: default_task_retention(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            max_concurrent_requests: default_max_concurrent(),
            socket_timeout_seconds: default_socket_timeout(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_path: default_audit_log_path(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RelayError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            RelayError::Config { message } => RelayError::Config {
                message: format!("{} ({})", message, path.display()),
            },
            other => other,
        })
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, RelayError> {
        let settings: Settings = toml::from_str(content).map_err(|e| RelayError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), RelayError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(RelayError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(RelayError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if !self.socket.permissions.chars().all(|c| c.is_ascii_digit()) {
            return Err(RelayError::Config {
                message: format!(
                    "Invalid socket permissions '{}'. Must be octal (e.g., '0660')",
                    self.socket.permissions
                ),
            });
        }

        if validate_bucket_name(&self.storage.bucket).is_err() {
            return Err(RelayError::Config {
                message: format!("Invalid bucket name '{}'", self.storage.bucket),
            });
        }

        if self.limits.max_concurrent_requests == 0 {
            return Err(RelayError::Config {
                message: "limits.max_concurrent_requests must be at least 1".to_string(),
            });
        }

        if self.synthesis.max_workers == 0 {
            return Err(RelayError::Config {
                message: "synthesis.max_workers must be at least 1".to_string(),
            });
        }

        if self.credentials.required && self.credentials.table_path.is_none() {
            return Err(RelayError::Config {
                message: "credentials.required is set but credentials.table_path is missing"
                    .to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [socket]
        path = "/tmp/speech-relay/relay.sock"
    "#;

    #[test]
    fn test_default_values() {
        assert_eq!(default_socket_permissions(), "0660");
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_log_format(), "pretty");
        assert_eq!(default_bucket(), "lambdaspeach");
    }

    #[test]
    fn test_minimal_config_fills_defaults() {
        let settings = Settings::from_toml(MINIMAL).unwrap();
        assert_eq!(settings.storage.backend, StorageBackend::Filesystem);
        assert_eq!(settings.synthesis.engine, Engine::Neural);
        assert!(!settings.credentials.required);
        assert!(settings.audit.enabled);
        assert_eq!(settings.synthesis.max_workers, 4);
        assert_eq!(settings.synthesis.task_retention_seconds, 3600);
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let content = format!("{}\n[logging]\nlevel = \"loud\"\n", MINIMAL);
        assert!(Settings::from_toml(&content).is_err());
    }

    #[test]
    fn test_required_credentials_need_table() {
        let content = format!("{}\n[credentials]\nrequired = true\n", MINIMAL);
        let err = Settings::from_toml(&content).unwrap_err();
        assert!(err.to_string().contains("table_path"));
    }

    #[test]
    fn test_rejects_zero_limits() {
        let content = format!("{}\n[limits]\nmax_concurrent_requests = 0\n", MINIMAL);
        let err = Settings::from_toml(&content).unwrap_err();
        assert!(err.to_string().contains("max_concurrent_requests"));

        let content = format!("{}\n[synthesis]\nmax_workers = 0\n", MINIMAL);
        let err = Settings::from_toml(&content).unwrap_err();
        assert!(err.to_string().contains("max_workers"));
    }

    #[test]
    fn test_parses_full_config() {
        let content = r#"
            [socket]
            path = "/run/speech-relay.sock"
            permissions = "0600"

            [storage]
            backend = "memory"
            bucket = "voices"

            [synthesis]
            engine = "standard"
            timeout_seconds = 10
            max_workers = 2
            task_retention_seconds = 60

            [credentials]
            table_path = "/etc/speech-relay/credentials.json"
            required = true

            [logging]
            level = "debug"
            format = "json"
        "#;
        let settings = Settings::from_toml(content).unwrap();
        assert_eq!(settings.storage.backend, StorageBackend::Memory);
        assert_eq!(settings.storage.bucket, "voices");
        assert_eq!(settings.synthesis.engine, Engine::Standard);
        assert_eq!(settings.synthesis.timeout_seconds, 10);
        assert_eq!(settings.synthesis.max_workers, 2);
        assert_eq!(settings.synthesis.task_retention_seconds, 60);
        assert!(settings.credentials.required);
    }
}
