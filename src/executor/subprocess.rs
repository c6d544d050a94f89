//! Subprocess execution for synthesis engines.
//!
//! Commands are exec'd directly (no shell), their output is captured on
//! reader threads so a chatty engine cannot fill a pipe and stall, and a
//! process that outlives its timeout is killed and reaped.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ProviderErrorKind, RelayError};

/// Result of a subprocess execution.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    /// Whether the command exited with code 0.
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Builder for subprocess execution.
pub struct SubprocessBuilder {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> String {
    let bytes = handle.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).to_string()
}

impl SubprocessBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().display().to_string(),
            args: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Add arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args.extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute the command and wait for completion with timeout enforcement.
    pub fn run(self) -> Result<SubprocessResult, RelayError> {
        debug!(
            program = %self.program,
            args = ?self.args,
            timeout_secs = self.timeout.as_secs(),
            "Executing subprocess"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RelayError::engine_failed(format!("Failed to spawn {}: {}", self.program, e)))?;

        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let start = Instant::now();
        let status = self.wait(&mut child, start)?;

        let result = SubprocessResult {
            success: status.success(),
            exit_code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        };
        debug!(
            success = result.success,
            exit_code = ?result.exit_code,
            duration_ms = start.elapsed().as_millis(),
            "Subprocess completed"
        );
        Ok(result)
    }

    fn wait(&self, child: &mut Child, start: Instant) -> Result<std::process::ExitStatus, RelayError> {
        let poll_interval = Duration::from_millis(50);

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        warn!(
                            program = %self.program,
                            timeout_secs = self.timeout.as_secs(),
                            "Process timed out, killing"
                        );
                        if let Err(e) = child.kill() {
                            warn!(error = %e, "Failed to kill timed-out process");
                        }
                        let _ = child.wait();
                        return Err(RelayError::Provider {
                            kind: ProviderErrorKind::Timeout {
                                timeout_secs: self.timeout.as_secs(),
                            },
                        });
                    }
                    thread::sleep(poll_interval);
                }
                Err(e) => {
                    return Err(RelayError::engine_failed(format!(
                        "Failed to check process status: {}",
                        e
                    )));
                }
            }
        }
    }
}

/// Run a command with the given arguments and timeout.
pub fn run_command(
    program: impl AsRef<Path>,
    args: &[&str],
    timeout: Duration,
) -> Result<SubprocessResult, RelayError> {
    SubprocessBuilder::new(program)
        .args(args.iter().copied())
        .timeout(timeout)
        .run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_echo() {
        let result = run_command("echo", &["hello", "world"], Duration::from_secs(5)).unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "hello world");
    }

    #[test]
    fn test_run_false_command() {
        let result = run_command("false", &[], Duration::from_secs(5)).unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(1));
    }

    #[test]
    fn test_nonexistent_command() {
        let result = run_command("nonexistent_engine_12345", &[], Duration::from_secs(5));
        assert!(matches!(
            result,
            Err(RelayError::Provider {
                kind: ProviderErrorKind::EngineFailed { .. }
            })
        ));
    }

    #[test]
    fn test_stderr_capture() {
        let result = run_command("sh", &["-c", "echo error >&2"], Duration::from_secs(5)).unwrap();
        assert!(result.success);
        assert_eq!(result.stderr.trim(), "error");
    }

    #[test]
    fn test_large_output_does_not_stall() {
        let result = SubprocessBuilder::new("sh")
            .arg("-c")
            .arg("head -c 200000 /dev/zero | tr '\\0' 'a'")
            .timeout(Duration::from_secs(10))
            .run()
            .unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.len(), 200_000);
    }

    #[test]
    fn test_timeout_kills_process() {
        let result = run_command("sleep", &["5"], Duration::from_millis(200));
        assert!(matches!(
            result,
            Err(RelayError::Provider {
                kind: ProviderErrorKind::Timeout { .. }
            })
        ));
    }
}
