//! Bounded command execution
//!
//! Commands run verbatim through `sh -c` under a wall-clock budget.
//! A non-zero exit is a normal result; only a failed spawn is an `Err`.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::core::{AgentError, AgentResult};

/// Default execution budget (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum captured output length in characters
const MAX_OUTPUT_LENGTH: usize = 30000;

/// Result of a single command execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The command string as executed
    pub command: String,
    /// Combined stdout/stderr text
    pub output: String,
    /// Set when the command timed out or was cancelled
    pub error: Option<String>,
    /// Real exit code, or -1 when the process was killed before producing one
    pub exit_code: i32,
    /// Wall-clock duration, recorded regardless of outcome
    pub duration: Duration,
}

impl ExecutionResult {
    /// True if the command ran to completion with exit code 0
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.error.is_none()
    }

    /// Format the result for feeding back to the model
    pub fn format_result(&self) -> String {
        if let Some(ref err) = self.error {
            if self.output.is_empty() {
                return format!("Command failed: {}", err);
            }
            return format!("Command failed: {}\n{}", err, self.output);
        }
        if self.exit_code != 0 {
            return format!(
                "Command failed with exit code {}:\n{}",
                self.exit_code, self.output
            );
        }
        self.output.clone()
    }
}

/// Executes shell commands under a timeout/cancellation budget
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    /// Create a runner with the default 30-second budget
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a runner with a custom budget
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Current execution budget
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a command and return its result.
    ///
    /// The string is passed verbatim to `sh -c`, never re-parsed. On
    /// timeout or cancellation the process is killed, `exit_code` is -1,
    /// and the cause is surfaced in the result's `error` field.
    pub async fn execute(
        &self,
        command: &str,
        cancel: &CancellationToken,
    ) -> AgentResult<ExecutionResult> {
        tracing::info!("Executing command: {}", command);
        let start = Instant::now();

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(AgentError::Spawn)?;

        // kill_on_drop reaps the child when the output future is dropped
        // on the timeout/cancel branches.
        let output_future = child.wait_with_output();

        let result = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::warn!("Command cancelled after {:?}: {}", start.elapsed(), command);
                ExecutionResult {
                    command: command.to_string(),
                    output: String::new(),
                    error: Some("command cancelled".to_string()),
                    exit_code: -1,
                    duration: start.elapsed(),
                }
            }

            outcome = tokio::time::timeout(self.timeout, output_future) => {
                match outcome {
                    Ok(io_result) => {
                        let output = io_result.map_err(AgentError::Io)?;
                        let exit_code = output.status.code().unwrap_or(-1);
                        let text = combine_output(&output.stdout, &output.stderr);
                        tracing::debug!(
                            "Command finished: exit_code={} duration={:?}",
                            exit_code,
                            start.elapsed()
                        );
                        ExecutionResult {
                            command: command.to_string(),
                            output: text,
                            error: None,
                            exit_code,
                            duration: start.elapsed(),
                        }
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Command timed out after {:?}: {}",
                            self.timeout,
                            command
                        );
                        ExecutionResult {
                            command: command.to_string(),
                            output: String::new(),
                            error: Some(format!(
                                "command timed out after {}s",
                                self.timeout.as_secs()
                            )),
                            exit_code: -1,
                            duration: start.elapsed(),
                        }
                    }
                }
            }
        };

        Ok(result)
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Combine stdout and stderr into one text blob, truncated if oversized
fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);

    let mut result = String::new();
    if !stdout.is_empty() {
        result.push_str(&stdout);
    }
    if !stderr.is_empty() {
        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str("STDERR:\n");
        result.push_str(&stderr);
    }

    if result.len() > MAX_OUTPUT_LENGTH {
        let mut end = MAX_OUTPUT_LENGTH;
        while !result.is_char_boundary(end) {
            end -= 1;
        }
        result.truncate(end);
        result.push_str("\n... (output truncated)");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_success() {
        let runner = CommandRunner::new();
        let cancel = CancellationToken::new();
        let result = runner.execute("echo hello", &cancel).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output.trim(), "hello");
        assert!(result.error.is_none());
        assert_eq!(result.command, "echo hello");
    }

    #[tokio::test]
    async fn test_execute_nonzero_exit_is_not_an_err() {
        let runner = CommandRunner::new();
        let cancel = CancellationToken::new();
        let result = runner.execute("exit 3", &cancel).await.unwrap();

        assert!(!result.is_success());
        assert_eq!(result.exit_code, 3);
        assert!(result.error.is_none());
        assert!(result
            .format_result()
            .starts_with("Command failed with exit code 3"));
    }

    #[tokio::test]
    async fn test_execute_captures_stderr() {
        let runner = CommandRunner::new();
        let cancel = CancellationToken::new();
        let result = runner
            .execute("echo out; echo err >&2", &cancel)
            .await
            .unwrap();

        assert!(result.output.contains("out"));
        assert!(result.output.contains("STDERR:"));
        assert!(result.output.contains("err"));
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let runner = CommandRunner::with_timeout(Duration::from_millis(200));
        let cancel = CancellationToken::new();
        let result = runner.execute("sleep 5", &cancel).await.unwrap();

        assert!(!result.is_success());
        assert_eq!(result.exit_code, -1);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
        assert!(result.duration >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_execute_cancelled() {
        let runner = CommandRunner::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = runner.execute("sleep 5", &cancel).await.unwrap();

        assert_eq!(result.exit_code, -1);
        assert_eq!(result.error.as_deref(), Some("command cancelled"));
    }

    #[tokio::test]
    async fn test_execute_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "found").unwrap();

        let runner = CommandRunner::new();
        let cancel = CancellationToken::new();
        let cmd = format!("cat {}/marker.txt", dir.path().display());
        let result = runner.execute(&cmd, &cancel).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.output.trim(), "found");
    }

    #[test]
    fn test_combine_output_truncates() {
        let big = vec![b'x'; MAX_OUTPUT_LENGTH + 100];
        let combined = combine_output(&big, b"");
        assert!(combined.ends_with("... (output truncated)"));
    }
}
