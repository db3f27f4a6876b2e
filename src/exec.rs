//! External Command Execution
//!
//! Every privileged tool is launched from an argument vector, never through
//! `sh -c`, so nothing a caller submits is ever parsed by a shell.
//! stdout and stderr are merged into one transcript in the order chunks
//! arrive, which is what an operator wants to read when a run fails.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Command execution errors
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
}

/// Result of a finished external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// stdout and stderr interleaved
    pub output: String,
    /// Exit status was zero
    pub succeeded: bool,
}

/// Runs external programs on behalf of the dispatcher
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args` and wait for it to exit
    async fn execute(&self, program: &Path, args: &[String]) -> Result<CommandResult, ExecError>;
}

/// Executor backed by real child processes
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor {
    timeout: Option<Duration>,
}

impl SystemExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the child if it runs longer than `timeout`
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandExecutor for SystemExecutor {
    async fn execute(&self, program: &Path, args: &[String]) -> Result<CommandResult, ExecError> {
        let name = program.display().to_string();
        let start = Instant::now();
        debug!(program = %name, argc = args.len(), "Spawning external command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: name.clone(),
                source,
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ExecError::Io {
                program: name,
                source: std::io::Error::other("child pipes unavailable"),
            });
        };

        let run = async {
            let output = read_interleaved(stdout, stderr).await?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((output, status))
        };

        let finished = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, run).await {
                Ok(finished) => finished,
                Err(_) => {
                    warn!(
                        program = %name,
                        timeout_secs = timeout.as_secs(),
                        "External command timed out"
                    );
                    // kill_on_drop reaps the child once `run` is dropped
                    return Err(ExecError::TimedOut {
                        program: name,
                        timeout,
                    });
                }
            },
            None => run.await,
        };

        let (output, status) = finished.map_err(|source| ExecError::Io {
            program: name.clone(),
            source,
        })?;

        let output = String::from_utf8_lossy(&output).into_owned();
        info!(
            program = %name,
            exit_code = ?status.code(),
            output_bytes = output.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "External command finished"
        );

        Ok(CommandResult {
            output,
            succeeded: status.success(),
        })
    }
}

/// Drain both pipes concurrently, appending chunks in arrival order
async fn read_interleaved<O, E>(mut stdout: O, mut stderr: E) -> std::io::Result<Vec<u8>>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut combined = Vec::new();
    let mut out_buf = [0u8; 8192];
    let mut err_buf = [0u8; 8192];
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            n = stdout.read(&mut out_buf), if out_open => {
                match n? {
                    0 => out_open = false,
                    n => combined.extend_from_slice(&out_buf[..n]),
                }
            }
            n = stderr.read(&mut err_buf), if err_open => {
                match n? {
                    0 => err_open = false,
                    n => combined.extend_from_slice(&err_buf[..n]),
                }
            }
        }
    }

    Ok(combined)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let result = SystemExecutor::new()
            .execute(Path::new("/bin/sh"), &sh("echo hello"))
            .await
            .unwrap();
        assert!(result.succeeded);
        assert_eq!(result.output, "hello\n");
    }

    #[tokio::test]
    async fn test_failure_captures_both_streams() {
        let result = SystemExecutor::new()
            .execute(Path::new("/bin/sh"), &sh("echo out; echo err >&2; exit 3"))
            .await
            .unwrap();
        assert!(!result.succeeded);
        assert!(result.output.contains("out\n"));
        assert!(result.output.contains("err\n"));
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_parsed() {
        // printf receives the literal string; no expansion happens
        let args = vec!["%s".to_string(), "$(id); `id` | && ;".to_string()];
        let result = SystemExecutor::new()
            .execute(Path::new("/usr/bin/printf"), &args)
            .await
            .unwrap();
        assert!(result.succeeded);
        assert_eq!(result.output, "$(id); `id` | && ;");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = SystemExecutor::new()
            .execute(Path::new("/nonexistent/ssl-hub-tool"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/ssl-hub-tool"));
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let executor = SystemExecutor::with_timeout(Some(Duration::from_millis(200)));
        let start = Instant::now();
        let err = executor
            .execute(Path::new("/bin/sh"), &sh("sleep 5"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::TimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_read_interleaved_merges_readers() {
        let out: &[u8] = b"one\n";
        let err: &[u8] = b"two\n";
        let combined = read_interleaved(out, err).await.unwrap();
        assert_eq!(combined.len(), 8);
        let text = String::from_utf8(combined).unwrap();
        assert!(text.contains("one\n") && text.contains("two\n"));
    }
}
