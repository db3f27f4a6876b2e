//! Shared test doubles

#![allow(dead_code)]

use async_trait::async_trait;
use ssl_hub::{CommandExecutor, CommandResult, Config, ExecError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// One recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Executor that records calls and replies with a canned result
#[derive(Clone)]
pub struct RecordingExecutor {
    calls: Arc<Mutex<Vec<Invocation>>>,
    reply: Arc<Mutex<Result<CommandResult, String>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::replying("ok\n", true)
    }

    pub fn replying(output: &str, succeeded: bool) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            reply: Arc::new(Mutex::new(Ok(CommandResult {
                output: output.to_string(),
                succeeded,
            }))),
        }
    }

    /// Every call fails to spawn with this message
    pub fn failing_spawn(message: &str) -> Self {
        let executor = Self::new();
        *executor.reply.lock().unwrap() = Err(message.to_string());
        executor
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, program: &Path, args: &[String]) -> Result<CommandResult, ExecError> {
        self.calls.lock().unwrap().push(Invocation {
            program: program.to_path_buf(),
            args: args.to_vec(),
        });
        match &*self.reply.lock().unwrap() {
            Ok(result) => Ok(result.clone()),
            Err(message) => Err(ExecError::Spawn {
                program: program.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, message.clone()),
            }),
        }
    }
}

/// Config pointing at a fresh temp state dir and fake tool paths
pub fn test_config() -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_state_dir(dir.path().join("state"));
    config.tools.whmapi = PathBuf::from("/test/whmapi1");
    config.tools.autossl_check = PathBuf::from("/test/autossl_check");
    config.tools.issue_script = PathBuf::from("/test/zerossl.sh");
    (dir, config)
}
