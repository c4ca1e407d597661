use crate::environment::minimal_environment;
use crate::spec::CommandSpec;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Bytes captured per stream before truncation kicks in.
pub const DEFAULT_CAPTURE_LIMIT: usize = 256 * 1024;

/// Marker appended to a stream whose capture was cut short.
pub const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// Describes the exit status of a command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandStatus {
    success: bool,
    code: Option<i32>,
}

impl CommandStatus {
    pub fn new(success: bool, code: Option<i32>) -> Self {
        Self { success, code }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Output produced by the executor for a command invocation.
///
/// A non-zero exit is reported here as `status.success() == false`; it is
/// never surfaced as an `Err`, so callers always receive the captured
/// streams alongside the failure.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub status: CommandStatus,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::new(true, Some(0)),
            stdout: stdout.into(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            timed_out: false,
            duration_ms: 0,
        }
    }
}

/// Trait implemented by concrete command execution strategies.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Executes commands via [`tokio::process::Command`] with a minimal
/// environment and bounded stream capture.
#[cfg(feature = "std-process")]
pub struct ProcessCommandExecutor {
    capture_limit: usize,
}

#[cfg(feature = "std-process")]
impl ProcessCommandExecutor {
    pub fn new() -> Self {
        Self {
            capture_limit: DEFAULT_CAPTURE_LIMIT,
        }
    }

    /// Overrides the per-stream capture ceiling.
    pub fn with_capture_limit(capture_limit: usize) -> Self {
        Self { capture_limit }
    }
}

#[cfg(feature = "std-process")]
impl Default for ProcessCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std-process")]
#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let started = Instant::now();

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .env_clear()
            .envs(minimal_environment(&spec.env_overrides))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn command: {}", spec.display()))?;

        let stdout = child.stdout.take().context("child stdout not captured")?;
        let stderr = child.stderr.take().context("child stderr not captured")?;
        let limit = self.capture_limit;
        let stdout_task = tokio::spawn(capture_stream(stdout, limit));
        let stderr_task = tokio::spawn(capture_stream(stderr, limit));

        let mut timed_out = false;
        let status = match tokio::time::timeout(spec.effective_timeout(), child.wait()).await {
            Ok(waited) => waited.context("failed to wait for child process")?,
            Err(_elapsed) => {
                timed_out = true;
                child.start_kill().ok();
                child
                    .wait()
                    .await
                    .context("failed to reap timed-out child process")?
            }
        };

        let (mut stdout, stdout_truncated) =
            stdout_task.await.context("stdout capture task failed")?;
        let (mut stderr, stderr_truncated) =
            stderr_task.await.context("stderr capture task failed")?;
        if stdout_truncated {
            stdout.push_str(TRUNCATION_MARKER);
        }
        if stderr_truncated {
            stderr.push_str(TRUNCATION_MARKER);
        }

        let mut status = CommandStatus::from(status);
        if timed_out {
            status = CommandStatus::new(false, status.code());
        }

        Ok(CommandOutput {
            status,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
            timed_out,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Reads a stream to completion while retaining at most `limit` bytes.
///
/// The remainder is still drained so the child never blocks on a full pipe.
async fn capture_stream<R>(mut reader: R, limit: usize) -> (String, bool)
where
    R: AsyncRead + Unpin,
{
    let mut captured: Vec<u8> = Vec::with_capacity(limit.min(8 * 1024));
    let mut truncated = false;
    let mut buf = [0u8; 8 * 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(read) => {
                let room = limit.saturating_sub(captured.len());
                let take = room.min(read);
                captured.extend_from_slice(&buf[..take]);
                if take < read {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }
    (String::from_utf8_lossy(&captured).into_owned(), truncated)
}

/// Records invocations without spawning anything; every execution reports
/// success with empty output.
#[cfg(feature = "dry-run")]
pub struct DryRunCommandExecutor {
    invocations: parking_lot::Mutex<Vec<CommandSpec>>,
}

#[cfg(feature = "dry-run")]
impl DryRunCommandExecutor {
    pub fn new() -> Self {
        Self {
            invocations: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Specs passed to [`CommandExecutor::execute`] so far, in order.
    pub fn invocations(&self) -> Vec<CommandSpec> {
        self.invocations.lock().clone()
    }
}

#[cfg(feature = "dry-run")]
impl Default for DryRunCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "dry-run")]
#[async_trait]
impl CommandExecutor for DryRunCommandExecutor {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.invocations.lock().push(spec.clone());
        Ok(CommandOutput::success(String::new()))
    }
}
