use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Timeout applied when the caller does not supply one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hard ceiling on the execution timeout. A caller-specified timeout is
/// clamped to this value regardless of what was requested.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(600);

/// Describes a command to be executed by a
/// [`CommandExecutor`](crate::CommandExecutor).
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Extra environment entries layered over the minimal base environment.
    pub env_overrides: HashMap<String, String>,
    /// Requested timeout; clamped to [`MAX_TIMEOUT`] at execution time.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env_overrides: HashMap::new(),
            timeout: None,
        }
    }

    /// Splits a raw command line with shell quoting rules and builds a spec
    /// from the resulting argv.
    pub fn from_command_line(raw: &str, working_dir: impl Into<PathBuf>) -> Result<Self> {
        let parts = shell_words::split(raw)
            .with_context(|| format!("failed to parse command line: {raw}"))?;
        let (program, args) = parts
            .split_first()
            .map(|(head, tail)| (head.clone(), tail.to_vec()))
            .context("command line is empty")?;
        Ok(Self {
            program,
            args,
            working_dir: working_dir.into(),
            env_overrides: HashMap::new(),
            timeout: None,
        })
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The timeout that will actually be enforced: the requested value
    /// clamped to [`MAX_TIMEOUT`], or [`DEFAULT_TIMEOUT`] if none was given.
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT).min(MAX_TIMEOUT)
    }

    /// Rendering of the command for logs and transcripts.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        shell_words::join(parts.iter().map(String::as_str))
    }
}
