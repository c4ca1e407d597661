//! The shell execution tool.
//!
//! Requires the `shell` capability for the tool to be offered at all and
//! human approval for every invocation. The heavy lifting — minimal
//! environment, bounded capture, timeout clamping — lives in
//! `taskhive-shell-runner`; this module binds it to the workspace sandbox
//! and the uniform result shape.

use crate::error::RuntimeError;
use crate::tools::fs::path_guard;
use crate::tools::types::RunCommandInput;
use crate::workspace::Workspace;
use serde_json::{json, Value};
use std::time::Duration;
use taskhive_shell_runner::{CommandExecutor, CommandSpec};

/// Human-readable summary shown in the approval prompt.
pub fn approval_summary(input: &RunCommandInput) -> String {
    match &input.working_dir {
        Some(dir) => format!("run `{}` in {dir}", input.command),
        None => format!("run `{}`", input.command),
    }
}

/// Executes the command and renders the uniform result. A non-zero exit or
/// timeout is a `success:false` result with the captured streams attached,
/// never an error.
pub async fn run_command(
    workspace: &Workspace,
    executor: &dyn CommandExecutor,
    input: &RunCommandInput,
) -> Result<Value, RuntimeError> {
    let working_dir = match &input.working_dir {
        Some(dir) => path_guard::resolve(workspace, dir)?,
        None => workspace.root.clone(),
    };

    let mut spec = CommandSpec::from_command_line(&input.command, working_dir)?;
    for (key, value) in &input.env {
        spec = spec.with_env(key.clone(), value.clone());
    }
    if let Some(secs) = input.timeout_secs {
        spec = spec.with_timeout(Duration::from_secs(secs));
    }

    let output = executor.execute(&spec).await?;
    Ok(json!({
        "success": output.status.success() && !output.timed_out,
        "exit_code": output.status.code(),
        "stdout": output.stdout,
        "stderr": output.stderr,
        "stdout_truncated": output.stdout_truncated,
        "stderr_truncated": output.stderr_truncated,
        "timed_out": output.timed_out,
        "duration_ms": output.duration_ms,
        "command": spec.display(),
    }))
}
