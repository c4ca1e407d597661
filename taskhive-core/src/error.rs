//! Error taxonomy for the runtime.
//!
//! Precondition and authorization failures are detected before any side
//! effect and converted to structured `{success:false, error}` results at
//! the tool boundary; they never terminate a task. Each kind carries a
//! stable code string that is what controlling agents match on.

use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The calling task is not an ancestor of the target task.
    #[error("caller is not an ancestor of task `{0}`")]
    Forbidden(String),

    /// The tool name is not dispatchable in this context. Deliberately also
    /// covers tools hidden by the permission policy, so gated capabilities
    /// are not revealed to the caller.
    #[error("unknown tool `{0}`")]
    UnknownTool(String),

    /// No task with the given id exists in the graph.
    #[error("task `{0}` not found")]
    TaskNotFound(String),

    /// The target task already reached a terminal status.
    #[error("task `{0}` already finished")]
    TaskAlreadyFinished(String),

    /// The target task is not in an active state.
    #[error("task `{0}` is not running")]
    TaskNotRunning(String),

    /// The target task is not paused.
    #[error("task `{0}` is not paused")]
    TaskNotPaused(String),

    /// The target task has no live in-memory executor (for example after a
    /// process restart). Status is left unchanged.
    #[error("no live executor for task `{0}`")]
    NoExecutor(String),

    /// The resolved path escapes the workspace root and is not allow-listed.
    #[error("path `{0}` is outside the workspace")]
    PathOutsideWorkspace(String),

    /// A human operator rejected the gated operation.
    #[error("user denied the request: {0}")]
    ApprovalDenied(String),

    /// The approval request was already resolved or never existed.
    #[error("approval `{0}` is unknown or already resolved")]
    ApprovalAlreadyResolved(String),

    /// Spawning would exceed the sub-agent depth ceiling.
    #[error("agent depth limit reached")]
    DepthLimit,

    /// The task's lifecycle does not permit the requested transition.
    #[error("illegal status transition for task `{task_id}`: {from} -> {to}")]
    IllegalTransition {
        task_id: String,
        from: String,
        to: String,
    },

    /// IO failure from the underlying tool body.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Any other failure from a tool body, surfaced with its message.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RuntimeError {
    /// Stable code string for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "FORBIDDEN",
            Self::UnknownTool(_) => "UNKNOWN_TOOL",
            Self::TaskNotFound(_) => "TASK_NOT_FOUND",
            Self::TaskAlreadyFinished(_) => "TASK_ALREADY_FINISHED",
            Self::TaskNotRunning(_) => "TASK_NOT_RUNNING",
            Self::TaskNotPaused(_) => "TASK_NOT_PAUSED",
            Self::NoExecutor(_) => "NO_EXECUTOR",
            Self::PathOutsideWorkspace(_) => "PATH_OUTSIDE_WORKSPACE",
            Self::ApprovalDenied(_) => "APPROVAL_DENIED",
            Self::ApprovalAlreadyResolved(_) => "APPROVAL_ALREADY_RESOLVED",
            Self::DepthLimit => "DEPTH_LIMIT",
            Self::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            Self::Io(_) => "IO",
            Self::Other(_) => "TOOL_FAILED",
        }
    }

    /// Structured `{success:false, error, message}` rendering of the error,
    /// the uniform failure shape every tool returns.
    pub fn failure_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.code(),
            "message": self.to_string(),
        })
    }
}
