//! Per-task lifecycle status and the legal transitions between statuses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task.
///
/// `created → executing → {completed, failed, cancelled}`, with the explicit
/// `executing ⇄ paused` edge and the `executing → blocked → executing` detour
/// while a tool call awaits approval. Terminal statuses accept no further
/// transition; a "restart" is a new task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    Executing,
    Paused,
    Blocked,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Active statuses: the task has a driver making (or awaiting) progress.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Executing | Self::Blocked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Executing => "executing",
            Self::Paused => "paused",
            Self::Blocked => "blocked",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match self {
            Created => matches!(next, Executing | Cancelled | Failed),
            Executing => matches!(next, Paused | Blocked | Completed | Failed | Cancelled),
            Paused => matches!(next, Executing | Cancelled | Failed),
            Blocked => matches!(next, Executing | Completed | Failed | Cancelled),
            Completed | Failed | Cancelled => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
