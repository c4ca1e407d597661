//! The tool layer: a closed set of built-in tools dispatched by tag, the
//! registry that gates them behind the permission policy and approval gate,
//! and the input types the model forms calls with.

pub mod agent_control;
pub mod fs;
pub mod registry;
pub mod shell;
pub mod types;

use crate::policy::Capability;
use serde_json::{json, Value};

/// Closed, tagged set of built-in tools. Adding or removing a tool is a
/// compile-time-checked change; an unknown name is a single `None` arm in
/// [`ToolKind::from_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ReadFile,
    WriteFile,
    DeleteFile,
    ListDir,
    GlobSearch,
    GrepSearch,
    RunCommand,
    SpawnAgent,
    WaitForAgent,
    SendAgentMessage,
    CaptureAgentEvents,
    CancelAgent,
    PauseAgent,
    ResumeAgent,
}

impl ToolKind {
    pub const ALL: [ToolKind; 14] = [
        ToolKind::ReadFile,
        ToolKind::WriteFile,
        ToolKind::DeleteFile,
        ToolKind::ListDir,
        ToolKind::GlobSearch,
        ToolKind::GrepSearch,
        ToolKind::RunCommand,
        ToolKind::SpawnAgent,
        ToolKind::WaitForAgent,
        ToolKind::SendAgentMessage,
        ToolKind::CaptureAgentEvents,
        ToolKind::CancelAgent,
        ToolKind::PauseAgent,
        ToolKind::ResumeAgent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::DeleteFile => "delete_file",
            Self::ListDir => "list_dir",
            Self::GlobSearch => "glob_search",
            Self::GrepSearch => "grep_search",
            Self::RunCommand => "run_command",
            Self::SpawnAgent => "spawn_agent",
            Self::WaitForAgent => "wait_for_agent",
            Self::SendAgentMessage => "send_agent_message",
            Self::CaptureAgentEvents => "capture_agent_events",
            Self::CancelAgent => "cancel_agent",
            Self::PauseAgent => "pause_agent",
            Self::ResumeAgent => "resume_agent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Capability the workspace must grant for this tool to appear in the
    /// manifest at all.
    pub fn required_capability(self) -> Capability {
        match self {
            Self::ReadFile | Self::ListDir | Self::GlobSearch | Self::GrepSearch => {
                Capability::Read
            }
            Self::WriteFile => Capability::Write,
            Self::DeleteFile => Capability::Delete,
            Self::RunCommand => Capability::Shell,
            Self::SpawnAgent
            | Self::WaitForAgent
            | Self::SendAgentMessage
            | Self::CaptureAgentEvents
            | Self::CancelAgent
            | Self::PauseAgent
            | Self::ResumeAgent => Capability::Control,
        }
    }

    /// Whether the operation suspends on human approval before running.
    /// Every delete and every shell command does, regardless of the
    /// workspace's permission flags.
    pub fn requires_approval(self) -> bool {
        matches!(self, Self::DeleteFile | Self::RunCommand)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ReadFile => "Read a file from the workspace (size-capped)",
            Self::WriteFile => "Create or overwrite a file in the workspace",
            Self::DeleteFile => "Delete a file or directory in the workspace (requires approval)",
            Self::ListDir => "List the entries of a workspace directory",
            Self::GlobSearch => {
                "Find files by glob pattern (*, **, ?, {a,b}); results sorted by modification time"
            }
            Self::GrepSearch => "Search file contents below a directory with a regex",
            Self::RunCommand => "Run a shell command in the workspace (requires approval)",
            Self::SpawnAgent => "Spawn a sub-agent task to work on a delegated prompt",
            Self::WaitForAgent => "Block until a spawned sub-agent task finishes or a timeout elapses",
            Self::SendAgentMessage => "Deliver a message into a spawned sub-agent task",
            Self::CaptureAgentEvents => "Fetch the most recent timeline events of a spawned sub-agent task",
            Self::CancelAgent => "Cancel a spawned sub-agent task",
            Self::PauseAgent => "Pause a spawned sub-agent task",
            Self::ResumeAgent => "Resume a paused sub-agent task",
        }
    }

    /// Structural description of the accepted input fields, exposed in the
    /// tool manifest for the model to form calls.
    pub fn input_schema(self) -> Value {
        match self {
            Self::ReadFile => json!({
                "type": "object",
                "required": ["path"],
                "properties": {
                    "path": {"type": "string", "description": "Workspace-relative or absolute path"},
                    "max_bytes": {"type": "integer", "description": "Optional read ceiling; clamped to the workspace limit"}
                }
            }),
            Self::WriteFile => json!({
                "type": "object",
                "required": ["path", "content"],
                "properties": {
                    "path": {"type": "string"},
                    "content": {"type": "string"}
                }
            }),
            Self::DeleteFile => json!({
                "type": "object",
                "required": ["path"],
                "properties": {
                    "path": {"type": "string"},
                    "recursive": {"type": "boolean", "description": "Required to delete a non-empty directory"}
                }
            }),
            Self::ListDir => json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Defaults to the workspace root"}
                }
            }),
            Self::GlobSearch => json!({
                "type": "object",
                "required": ["pattern"],
                "properties": {
                    "pattern": {"type": "string", "description": "Glob supporting *, **, ?, {a,b}"},
                    "path": {"type": "string", "description": "Directory to scan; defaults to the workspace root"},
                    "max_results": {"type": "integer"}
                }
            }),
            Self::GrepSearch => json!({
                "type": "object",
                "required": ["pattern"],
                "properties": {
                    "pattern": {"type": "string", "description": "Regex matched per line"},
                    "path": {"type": "string", "description": "Directory to search; defaults to the workspace root"},
                    "case_sensitive": {"type": "boolean"}
                }
            }),
            Self::RunCommand => json!({
                "type": "object",
                "required": ["command"],
                "properties": {
                    "command": {"type": "string", "description": "Command line, split with shell quoting rules"},
                    "working_dir": {"type": "string"},
                    "timeout_secs": {"type": "integer", "description": "Clamped to the hard maximum"},
                    "env": {"type": "object", "description": "Extra environment variables for the child"}
                }
            }),
            Self::SpawnAgent => json!({
                "type": "object",
                "required": ["prompt"],
                "properties": {
                    "prompt": {"type": "string", "description": "Task description for the sub-agent"},
                    "title": {"type": "string"},
                    "agent_type": {"type": "string", "description": "e.g. \"general\", \"explore\""}
                }
            }),
            Self::WaitForAgent => json!({
                "type": "object",
                "required": ["task_id"],
                "properties": {
                    "task_id": {"type": "string"},
                    "timeout_seconds": {"type": "integer"}
                }
            }),
            Self::SendAgentMessage => json!({
                "type": "object",
                "required": ["task_id", "message"],
                "properties": {
                    "task_id": {"type": "string"},
                    "message": {"type": "string"}
                }
            }),
            Self::CaptureAgentEvents => json!({
                "type": "object",
                "required": ["task_id"],
                "properties": {
                    "task_id": {"type": "string"},
                    "limit": {"type": "integer", "description": "Most recent events to return"}
                }
            }),
            Self::CancelAgent | Self::PauseAgent | Self::ResumeAgent => json!({
                "type": "object",
                "required": ["task_id"],
                "properties": {
                    "task_id": {"type": "string"}
                }
            }),
        }
    }
}
