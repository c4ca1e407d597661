//! Structured task timeline events shared across taskhive crates.
//!
//! This crate exposes the serialized schema for task lifecycle updates, tool
//! invocations, approval decisions, and other timeline artifacts recorded by
//! the execution runtime. Downstream applications can deserialize these
//! structures to drive dashboards, transcripts, or auditing pipelines without
//! depending on the full `taskhive-core` crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Semantic version of the serialized event schema exported by this crate.
pub const EVENT_SCHEMA_VERSION: &str = "0.2.0";

/// A single entry in a task's append-only timeline.
///
/// Events are ordered by `timestamp`; the runtime guarantees append order per
/// task, so the sequence read back is the canonical history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskEvent {
    /// Unique identifier for this event.
    pub id: Uuid,
    /// Identifier of the task this event belongs to.
    pub task_id: String,
    /// RFC 3339 timestamp at which the event was appended.
    pub timestamp: DateTime<Utc>,
    /// Typed payload describing what happened.
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl TaskEvent {
    /// Creates a new event for `task_id` stamped with the current time.
    pub fn now(task_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task_id.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Reduces the event to the compact shape served by event capture:
    /// timestamp, type tag, and a short type-specific summary.
    pub fn capture(&self) -> CapturedEvent {
        CapturedEvent {
            timestamp: self.timestamp,
            event_type: self.payload.event_type().to_string(),
            summary: self.payload.summary(),
        }
    }
}

/// Compact event rendering returned to controlling agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Timestamp of the underlying event.
    pub timestamp: DateTime<Utc>,
    /// Type tag of the underlying event.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Short, type-specific rendering of the payload.
    pub summary: String,
}

/// Typed payloads recorded on a task timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A tool dispatch began.
    ToolCall {
        /// Name of the invoked tool.
        tool: String,
        /// Input payload passed to the tool.
        input: Value,
    },
    /// A tool dispatch finished, successfully or not.
    ToolResult {
        /// Name of the invoked tool.
        tool: String,
        /// Result payload on success.
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Error message on failure.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A gated operation is waiting on a human decision.
    ApprovalRequested {
        /// Opaque identifier of the approval request.
        approval_id: Uuid,
        /// Kind tag of the gated operation.
        kind: String,
        /// Human-readable summary shown to the operator.
        summary: String,
    },
    /// A pending approval reached its single terminal resolution.
    ApprovalResolved {
        /// Opaque identifier of the approval request.
        approval_id: Uuid,
        /// Whether the operator accepted the request.
        approved: bool,
    },
    /// The task moved to a new lifecycle status.
    StatusChanged {
        /// Status before the transition.
        from: String,
        /// Status after the transition.
        to: String,
    },
    /// A message produced by or delivered to the task's agent.
    AgentMessage {
        /// Textual content of the message.
        text: String,
    },
    /// A file inside the workspace was created, modified, or deleted.
    FileChange {
        /// Workspace-relative path of the affected file.
        path: String,
        /// Kind of change applied.
        kind: FileChangeKind,
    },
    /// A child task was spawned by this task.
    TaskSpawned {
        /// Identifier of the new child task.
        child_id: String,
        /// Agent type tag the child was created with.
        agent_type: String,
    },
    /// A step of the task's execution failed non-fatally.
    StepFailed {
        /// Human-readable failure description.
        message: String,
    },
}

impl EventPayload {
    /// Returns the stable type tag used in the serialized form.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::ApprovalRequested { .. } => "approval_requested",
            Self::ApprovalResolved { .. } => "approval_resolved",
            Self::StatusChanged { .. } => "status_changed",
            Self::AgentMessage { .. } => "agent_message",
            Self::FileChange { .. } => "file_change",
            Self::TaskSpawned { .. } => "task_spawned",
            Self::StepFailed { .. } => "step_failed",
        }
    }

    /// Renders a short, type-specific summary of the payload.
    pub fn summary(&self) -> String {
        match self {
            Self::ToolCall { tool, .. } => format!("call {tool}"),
            Self::ToolResult {
                tool,
                error: Some(error),
                ..
            } => format!("{tool} failed: {error}"),
            Self::ToolResult { tool, .. } => format!("{tool} ok"),
            Self::ApprovalRequested { kind, summary, .. } => {
                format!("awaiting approval ({kind}): {summary}")
            }
            Self::ApprovalResolved { approved: true, .. } => "approval granted".to_string(),
            Self::ApprovalResolved { .. } => "approval denied".to_string(),
            Self::StatusChanged { from, to } => format!("{from} -> {to}"),
            Self::AgentMessage { text } => truncate_summary(text),
            Self::FileChange { path, kind } => format!("{} {path}", kind.verb()),
            Self::TaskSpawned {
                child_id,
                agent_type,
            } => format!("spawned {agent_type} task {child_id}"),
            Self::StepFailed { message } => truncate_summary(message),
        }
    }
}

/// Kind of change applied to a workspace file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileChangeKind {
    /// A new file was created.
    Added,
    /// An existing file's contents were replaced or edited.
    Modified,
    /// A file was removed.
    Deleted,
}

impl FileChangeKind {
    fn verb(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

const SUMMARY_MAX_CHARS: usize = 120;

fn truncate_summary(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SUMMARY_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Wraps a [`TaskEvent`] with schema metadata so downstream consumers can
/// negotiate compatibility before processing an event stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionedTaskEvent {
    /// Semantic version describing the schema of the nested event payload.
    pub schema_version: String,
    /// Concrete event emitted by the runtime.
    pub event: TaskEvent,
}

impl VersionedTaskEvent {
    /// Creates a new [`VersionedTaskEvent`] using the current
    /// [`EVENT_SCHEMA_VERSION`].
    pub fn new(event: TaskEvent) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION.to_string(),
            event,
        }
    }

    /// Returns the nested [`TaskEvent`], consuming the wrapper.
    pub fn into_event(self) -> TaskEvent {
        self.event
    }
}

impl From<TaskEvent> for VersionedTaskEvent {
    fn from(event: TaskEvent) -> Self {
        Self::new(event)
    }
}

/// Sink for processing [`TaskEvent`] instances.
pub trait EventEmitter {
    /// Invoked for each event appended by the runtime.
    fn emit(&mut self, event: &TaskEvent);
}

impl<F> EventEmitter for F
where
    F: FnMut(&TaskEvent),
{
    fn emit(&mut self, event: &TaskEvent) {
        self(event);
    }
}

/// JSON helper utilities for serializing and deserializing task events.
#[cfg(feature = "serde-json")]
pub mod json {
    use super::{TaskEvent, VersionedTaskEvent};

    /// Converts an event into a `serde_json::Value`.
    pub fn to_value(event: &TaskEvent) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(event)
    }

    /// Serializes an event into a JSON string.
    pub fn to_string(event: &TaskEvent) -> serde_json::Result<String> {
        serde_json::to_string(event)
    }

    /// Deserializes an event from a JSON string.
    pub fn from_str(payload: &str) -> serde_json::Result<TaskEvent> {
        serde_json::from_str(payload)
    }

    /// Serializes a [`VersionedTaskEvent`] wrapper.
    pub fn versioned_to_string(event: &TaskEvent) -> serde_json::Result<String> {
        serde_json::to_string(&VersionedTaskEvent::new(event.clone()))
    }

    /// Deserializes a [`VersionedTaskEvent`] wrapper.
    pub fn versioned_from_str(payload: &str) -> serde_json::Result<VersionedTaskEvent> {
        serde_json::from_str(payload)
    }
}

#[cfg(feature = "telemetry-tracing")]
mod tracing_support {
    use tracing::Level;

    use super::{EventEmitter, TaskEvent, VersionedTaskEvent, EVENT_SCHEMA_VERSION};

    /// Emits structured events as `tracing` events at the specified level.
    #[derive(Debug, Clone)]
    pub struct TracingEmitter {
        level: Level,
    }

    impl TracingEmitter {
        /// Creates a new [`TracingEmitter`] with the provided [`Level`].
        pub fn new(level: Level) -> Self {
            Self { level }
        }
    }

    impl Default for TracingEmitter {
        fn default() -> Self {
            Self { level: Level::INFO }
        }
    }

    impl EventEmitter for TracingEmitter {
        fn emit(&mut self, event: &TaskEvent) {
            macro_rules! emit_at {
                ($level:expr) => {
                    tracing::event!(
                        target: "taskhive_exec_events",
                        $level,
                        schema_version = EVENT_SCHEMA_VERSION,
                        event = ?VersionedTaskEvent::new(event.clone()),
                        "taskhive_exec_event"
                    )
                };
            }
            match self.level {
                Level::TRACE => emit_at!(Level::TRACE),
                Level::DEBUG => emit_at!(Level::DEBUG),
                Level::INFO => emit_at!(Level::INFO),
                Level::WARN => emit_at!(Level::WARN),
                Level::ERROR => emit_at!(Level::ERROR),
            }
        }
    }
}

#[cfg(feature = "telemetry-tracing")]
pub use tracing_support::TracingEmitter;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn tool_call_round_trips_through_json() {
        let event = TaskEvent::now(
            "task-1",
            EventPayload::ToolCall {
                tool: "read_file".to_string(),
                input: json!({"path": "src/lib.rs"}),
            },
        );

        let serialized = serde_json::to_string(&event).expect("serialize");
        let parsed: TaskEvent = serde_json::from_str(&serialized).expect("deserialize");
        assert_eq!(parsed, event);
    }

    #[test]
    fn serialized_form_uses_snake_case_type_tags() {
        let event = TaskEvent::now(
            "task-1",
            EventPayload::StatusChanged {
                from: "executing".to_string(),
                to: "paused".to_string(),
            },
        );

        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["type"], "status_changed");
        assert_eq!(value["task_id"], "task-1");
    }

    #[test]
    fn capture_reduces_to_timestamp_type_summary() {
        let event = TaskEvent::now(
            "task-9",
            EventPayload::FileChange {
                path: "notes/todo.md".to_string(),
                kind: FileChangeKind::Deleted,
            },
        );

        let captured = event.capture();
        assert_eq!(captured.event_type, "file_change");
        assert_eq!(captured.summary, "deleted notes/todo.md");
        assert_eq!(captured.timestamp, event.timestamp);
    }

    #[test]
    fn agent_message_summary_is_truncated() {
        let long = "x".repeat(500);
        let payload = EventPayload::AgentMessage { text: long };
        let summary = payload.summary();
        assert!(summary.chars().count() <= SUMMARY_MAX_CHARS + 1);
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn failed_tool_result_summary_names_the_error() {
        let payload = EventPayload::ToolResult {
            tool: "run_command".to_string(),
            result: None,
            error: Some("user denied".to_string()),
        };
        assert_eq!(payload.summary(), "run_command failed: user denied");
    }

    #[test]
    fn versioned_wrapper_carries_schema_version() {
        let event = TaskEvent::now(
            "task-2",
            EventPayload::AgentMessage {
                text: "hello".to_string(),
            },
        );
        let wrapped = VersionedTaskEvent::new(event.clone());
        assert_eq!(wrapped.schema_version, EVENT_SCHEMA_VERSION);
        assert_eq!(wrapped.into_event(), event);
    }
}
