//! Input types for the built-in tools.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct ReadFileInput {
    pub path: String,
    #[serde(default)]
    pub max_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileInput {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteFileInput {
    pub path: String,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListDirInput {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobSearchInput {
    pub pattern: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrepSearchInput {
    pub pattern: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunCommandInput {
    pub command: String,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpawnAgentInput {
    pub prompt: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub agent_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentTargetInput {
    pub task_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaitForAgentInput {
    pub task_id: String,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendAgentMessageInput {
    pub task_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureAgentEventsInput {
    pub task_id: String,
    #[serde(default = "default_event_limit")]
    pub limit: usize,
}

fn default_event_limit() -> usize {
    20
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn capture_events_limit_defaults() {
        let input: CaptureAgentEventsInput =
            serde_json::from_value(json!({"task_id": "t1"})).expect("parse");
        assert_eq!(input.limit, 20);
    }

    #[test]
    fn run_command_accepts_minimal_input() {
        let input: RunCommandInput =
            serde_json::from_value(json!({"command": "ls -la"})).expect("parse");
        assert_eq!(input.command, "ls -la");
        assert!(input.env.is_empty());
        assert!(input.working_dir.is_none());
    }
}
