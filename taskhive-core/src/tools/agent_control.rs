//! Hierarchical control tool bodies.
//!
//! These are thin adapters from tool inputs to orchestrator operations;
//! authorization (ancestry) and state-machine preconditions live in the
//! orchestrator itself.

use crate::error::RuntimeError;
use crate::tasks::orchestrator::{Orchestrator, SpawnParams};
use crate::tools::types::{
    AgentTargetInput, CaptureAgentEventsInput, SendAgentMessageInput, SpawnAgentInput,
    WaitForAgentInput,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn spawn_agent(
    orchestrator: &Arc<Orchestrator>,
    caller_id: &str,
    input: &SpawnAgentInput,
) -> Result<Value, RuntimeError> {
    let title = input
        .title
        .clone()
        .unwrap_or_else(|| summarize_prompt(&input.prompt));
    let mut params = SpawnParams::new(title, &input.prompt);
    if let Some(agent_type) = &input.agent_type {
        params = params.with_agent_type(agent_type);
    }
    let task = orchestrator.spawn_child(caller_id, params)?;
    Ok(json!({
        "success": true,
        "task_id": task.id,
        "title": task.title,
        "agent_type": task.agent_type,
        "depth": task.depth,
    }))
}

pub async fn wait_for_agent(
    orchestrator: &Orchestrator,
    caller_id: &str,
    input: &WaitForAgentInput,
) -> Result<Value, RuntimeError> {
    let outcome = orchestrator
        .wait_for(caller_id, &input.task_id, input.timeout_seconds)
        .await?;
    let mut value = serde_json::to_value(outcome).map_err(anyhow::Error::from)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("success".to_string(), json!(true));
        object.insert("task_id".to_string(), json!(input.task_id));
    }
    Ok(value)
}

pub fn send_agent_message(
    orchestrator: &Orchestrator,
    caller_id: &str,
    input: &SendAgentMessageInput,
) -> Result<Value, RuntimeError> {
    orchestrator.send_message(caller_id, &input.task_id, &input.message)?;
    Ok(json!({"success": true, "task_id": input.task_id}))
}

pub fn capture_agent_events(
    orchestrator: &Orchestrator,
    caller_id: &str,
    input: &CaptureAgentEventsInput,
) -> Result<Value, RuntimeError> {
    let events = orchestrator.capture_events(caller_id, &input.task_id, input.limit)?;
    Ok(json!({
        "success": true,
        "task_id": input.task_id,
        "events": events,
    }))
}

pub fn cancel_agent(
    orchestrator: &Orchestrator,
    caller_id: &str,
    input: &AgentTargetInput,
) -> Result<Value, RuntimeError> {
    orchestrator.cancel(caller_id, &input.task_id)?;
    Ok(json!({"success": true, "task_id": input.task_id}))
}

pub fn pause_agent(
    orchestrator: &Orchestrator,
    caller_id: &str,
    input: &AgentTargetInput,
) -> Result<Value, RuntimeError> {
    orchestrator.pause(caller_id, &input.task_id)?;
    Ok(json!({"success": true, "task_id": input.task_id}))
}

pub fn resume_agent(
    orchestrator: &Orchestrator,
    caller_id: &str,
    input: &AgentTargetInput,
) -> Result<Value, RuntimeError> {
    orchestrator.resume(caller_id, &input.task_id)?;
    Ok(json!({"success": true, "task_id": input.task_id}))
}

const TITLE_MAX_CHARS: usize = 60;

fn summarize_prompt(prompt: &str) -> String {
    let first_line = prompt.lines().next().unwrap_or_default();
    let mut chars = first_line.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
