//! Scripted tool-call replay.
//!
//! Drives the registry end-to-end the way a model-driven task would: a root
//! task is spawned whose driver executes the scripted calls sequentially,
//! awaiting each result before issuing the next. Gated operations suspend
//! on the approval gate; the CLI either resolves them automatically or asks
//! on stdin.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;
use taskhive_core::{ClosureDriver, Orchestrator, SpawnParams, ToolRegistry};
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedCall {
    pub tool: String,
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoDecision {
    ApproveAll,
    DenyAll,
    Interactive,
}

/// Runs one tool call (given as `{"tool", "input"}`) and prints the result.
pub async fn run_single(
    orchestrator: &Arc<Orchestrator>,
    registry: &Arc<ToolRegistry>,
    call: Value,
) -> Result<()> {
    let call: ScriptedCall = serde_json::from_value(call).context("invalid scripted call")?;
    run_script(orchestrator, registry, vec![call], AutoDecision::ApproveAll).await
}

/// Spawns a root task whose driver replays `calls` in order, resolves
/// approvals per `policy`, and prints each result plus the task timeline.
pub async fn run_script(
    orchestrator: &Arc<Orchestrator>,
    registry: &Arc<ToolRegistry>,
    calls: Vec<ScriptedCall>,
    policy: AutoDecision,
) -> Result<()> {
    let driver_registry = Arc::clone(registry);
    let driver = ClosureDriver::new(move |task, _signals| {
        let registry = Arc::clone(&driver_registry);
        let calls = calls.clone();
        Box::pin(async move {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                let result = registry.execute(&call.tool, call.input, &task.id).await;
                println!("{}", serde_json::to_string_pretty(&result)?);
                results.push(result);
            }
            Ok(Value::Array(results))
        })
    });
    orchestrator.set_driver(Arc::new(driver));

    let resolver = spawn_approval_resolver(orchestrator, policy);
    let task = orchestrator.spawn_root(SpawnParams::new("replay", "scripted tool calls"))?;

    // The driver runs on its own tokio task; poll the graph until terminal.
    loop {
        let current = orchestrator.context().graph.get(&task.id)?;
        if current.status.is_terminal() {
            debug!(status = %current.status, "replay finished");
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    resolver.abort();

    for event in orchestrator.context().events.events_for(&task.id) {
        let captured = event.capture();
        eprintln!(
            "{} {:>18} {}",
            captured.timestamp.format("%H:%M:%S%.3f"),
            captured.event_type,
            captured.summary
        );
    }
    Ok(())
}

/// Resolves pending approvals in the background according to `policy`.
fn spawn_approval_resolver(
    orchestrator: &Arc<Orchestrator>,
    policy: AutoDecision,
) -> tokio::task::JoinHandle<()> {
    let approvals = Arc::clone(&orchestrator.context().approvals);
    tokio::spawn(async move {
        loop {
            for pending in approvals.pending() {
                let approved = match policy {
                    AutoDecision::ApproveAll => true,
                    AutoDecision::DenyAll => false,
                    AutoDecision::Interactive => ask_operator(&pending.summary),
                };
                let _ = approvals.resolve(pending.id, approved);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
}

fn ask_operator(summary: &str) -> bool {
    eprint!("approve `{summary}`? [y/N] ");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes")
}
