//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use taskhive_core::tasks::orchestrator::TaskDriver;
use taskhive_core::{
    ClosureDriver, Orchestrator, RuntimeContext, SpawnParams, Task, ToolRegistry, Workspace,
    WorkspacePermissions,
};

/// A workspace rooted in a fresh temp directory with the given permissions.
pub fn workspace(dir: &tempfile::TempDir, permissions: WorkspacePermissions) -> Workspace {
    Workspace::new("test-ws", dir.path()).with_permissions(permissions)
}

pub fn read_write_permissions() -> WorkspacePermissions {
    WorkspacePermissions {
        write: true,
        delete: true,
        ..WorkspacePermissions::default()
    }
}

pub fn shell_permissions() -> WorkspacePermissions {
    WorkspacePermissions {
        write: true,
        delete: true,
        shell: true,
        ..WorkspacePermissions::default()
    }
}

/// Driver whose behavior is selected by the task prompt:
/// - `"hang"`: stays alive until cancelled
/// - `"finish"`: completes immediately
/// - `"fail"`: errors immediately
/// - `"wait-inbox"`: completes with the first delivered message
/// - anything else: completes with null
pub fn scripted_driver() -> Arc<dyn TaskDriver> {
    Arc::new(ClosureDriver::new(|task, mut signals| {
        Box::pin(async move {
            match task.prompt.as_str() {
                "hang" => {
                    signals.cancel.cancelled().await;
                    Ok(json!(null))
                }
                "finish" => Ok(json!("done")),
                "fail" => Err(anyhow::anyhow!("driver exploded")),
                "wait-inbox" => {
                    let message = signals.messages.recv().await;
                    Ok(json!(message))
                }
                _ => Ok(json!(null)),
            }
        })
    }))
}

/// Orchestrator over a fresh context with the scripted driver installed.
pub fn orchestrator(ctx: RuntimeContext) -> Arc<Orchestrator> {
    let orchestrator = Orchestrator::new(ctx);
    orchestrator.set_driver(scripted_driver());
    orchestrator
}

/// Spawns a root task that stays executing until cancelled, giving tests a
/// live caller for registry and control calls.
pub fn spawn_hanging_root(orchestrator: &Arc<Orchestrator>) -> Task {
    orchestrator
        .spawn_root(SpawnParams::new("root", "hang"))
        .expect("spawn root")
}

/// Background resolver that decides every pending approval with `approve`.
pub fn auto_resolver(
    orchestrator: &Arc<Orchestrator>,
    approve: bool,
) -> tokio::task::JoinHandle<()> {
    let approvals = Arc::clone(&orchestrator.context().approvals);
    tokio::spawn(async move {
        loop {
            for pending in approvals.pending() {
                let _ = approvals.resolve(pending.id, approve);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
}

/// Polls until the task reaches a terminal status (bounded).
pub async fn wait_terminal(orchestrator: &Arc<Orchestrator>, task_id: &str) {
    for _ in 0..500 {
        let task = orchestrator
            .context()
            .graph
            .get(task_id)
            .expect("task exists");
        if task.status.is_terminal() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} never reached a terminal status");
}

/// Polls until the task reports the given status (bounded).
pub async fn wait_status(
    orchestrator: &Arc<Orchestrator>,
    task_id: &str,
    status: taskhive_core::TaskStatus,
) {
    for _ in 0..500 {
        let task = orchestrator
            .context()
            .graph
            .get(task_id)
            .expect("task exists");
        if task.status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} never reached {status}");
}

pub fn registry(orchestrator: &Arc<Orchestrator>) -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::new(Arc::clone(orchestrator)))
}
