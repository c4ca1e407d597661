//! The orchestrator composes the task graph, state machine, executor
//! handles, and event log into the control surface sub-agent tools call.
//!
//! Every control operation resolves the target task by id and then checks
//! ancestry: the caller must have spawned the target, directly or
//! transitively. A non-ancestor gets `FORBIDDEN` and nothing is mutated —
//! the same property a process-group signal model gives an OS scheduler.

use crate::context::RuntimeContext;
use crate::error::RuntimeError;
use crate::tasks::executor::{ExecutorHandle, ExecutorSignals};
use crate::tasks::graph::Task;
use crate::tasks::status::TaskStatus;
use crate::workspace::Workspace;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use taskhive_exec_events::{CapturedEvent, EventPayload};
use tracing::{debug, warn};

/// Floor applied to `wait_for` timeouts.
pub const MIN_WAIT: Duration = Duration::from_secs(1);
/// Timeout used when the caller does not supply one.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(300);
/// Ceiling applied to `wait_for` timeouts.
pub const MAX_WAIT: Duration = Duration::from_secs(1800);

/// Parameters for spawning a task.
#[derive(Debug, Clone)]
pub struct SpawnParams {
    pub title: String,
    pub prompt: String,
    pub agent_type: String,
}

impl SpawnParams {
    pub fn new(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            agent_type: "general".to_string(),
        }
    }

    pub fn with_agent_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = agent_type.into();
        self
    }
}

/// Outcome of a `wait_for` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WaitOutcome {
    /// The target reached a terminal status.
    Finished { status: TaskStatus },
    /// The clamped timeout elapsed first.
    TimedOut,
    /// The caller itself was cancelled while waiting.
    CallerCancelled,
}

/// The model loop driving a task. The runtime does not implement planning;
/// embedders inject a driver and the orchestrator runs it to completion
/// under the task's executor signals.
#[async_trait]
pub trait TaskDriver: Send + Sync {
    async fn run(&self, task: Task, signals: ExecutorSignals) -> anyhow::Result<Value>;
}

/// [`TaskDriver`] built from a closure, mainly for tests and scripted runs.
pub struct ClosureDriver {
    #[allow(clippy::type_complexity)]
    f: Box<
        dyn Fn(
                Task,
                ExecutorSignals,
            )
                -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>
            + Send
            + Sync,
    >,
}

impl ClosureDriver {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Task, ExecutorSignals) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>
            + Send
            + Sync
            + 'static,
    {
        Self { f: Box::new(f) }
    }
}

#[async_trait]
impl TaskDriver for ClosureDriver {
    async fn run(&self, task: Task, signals: ExecutorSignals) -> anyhow::Result<Value> {
        (self.f)(task, signals).await
    }
}

pub struct Orchestrator {
    ctx: RuntimeContext,
    driver: OnceCell<Arc<dyn TaskDriver>>,
    /// Workspaces materialized for tasks spawned from an ephemeral
    /// workspace, keyed by task id.
    materialized: Mutex<HashMap<String, Workspace>>,
}

impl Orchestrator {
    pub fn new(ctx: RuntimeContext) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            driver: OnceCell::new(),
            materialized: Mutex::new(HashMap::new()),
        })
    }

    /// Installs the task driver. May be called once; later calls are
    /// ignored.
    pub fn set_driver(&self, driver: Arc<dyn TaskDriver>) {
        let _ = self.driver.set(driver);
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.ctx
    }

    /// The workspace a task operates in: its materialized workspace if one
    /// exists, otherwise the shared workspace's current state.
    pub fn workspace_for(&self, task_id: &str) -> Workspace {
        if let Some(workspace) = self.materialized.lock().get(task_id) {
            return workspace.clone();
        }
        self.ctx.workspace_snapshot()
    }

    /// Creates and launches a root task (depth 0).
    pub fn spawn_root(self: &Arc<Self>, params: SpawnParams) -> Result<Task, RuntimeError> {
        let workspace = self.ctx.workspace_snapshot();
        let task = self.ctx.graph.create_root(
            &params.title,
            &params.prompt,
            &workspace.id,
            &params.agent_type,
        );
        self.remember_materialized(&task.id, workspace);
        self.launch(task.clone())?;
        Ok(task)
    }

    /// Creates and launches a child of `parent_id`.
    pub fn spawn_child(
        self: &Arc<Self>,
        parent_id: &str,
        params: SpawnParams,
    ) -> Result<Task, RuntimeError> {
        let workspace = self.ctx.workspace_snapshot();
        let task = self.ctx.graph.create_child(
            parent_id,
            &params.title,
            &params.prompt,
            &workspace.id,
            &params.agent_type,
        )?;
        self.remember_materialized(&task.id, workspace);
        self.ctx.events.append(
            parent_id,
            EventPayload::TaskSpawned {
                child_id: task.id.clone(),
                agent_type: task.agent_type.clone(),
            },
        );
        self.launch(task.clone())?;
        Ok(task)
    }

    /// Materializes a dedicated workspace for a task spawned from a
    /// shared/ephemeral workspace. Non-ephemeral workspaces are used as-is.
    fn remember_materialized(&self, task_id: &str, source: Workspace) {
        if !source.ephemeral {
            return;
        }
        match source.materialize_for_task(task_id) {
            Ok(workspace) => {
                self.materialized.lock().insert(task_id.to_string(), workspace);
            }
            Err(error) => {
                warn!(task_id, %error, "failed to materialize task workspace");
            }
        }
    }

    /// Registers an executor handle and runs the driver on a fresh tokio
    /// task. Terminal bookkeeping happens here regardless of how the run
    /// ends.
    fn launch(self: &Arc<Self>, task: Task) -> Result<(), RuntimeError> {
        let driver = self
            .driver
            .get()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no task driver configured"))?;
        let (handle, signals) = ExecutorHandle::create();
        self.ctx.executors.register(&task.id, handle.clone());
        self.ctx
            .graph
            .transition(&self.ctx.events, &task.id, TaskStatus::Executing)?;

        let orchestrator = Arc::clone(self);
        let task_id = task.id.clone();
        tokio::spawn(async move {
            let cancel = signals.cancel.clone();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                result = driver.run(task, signals) => Some(result),
            };
            match outcome {
                Some(Ok(_value)) => {
                    let _ = orchestrator.ctx.graph.transition(
                        &orchestrator.ctx.events,
                        &task_id,
                        TaskStatus::Completed,
                    );
                }
                Some(Err(error)) => {
                    orchestrator.ctx.events.append(
                        &task_id,
                        EventPayload::StepFailed {
                            message: error.to_string(),
                        },
                    );
                    let _ = orchestrator.ctx.graph.transition(
                        &orchestrator.ctx.events,
                        &task_id,
                        TaskStatus::Failed,
                    );
                }
                // Cancellation already performed the status transition and
                // denied pending approvals.
                None => debug!(%task_id, "task cancelled"),
            }
            orchestrator.ctx.executors.evict(&task_id);
        });
        Ok(())
    }

    /// Cancels a descendant: flips status first so new tool calls are
    /// rejected, then denies pending approvals, then fires the cancellation
    /// token. Children of the target keep running; cancellation is always
    /// an explicit act, never a cascade.
    pub fn cancel(&self, caller_id: &str, target_id: &str) -> Result<(), RuntimeError> {
        let target = self.ctx.graph.authorize(caller_id, target_id)?;
        if target.status.is_terminal() {
            return Err(RuntimeError::TaskAlreadyFinished(target_id.to_string()));
        }
        self.ctx
            .graph
            .transition(&self.ctx.events, target_id, TaskStatus::Cancelled)?;
        self.ctx.approvals.deny_all_for_task(target_id);
        if let Some(handle) = self.ctx.executors.get(target_id) {
            handle.trigger_cancel();
        }
        Ok(())
    }

    /// Pauses a descendant currently executing.
    pub fn pause(&self, caller_id: &str, target_id: &str) -> Result<(), RuntimeError> {
        let target = self.ctx.graph.authorize(caller_id, target_id)?;
        if target.status != TaskStatus::Executing {
            return Err(RuntimeError::TaskNotRunning(target_id.to_string()));
        }
        let handle = self
            .ctx
            .executors
            .get(target_id)
            .ok_or_else(|| RuntimeError::NoExecutor(target_id.to_string()))?;
        handle.pause();
        self.ctx
            .graph
            .transition(&self.ctx.events, target_id, TaskStatus::Paused)?;
        Ok(())
    }

    /// Resumes a paused descendant. With no live executor this fails with
    /// `NO_EXECUTOR` and leaves the status untouched; the runtime never
    /// resurrects executors on its own.
    pub fn resume(&self, caller_id: &str, target_id: &str) -> Result<(), RuntimeError> {
        let target = self.ctx.graph.authorize(caller_id, target_id)?;
        if target.status != TaskStatus::Paused {
            return Err(RuntimeError::TaskNotPaused(target_id.to_string()));
        }
        let handle = self
            .ctx
            .executors
            .get(target_id)
            .ok_or_else(|| RuntimeError::NoExecutor(target_id.to_string()))?;
        handle.resume();
        self.ctx
            .graph
            .transition(&self.ctx.events, target_id, TaskStatus::Executing)?;
        Ok(())
    }

    /// Delivers an asynchronous message into a descendant's running context.
    pub fn send_message(
        &self,
        caller_id: &str,
        target_id: &str,
        text: &str,
    ) -> Result<(), RuntimeError> {
        self.ctx.graph.authorize(caller_id, target_id)?;
        let handle = self
            .ctx
            .executors
            .get(target_id)
            .ok_or_else(|| RuntimeError::NoExecutor(target_id.to_string()))?;
        if !handle.deliver_message(text) {
            return Err(RuntimeError::NoExecutor(target_id.to_string()));
        }
        self.ctx.events.append(
            target_id,
            EventPayload::AgentMessage {
                text: text.to_string(),
            },
        );
        Ok(())
    }

    /// Blocks the caller until the target reaches a terminal status or the
    /// clamped timeout elapses. If the caller itself is cancelled while
    /// waiting, the wait is abandoned.
    pub async fn wait_for(
        &self,
        caller_id: &str,
        target_id: &str,
        timeout_secs: Option<u64>,
    ) -> Result<WaitOutcome, RuntimeError> {
        self.ctx.graph.authorize(caller_id, target_id)?;
        let timeout = timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_WAIT)
            .clamp(MIN_WAIT, MAX_WAIT);

        let mut receiver = self
            .ctx
            .graph
            .subscribe(target_id)
            .ok_or_else(|| RuntimeError::TaskNotFound(target_id.to_string()))?;
        let caller_cancel = self.ctx.executors.get(caller_id).map(|h| h.cancel_token());

        let current = *receiver.borrow();
        if current.is_terminal() {
            return Ok(WaitOutcome::Finished { status: current });
        }

        let until_terminal = async {
            loop {
                if receiver.changed().await.is_err() {
                    // Graph dropped the watcher; report the last seen status.
                    return *receiver.borrow();
                }
                let status = *receiver.borrow();
                if status.is_terminal() {
                    return status;
                }
            }
        };
        let caller_cancelled = async {
            match caller_cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            status = until_terminal => WaitOutcome::Finished { status },
            _ = caller_cancelled => WaitOutcome::CallerCancelled,
            _ = tokio::time::sleep(timeout) => WaitOutcome::TimedOut,
        };
        Ok(outcome)
    }

    /// The most recent `limit` events for a descendant, reduced to
    /// `{timestamp, type, summary}`.
    pub fn capture_events(
        &self,
        caller_id: &str,
        target_id: &str,
        limit: usize,
    ) -> Result<Vec<CapturedEvent>, RuntimeError> {
        self.ctx.graph.authorize(caller_id, target_id)?;
        Ok(self.ctx.events.recent(target_id, limit))
    }
}
