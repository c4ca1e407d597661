//! The parent/child task graph.
//!
//! Tasks live in an arena keyed by id with explicit parent-id
//! back-references, so the graph can be mutated and inspected without any
//! pointer cycles. Ancestry is the authorization primitive for every
//! hierarchical control operation: a caller may act on a target only if the
//! caller spawned it, directly or transitively.

use crate::error::RuntimeError;
use crate::events::EventLog;
use crate::tasks::status::TaskStatus;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use taskhive_exec_events::EventPayload;
use tokio::sync::watch;
use uuid::Uuid;

/// Ceiling on sub-agent nesting. A spawn that would place the child deeper
/// than this fails with `DEPTH_LIMIT`.
pub const MAX_SPAWN_DEPTH: u32 = 8;

/// A unit of agent-driven work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub prompt: String,
    pub workspace_id: String,
    pub status: TaskStatus,
    pub parent_id: Option<String>,
    pub agent_type: String,
    /// Root tasks have depth 0; `depth == parent.depth + 1` otherwise.
    pub depth: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Arena of tasks plus per-task status watch channels.
pub struct TaskGraph {
    tasks: RwLock<HashMap<String, Task>>,
    watchers: Mutex<HashMap<String, watch::Sender<TaskStatus>>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a root task (depth 0, no parent).
    pub fn create_root(
        &self,
        title: &str,
        prompt: &str,
        workspace_id: &str,
        agent_type: &str,
    ) -> Task {
        let task = self.build_task(title, prompt, workspace_id, agent_type, None, 0);
        self.insert(task.clone());
        task
    }

    /// Creates a child of `parent_id`, enforcing the depth ceiling.
    pub fn create_child(
        &self,
        parent_id: &str,
        title: &str,
        prompt: &str,
        workspace_id: &str,
        agent_type: &str,
    ) -> Result<Task, RuntimeError> {
        let parent = self.get(parent_id)?;
        let depth = parent.depth + 1;
        if depth > MAX_SPAWN_DEPTH {
            return Err(RuntimeError::DepthLimit);
        }
        let task = self.build_task(
            title,
            prompt,
            workspace_id,
            agent_type,
            Some(parent.id),
            depth,
        );
        self.insert(task.clone());
        Ok(task)
    }

    fn build_task(
        &self,
        title: &str,
        prompt: &str,
        workspace_id: &str,
        agent_type: &str,
        parent_id: Option<String>,
        depth: u32,
    ) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            prompt: prompt.to_string(),
            workspace_id: workspace_id.to_string(),
            status: TaskStatus::Created,
            parent_id,
            agent_type: agent_type.to_string(),
            depth,
            created_at: now,
            updated_at: now,
        }
    }

    fn insert(&self, task: Task) {
        let (sender, _receiver) = watch::channel(task.status);
        self.watchers.lock().insert(task.id.clone(), sender);
        self.tasks.write().insert(task.id.clone(), task);
    }

    pub fn get(&self, id: &str) -> Result<Task, RuntimeError> {
        self.tasks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::TaskNotFound(id.to_string()))
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.read().values().cloned().collect()
    }

    /// Applies a validated status transition and notifies watchers. Returns
    /// the `(from, to)` pair on success.
    pub fn set_status(
        &self,
        id: &str,
        to: TaskStatus,
    ) -> Result<(TaskStatus, TaskStatus), RuntimeError> {
        let mut guard = self.tasks.write();
        let task = guard
            .get_mut(id)
            .ok_or_else(|| RuntimeError::TaskNotFound(id.to_string()))?;
        let from = task.status;
        if !from.can_transition_to(to) {
            return Err(RuntimeError::IllegalTransition {
                task_id: id.to_string(),
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        task.status = to;
        task.updated_at = Utc::now();
        drop(guard);

        if let Some(sender) = self.watchers.lock().get(id) {
            sender.send_replace(to);
        }
        Ok((from, to))
    }

    /// [`set_status`](Self::set_status) plus a `status_changed` event on the
    /// task's timeline.
    pub fn transition(
        &self,
        events: &EventLog,
        id: &str,
        to: TaskStatus,
    ) -> Result<(TaskStatus, TaskStatus), RuntimeError> {
        let (from, to) = self.set_status(id, to)?;
        events.append(
            id,
            EventPayload::StatusChanged {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            },
        );
        Ok((from, to))
    }

    /// True when `ancestor_id` appears in the parent chain of
    /// `descendant_id`. A task is not its own ancestor.
    pub fn is_ancestor(&self, ancestor_id: &str, descendant_id: &str) -> bool {
        let guard = self.tasks.read();
        let mut current = guard
            .get(descendant_id)
            .and_then(|task| task.parent_id.clone());
        while let Some(id) = current {
            if id == ancestor_id {
                return true;
            }
            current = guard.get(&id).and_then(|task| task.parent_id.clone());
        }
        false
    }

    /// Resolves `target_id` and verifies `caller_id` is one of its
    /// ancestors. Performs no mutation on failure.
    pub fn authorize(&self, caller_id: &str, target_id: &str) -> Result<Task, RuntimeError> {
        let target = self.get(target_id)?;
        if !self.is_ancestor(caller_id, target_id) {
            return Err(RuntimeError::Forbidden(target_id.to_string()));
        }
        Ok(target)
    }

    /// Watch channel over the task's status, for waiters.
    pub fn subscribe(&self, id: &str) -> Option<watch::Receiver<TaskStatus>> {
        self.watchers.lock().get(id).map(watch::Sender::subscribe)
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}
