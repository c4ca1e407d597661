//! Explicit runtime context.
//!
//! Instead of module-level singletons, every collaborator the runtime needs
//! is bundled into one cheaply-cloneable context constructed per workspace.
//! Tests build isolated contexts without any global reset.

use crate::approval::ApprovalGate;
use crate::events::EventLog;
use crate::tasks::executor::ExecutorRegistry;
use crate::tasks::graph::TaskGraph;
use crate::workspace::Workspace;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Clone)]
pub struct RuntimeContext {
    pub workspace: Arc<RwLock<Workspace>>,
    pub graph: Arc<TaskGraph>,
    pub events: Arc<EventLog>,
    pub approvals: Arc<ApprovalGate>,
    pub executors: Arc<ExecutorRegistry>,
}

impl RuntimeContext {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace: Arc::new(RwLock::new(workspace)),
            graph: Arc::new(TaskGraph::new()),
            events: Arc::new(EventLog::new()),
            approvals: Arc::new(ApprovalGate::new()),
            executors: Arc::new(ExecutorRegistry::new()),
        }
    }

    /// Replaces the default approval gate, e.g. with one carrying a decision
    /// timeout.
    pub fn with_approval_gate(mut self, gate: ApprovalGate) -> Self {
        self.approvals = Arc::new(gate);
        self
    }

    /// Snapshot of the current workspace state.
    pub fn workspace_snapshot(&self) -> Workspace {
        self.workspace.read().clone()
    }
}
