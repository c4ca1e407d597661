//! Human approval gate.
//!
//! A gated tool call suspends on an opened request until an operator accepts
//! or denies it, or the gate's decision timeout elapses. Every request has
//! exactly one terminal resolution: resolving removes the entry, so a second
//! attempt fails instead of flipping the recorded outcome. Cancelling a task
//! bulk-denies its pending requests so no suspended tool body can complete
//! afterwards.

use crate::error::RuntimeError;
use crate::events::EventLog;
use crate::tasks::graph::TaskGraph;
use crate::tasks::status::TaskStatus;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use taskhive_exec_events::EventPayload;
use tokio::sync::oneshot;
use uuid::Uuid;

/// A request waiting on an operator decision.
#[derive(Debug, Clone, Serialize)]
pub struct PendingApproval {
    pub id: Uuid,
    pub task_id: String,
    pub kind: String,
    pub summary: String,
    pub details: Value,
}

struct PendingEntry {
    info: PendingApproval,
    sender: oneshot::Sender<bool>,
}

/// Per-task request/response channel for human sign-off.
pub struct ApprovalGate {
    pending: Mutex<HashMap<Uuid, PendingEntry>>,
    decision_timeout: Option<Duration>,
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            decision_timeout: None,
        }
    }

    /// A gate whose unresolved requests are denied after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            decision_timeout: Some(timeout),
        }
    }

    /// Opens a request and returns its descriptor plus the receiver the
    /// caller suspends on.
    pub fn open(
        &self,
        task_id: &str,
        kind: &str,
        summary: &str,
        details: Value,
    ) -> (PendingApproval, oneshot::Receiver<bool>) {
        let info = PendingApproval {
            id: Uuid::new_v4(),
            task_id: task_id.to_string(),
            kind: kind.to_string(),
            summary: summary.to_string(),
            details,
        };
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().insert(
            info.id,
            PendingEntry {
                info: info.clone(),
                sender,
            },
        );
        (info, receiver)
    }

    /// Records the single terminal resolution for a request.
    pub fn resolve(&self, id: Uuid, approved: bool) -> Result<(), RuntimeError> {
        let entry = self
            .pending
            .lock()
            .remove(&id)
            .ok_or_else(|| RuntimeError::ApprovalAlreadyResolved(id.to_string()))?;
        // The waiter may have timed out and dropped its receiver; the
        // resolution still counts as consumed.
        let _ = entry.sender.send(approved);
        Ok(())
    }

    /// Denies every pending request owned by `task_id`. Returns how many
    /// requests were denied.
    pub fn deny_all_for_task(&self, task_id: &str) -> usize {
        let mut guard = self.pending.lock();
        let ids: Vec<Uuid> = guard
            .iter()
            .filter(|(_, entry)| entry.info.task_id == task_id)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(entry) = guard.remove(id) {
                let _ = entry.sender.send(false);
            }
        }
        ids.len()
    }

    /// Snapshot of all pending requests, for operator surfaces.
    pub fn pending(&self) -> Vec<PendingApproval> {
        self.pending.lock().values().map(|e| e.info.clone()).collect()
    }

    /// Awaits the decision for an open request. A timeout or a dropped
    /// sender counts as denial; on timeout the entry is removed so a late
    /// resolution fails rather than flipping anything.
    pub async fn wait_decision(&self, id: Uuid, receiver: oneshot::Receiver<bool>) -> bool {
        match self.decision_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, receiver).await {
                Ok(decision) => decision.unwrap_or(false),
                Err(_elapsed) => {
                    self.pending.lock().remove(&id);
                    false
                }
            },
            None => receiver.await.unwrap_or(false),
        }
    }
}

impl Default for ApprovalGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Approval capability handed to tool bodies and connectors: bound to one
/// task, it runs the full request/suspend/record protocol.
#[derive(Clone)]
pub struct ApprovalScope {
    gate: Arc<ApprovalGate>,
    events: Arc<EventLog>,
    graph: Arc<TaskGraph>,
    task_id: String,
}

impl ApprovalScope {
    pub fn new(
        gate: Arc<ApprovalGate>,
        events: Arc<EventLog>,
        graph: Arc<TaskGraph>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            events,
            graph,
            task_id: task_id.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Suspends until the operator decides. While suspended the owning task
    /// is `blocked`; it returns to `executing` on approval. Denial (explicit,
    /// timed out, or forced by cancellation) yields `APPROVAL_DENIED` and the
    /// gated operation must not run.
    pub async fn require_approval(
        &self,
        kind: &str,
        summary: &str,
        details: Value,
    ) -> Result<(), RuntimeError> {
        let (info, receiver) = self.gate.open(&self.task_id, kind, summary, details);
        self.events.append(
            &self.task_id,
            EventPayload::ApprovalRequested {
                approval_id: info.id,
                kind: kind.to_string(),
                summary: summary.to_string(),
            },
        );
        let was_executing = self
            .graph
            .transition(&self.events, &self.task_id, TaskStatus::Blocked)
            .is_ok();

        let approved = self.gate.wait_decision(info.id, receiver).await;

        self.events.append(
            &self.task_id,
            EventPayload::ApprovalResolved {
                approval_id: info.id,
                approved,
            },
        );
        if was_executing {
            // Only unblock if nothing else (cancellation) moved the task on.
            let _ = self
                .graph
                .transition(&self.events, &self.task_id, TaskStatus::Executing);
        }

        if approved {
            Ok(())
        } else {
            Err(RuntimeError::ApprovalDenied(summary.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn approved_request_unblocks_the_waiter() {
        let gate = Arc::new(ApprovalGate::new());
        let (info, receiver) = gate.open("t1", "shell", "run ls", json!({}));
        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait_decision(info.id, receiver).await })
        };
        gate.resolve(info.id, true).expect("resolve");
        assert!(waiter.await.expect("join"));
    }

    #[tokio::test]
    async fn second_resolution_is_rejected() {
        let gate = ApprovalGate::new();
        let (info, _receiver) = gate.open("t1", "delete", "rm file", json!({}));
        gate.resolve(info.id, false).expect("first resolve");
        let err = gate.resolve(info.id, true).expect_err("second resolve");
        assert_eq!(err.code(), "APPROVAL_ALREADY_RESOLVED");
    }

    #[tokio::test]
    async fn deny_all_for_task_denies_only_that_task() {
        let gate = Arc::new(ApprovalGate::new());
        let (a, rx_a) = gate.open("t1", "shell", "one", json!({}));
        let (_b, _rx_b) = gate.open("t2", "shell", "two", json!({}));
        let denied = gate.deny_all_for_task("t1");
        assert_eq!(denied, 1);
        assert!(!gate.wait_decision(a.id, rx_a).await);
        assert_eq!(gate.pending().len(), 1);
    }

    #[tokio::test]
    async fn timeout_counts_as_denial_and_consumes_the_request() {
        let gate = ApprovalGate::with_timeout(Duration::from_millis(20));
        let (info, receiver) = gate.open("t1", "shell", "slow", json!({}));
        assert!(!gate.wait_decision(info.id, receiver).await);
        let err = gate.resolve(info.id, true).expect_err("late resolve");
        assert_eq!(err.code(), "APPROVAL_ALREADY_RESOLVED");
    }
}
