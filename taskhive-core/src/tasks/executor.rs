//! Live executor handles.
//!
//! An [`ExecutorHandle`] is the in-memory control surface for a running
//! task: a cancellation token, a pause gate, and a message inbox. Handles
//! are ephemeral by design — they exist only while the process hosting the
//! executor is alive. After a restart the task record survives in the graph
//! but control calls that need the executor fail with `NO_EXECUTOR`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Control side of a live executor, held by the orchestrator.
pub struct ExecutorHandle {
    cancel: CancellationToken,
    pause: watch::Sender<bool>,
    messages: mpsc::UnboundedSender<String>,
}

/// Signal side of a live executor, handed to the task driver.
pub struct ExecutorSignals {
    pub cancel: CancellationToken,
    pause: watch::Receiver<bool>,
    pub messages: mpsc::UnboundedReceiver<String>,
}

impl ExecutorHandle {
    /// Creates the paired control handle and driver signals.
    pub fn create() -> (Arc<Self>, ExecutorSignals) {
        let cancel = CancellationToken::new();
        let (pause_tx, pause_rx) = watch::channel(false);
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let handle = Arc::new(Self {
            cancel: cancel.clone(),
            pause: pause_tx,
            messages: message_tx,
        });
        let signals = ExecutorSignals {
            cancel,
            pause: pause_rx,
            messages: message_rx,
        };
        (handle, signals)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn trigger_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn pause(&self) {
        self.pause.send_replace(true);
    }

    pub fn resume(&self) {
        self.pause.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.pause.borrow()
    }

    /// Delivers an asynchronous message into the driver's inbox. Returns
    /// false when the driver already hung up.
    pub fn deliver_message(&self, text: impl Into<String>) -> bool {
        self.messages.send(text.into()).is_ok()
    }
}

impl ExecutorSignals {
    /// Safe suspension point for drivers: completes immediately while
    /// unpaused, otherwise waits until the pause gate reopens.
    pub async fn pause_point(&mut self) {
        while *self.pause.borrow() {
            if self.pause.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Registry of live executor handles, keyed by task id.
pub struct ExecutorRegistry {
    handles: Mutex<HashMap<String, Arc<ExecutorHandle>>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, task_id: &str, handle: Arc<ExecutorHandle>) {
        self.handles.lock().insert(task_id.to_string(), handle);
    }

    pub fn get(&self, task_id: &str) -> Option<Arc<ExecutorHandle>> {
        self.handles.lock().get(task_id).cloned()
    }

    /// Drops the handle once the task reaches a terminal state.
    pub fn evict(&self, task_id: &str) {
        self.handles.lock().remove(task_id);
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
