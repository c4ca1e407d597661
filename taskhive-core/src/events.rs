//! Append-only event log.
//!
//! Events for a given task are appended in call order and read back in that
//! same order; nothing is ever re-ordered or retracted. The log is the
//! canonical history a human reviews to see why an action did or did not
//! happen, so denials and failures land here too.

use parking_lot::RwLock;
use std::collections::HashMap;
use taskhive_exec_events::{CapturedEvent, EventPayload, TaskEvent, TracingEmitter};

pub struct EventLog {
    inner: RwLock<HashMap<String, Vec<TaskEvent>>>,
    emitter: parking_lot::Mutex<TracingEmitter>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            emitter: parking_lot::Mutex::new(TracingEmitter::default()),
        }
    }

    /// Appends an event to the task's timeline and returns it.
    pub fn append(&self, task_id: &str, payload: EventPayload) -> TaskEvent {
        let event = TaskEvent::now(task_id, payload);
        {
            use taskhive_exec_events::EventEmitter;
            self.emitter.lock().emit(&event);
        }
        self.inner
            .write()
            .entry(task_id.to_string())
            .or_default()
            .push(event.clone());
        event
    }

    /// Full timeline for a task, oldest first.
    pub fn events_for(&self, task_id: &str) -> Vec<TaskEvent> {
        self.inner
            .read()
            .get(task_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The most recent `limit` events, reduced to the compact captured shape,
    /// still oldest-first within the window.
    pub fn recent(&self, task_id: &str, limit: usize) -> Vec<CapturedEvent> {
        let guard = self.inner.read();
        let Some(events) = guard.get(task_id) else {
            return Vec::new();
        };
        let start = events.len().saturating_sub(limit);
        events[start..].iter().map(TaskEvent::capture).collect()
    }

    pub fn len_for(&self, task_id: &str) -> usize {
        self.inner.read().get(task_id).map_or(0, Vec::len)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn message(text: &str) -> EventPayload {
        EventPayload::AgentMessage {
            text: text.to_string(),
        }
    }

    #[test]
    fn events_read_back_in_append_order() {
        let log = EventLog::new();
        log.append("t1", message("first"));
        log.append("t1", message("second"));
        log.append("t2", message("other"));

        let events = log.events_for("t1");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].payload, message("first"));
        assert_eq!(events[1].payload, message("second"));
    }

    #[test]
    fn recent_returns_the_tail_of_the_timeline() {
        let log = EventLog::new();
        for i in 0..10 {
            log.append("t1", message(&format!("m{i}")));
        }
        let captured = log.recent("t1", 3);
        assert_eq!(captured.len(), 3);
        assert_eq!(captured[0].summary, "m7");
        assert_eq!(captured[2].summary, "m9");
    }

    #[test]
    fn recent_on_unknown_task_is_empty() {
        let log = EventLog::new();
        assert!(log.recent("nope", 5).is_empty());
    }

    #[test]
    fn concurrent_appends_land_on_separate_timelines() {
        use std::sync::Arc;
        let log = Arc::new(EventLog::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    let task_id = format!("task-{worker}");
                    for i in 0..50 {
                        log.append(&task_id, message(&format!("m{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker");
        }
        for worker in 0..8 {
            let events = log.events_for(&format!("task-{worker}"));
            assert_eq!(events.len(), 50);
            for (i, event) in events.iter().enumerate() {
                assert_eq!(event.payload, message(&format!("m{i}")));
            }
        }
    }
}
