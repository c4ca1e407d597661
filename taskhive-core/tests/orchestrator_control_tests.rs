//! Hierarchical control: ancestry authorization, lifecycle preconditions,
//! waiting, messaging, and event capture.

mod support;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use taskhive_core::{RuntimeContext, SpawnParams, TaskStatus, WaitOutcome, WorkspacePermissions};

fn fixture() -> (tempfile::TempDir, Arc<taskhive_core::Orchestrator>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let workspace = support::workspace(&dir, WorkspacePermissions::default());
    let orchestrator = support::orchestrator(RuntimeContext::new(workspace));
    (dir, orchestrator)
}

#[tokio::test]
async fn parent_cancels_executing_child() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("spawn child");
    assert_eq!(
        orch.context().graph.get(&child.id).expect("child").status,
        TaskStatus::Executing
    );

    orch.cancel(&parent.id, &child.id).expect("cancel");
    assert_eq!(
        orch.context().graph.get(&child.id).expect("child").status,
        TaskStatus::Cancelled
    );
}

#[tokio::test]
async fn unrelated_task_gets_forbidden_and_mutates_nothing() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("spawn child");
    let stranger = support::spawn_hanging_root(&orch);

    let before = orch.context().graph.get(&child.id).expect("child");
    let err = orch
        .send_message(&stranger.id, &child.id, "hi")
        .expect_err("stranger may not message the child");
    assert_eq!(err.code(), "FORBIDDEN");

    let err = orch
        .cancel(&stranger.id, &child.id)
        .expect_err("stranger may not cancel the child");
    assert_eq!(err.code(), "FORBIDDEN");

    let after = orch.context().graph.get(&child.id).expect("child");
    assert_eq!(before.status, after.status);
    assert_eq!(before.updated_at, after.updated_at);
}

#[tokio::test]
async fn grandparent_may_control_grandchild() {
    let (_dir, orch) = fixture();
    let root = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&root.id, SpawnParams::new("child", "hang"))
        .expect("child");
    let grandchild = orch
        .spawn_child(&child.id, SpawnParams::new("grandchild", "hang"))
        .expect("grandchild");

    orch.cancel(&root.id, &grandchild.id)
        .expect("transitive ancestry authorizes");
    assert_eq!(
        orch.context()
            .graph
            .get(&grandchild.id)
            .expect("grandchild")
            .status,
        TaskStatus::Cancelled
    );
}

#[tokio::test]
async fn second_cancel_reports_already_finished() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("child");

    orch.cancel(&parent.id, &child.id).expect("first cancel");
    let err = orch
        .cancel(&parent.id, &child.id)
        .expect_err("second cancel");
    assert_eq!(err.code(), "TASK_ALREADY_FINISHED");
}

#[tokio::test]
async fn cancel_after_completion_reports_already_finished() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "finish"))
        .expect("child");
    support::wait_terminal(&orch, &child.id).await;

    let err = orch.cancel(&parent.id, &child.id).expect_err("cancel");
    assert_eq!(err.code(), "TASK_ALREADY_FINISHED");
}

#[tokio::test]
async fn pause_then_resume_round_trips() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("child");

    orch.pause(&parent.id, &child.id).expect("pause");
    assert_eq!(
        orch.context().graph.get(&child.id).expect("child").status,
        TaskStatus::Paused
    );

    orch.resume(&parent.id, &child.id).expect("resume");
    assert_eq!(
        orch.context().graph.get(&child.id).expect("child").status,
        TaskStatus::Executing
    );
}

#[tokio::test]
async fn pause_requires_a_running_target() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("child");

    orch.pause(&parent.id, &child.id).expect("pause");
    let err = orch
        .pause(&parent.id, &child.id)
        .expect_err("already paused");
    assert_eq!(err.code(), "TASK_NOT_RUNNING");
}

#[tokio::test]
async fn resume_requires_a_paused_target() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("child");

    let err = orch
        .resume(&parent.id, &child.id)
        .expect_err("not paused");
    assert_eq!(err.code(), "TASK_NOT_PAUSED");
}

#[tokio::test]
async fn resume_without_live_executor_fails_and_leaves_status() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("child");
    orch.pause(&parent.id, &child.id).expect("pause");

    // Simulate a process restart: the task record survives, the in-memory
    // executor does not.
    orch.context().executors.evict(&child.id);

    let err = orch
        .resume(&parent.id, &child.id)
        .expect_err("no executor");
    assert_eq!(err.code(), "NO_EXECUTOR");
    assert_eq!(
        orch.context().graph.get(&child.id).expect("child").status,
        TaskStatus::Paused
    );
}

#[tokio::test]
async fn messages_reach_the_child_driver() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "wait-inbox"))
        .expect("child");

    orch.send_message(&parent.id, &child.id, "carry on")
        .expect("send");
    support::wait_terminal(&orch, &child.id).await;
    assert_eq!(
        orch.context().graph.get(&child.id).expect("child").status,
        TaskStatus::Completed
    );
}

#[tokio::test]
async fn wait_for_observes_child_completion() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "finish"))
        .expect("child");

    let outcome = orch
        .wait_for(&parent.id, &child.id, Some(30))
        .await
        .expect("wait");
    assert_eq!(
        outcome,
        WaitOutcome::Finished {
            status: TaskStatus::Completed
        }
    );
}

#[tokio::test]
async fn wait_for_observes_child_failure() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "fail"))
        .expect("child");

    let outcome = orch
        .wait_for(&parent.id, &child.id, Some(30))
        .await
        .expect("wait");
    assert_eq!(
        outcome,
        WaitOutcome::Finished {
            status: TaskStatus::Failed
        }
    );
}

#[tokio::test]
async fn wait_for_times_out_distinguishably() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("child");

    let outcome = orch
        .wait_for(&parent.id, &child.id, Some(1))
        .await
        .expect("wait");
    assert_eq!(outcome, WaitOutcome::TimedOut);
}

#[tokio::test]
async fn wait_is_abandoned_when_the_caller_is_cancelled() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("child");

    let waiter = {
        let orch = Arc::clone(&orch);
        let parent_id = parent.id.clone();
        let child_id = child.id.clone();
        tokio::spawn(async move { orch.wait_for(&parent_id, &child_id, Some(60)).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // An operator interrupt on the caller fires its cancellation token.
    orch.context()
        .executors
        .get(&parent.id)
        .expect("parent handle")
        .trigger_cancel();

    let outcome = waiter.await.expect("join").expect("wait");
    assert_eq!(outcome, WaitOutcome::CallerCancelled);
}

#[tokio::test]
async fn cancelling_a_parent_does_not_cascade_to_children() {
    let (_dir, orch) = fixture();
    let root = support::spawn_hanging_root(&orch);
    let parent = orch
        .spawn_child(&root.id, SpawnParams::new("parent", "hang"))
        .expect("parent");
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("child");

    orch.cancel(&root.id, &parent.id).expect("cancel parent");
    assert_eq!(
        orch.context().graph.get(&child.id).expect("child").status,
        TaskStatus::Executing,
        "children are independent entities"
    );

    // The root is still an ancestor of the grandchild and may clean it up
    // explicitly.
    orch.cancel(&root.id, &child.id).expect("cancel child");
}

#[tokio::test]
async fn capture_events_returns_reduced_recent_events() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "wait-inbox"))
        .expect("child");
    orch.send_message(&parent.id, &child.id, "a note")
        .expect("send");
    support::wait_terminal(&orch, &child.id).await;

    let events = orch
        .capture_events(&parent.id, &child.id, 10)
        .expect("capture");
    assert!(!events.is_empty());
    let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert!(types.contains(&"status_changed"));
    assert!(types.contains(&"agent_message"));
    let message = events
        .iter()
        .find(|e| e.event_type == "agent_message")
        .expect("message event");
    assert_eq!(message.summary, "a note");
}

#[tokio::test]
async fn capture_events_honors_the_limit() {
    let (_dir, orch) = fixture();
    let parent = support::spawn_hanging_root(&orch);
    let child = orch
        .spawn_child(&parent.id, SpawnParams::new("child", "hang"))
        .expect("child");
    for i in 0..5 {
        orch.send_message(&parent.id, &child.id, &format!("m{i}"))
            .expect("send");
    }

    let events = orch
        .capture_events(&parent.id, &child.id, 2)
        .expect("capture");
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn spawn_depth_limit_is_enforced() {
    let (_dir, orch) = fixture();
    let mut current = support::spawn_hanging_root(&orch);
    for _ in 0..taskhive_core::MAX_SPAWN_DEPTH {
        current = orch
            .spawn_child(&current.id, SpawnParams::new("deep", "hang"))
            .expect("within cap");
    }
    let err = orch
        .spawn_child(&current.id, SpawnParams::new("too deep", "hang"))
        .expect_err("beyond cap");
    assert_eq!(err.code(), "DEPTH_LIMIT");
}
