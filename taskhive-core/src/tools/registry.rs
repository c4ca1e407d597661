//! Capability-gated tool registry.
//!
//! `execute` evaluates, in order: manifest membership under the caller's
//! permission policy (a gated tool is indistinguishable from a nonexistent
//! one), the approval requirement for the specific operation, and finally
//! the tool body. Every dispatch brackets the body with a `tool_call` and a
//! `tool_result` event, success or failure, and returns the uniform
//! `{success, …}` shape.

use crate::approval::ApprovalScope;
use crate::connectors::Connector;
use crate::context::RuntimeContext;
use crate::error::RuntimeError;
use crate::policy::PermissionPolicy;
use crate::tasks::orchestrator::Orchestrator;
use crate::tools::fs::{glob, list, path_guard, read, search, write, IoLimits};
use crate::tools::types::{
    AgentTargetInput, CaptureAgentEventsInput, DeleteFileInput, GlobSearchInput, GrepSearchInput,
    ListDirInput, ReadFileInput, RunCommandInput, SendAgentMessageInput, SpawnAgentInput,
    WaitForAgentInput, WriteFileInput,
};
use crate::tools::{agent_control, shell, ToolKind};
use crate::workspace::Workspace;
use anyhow::Context as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use taskhive_exec_events::{EventPayload, FileChangeKind};
use taskhive_shell_runner::{CommandExecutor, ProcessCommandExecutor};
use tracing::debug;

/// One entry of the tool manifest exposed to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

enum ResolvedTool {
    Builtin(ToolKind),
    Connector(Arc<dyn Connector>),
}

pub struct ToolRegistry {
    orchestrator: Arc<Orchestrator>,
    shell_executor: Arc<dyn CommandExecutor>,
    connectors: Vec<Arc<dyn Connector>>,
    io_limits: IoLimits,
}

impl ToolRegistry {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            shell_executor: Arc::new(ProcessCommandExecutor::new()),
            connectors: Vec::new(),
            io_limits: IoLimits::default(),
        }
    }

    /// Swaps the process executor, e.g. for a dry-run double in tests.
    pub fn with_shell_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.shell_executor = executor;
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connectors.push(connector);
        self
    }

    pub fn with_io_limits(mut self, io_limits: IoLimits) -> Self {
        self.io_limits = io_limits;
        self
    }

    fn ctx(&self) -> &RuntimeContext {
        self.orchestrator.context()
    }

    /// The manifest for the shared workspace's current permission state.
    pub fn manifest(&self) -> Vec<ToolDeclaration> {
        self.manifest_for(&self.ctx().workspace_snapshot())
    }

    /// Builds the policy-filtered manifest: built-ins whose capability is
    /// granted, plus enabled connectors.
    pub fn manifest_for(&self, workspace: &Workspace) -> Vec<ToolDeclaration> {
        let policy = PermissionPolicy::snapshot(workspace);
        let mut declarations: Vec<ToolDeclaration> = ToolKind::ALL
            .into_iter()
            .filter(|kind| policy.grants(kind.required_capability()))
            .map(|kind| ToolDeclaration {
                name: kind.name().to_string(),
                description: kind.description().to_string(),
                input_schema: kind.input_schema(),
            })
            .collect();
        for connector in &self.connectors {
            if connector.is_enabled() {
                declarations.push(ToolDeclaration {
                    name: connector.name().to_string(),
                    description: connector.description().to_string(),
                    input_schema: connector.input_schema(),
                });
            }
        }
        declarations
    }

    /// Dispatches a named tool call on behalf of a task. Always returns the
    /// uniform result shape; failures are structured, never panics or
    /// unhandled faults.
    pub async fn execute(&self, name: &str, input: Value, caller_task_id: &str) -> Value {
        let caller = match self.ctx().graph.get(caller_task_id) {
            Ok(task) => task,
            Err(error) => return error.failure_json(),
        };
        if caller.status.is_terminal() {
            return RuntimeError::TaskAlreadyFinished(caller_task_id.to_string()).failure_json();
        }

        let workspace = self.orchestrator.workspace_for(caller_task_id);
        let policy = PermissionPolicy::snapshot(&workspace);

        // A tool outside the caller's manifest is reported as unknown, not
        // as a permission failure, so gated capabilities stay invisible. The
        // attempt still lands on the timeline for human review.
        let resolved = self.resolve(name, &policy);
        let Some(resolved) = resolved else {
            let error = RuntimeError::UnknownTool(name.to_string());
            self.ctx().events.append(
                caller_task_id,
                EventPayload::StepFailed {
                    message: error.to_string(),
                },
            );
            return error.failure_json();
        };

        debug!(tool = name, caller = caller_task_id, "dispatching tool call");
        self.ctx().events.append(
            caller_task_id,
            EventPayload::ToolCall {
                tool: name.to_string(),
                input: input.clone(),
            },
        );

        let outcome = match resolved {
            ResolvedTool::Builtin(kind) => {
                self.run_builtin(kind, &workspace, input, caller_task_id).await
            }
            ResolvedTool::Connector(connector) => {
                let scope = self.approval_scope(caller_task_id);
                match connector.execute_action(&scope, input).await {
                    Ok(response) => serde_json::to_value(response)
                        .context("connector response serialization")
                        .map_err(RuntimeError::from),
                    Err(error) => Err(error),
                }
            }
        };

        match outcome {
            Ok(value) => {
                self.ctx().events.append(
                    caller_task_id,
                    EventPayload::ToolResult {
                        tool: name.to_string(),
                        result: Some(value.clone()),
                        error: None,
                    },
                );
                value
            }
            Err(error) => {
                let failure = error.failure_json();
                self.ctx().events.append(
                    caller_task_id,
                    EventPayload::ToolResult {
                        tool: name.to_string(),
                        result: None,
                        error: Some(error.to_string()),
                    },
                );
                failure
            }
        }
    }

    fn resolve(&self, name: &str, policy: &PermissionPolicy) -> Option<ResolvedTool> {
        if let Some(kind) = ToolKind::from_name(name) {
            if policy.grants(kind.required_capability()) {
                return Some(ResolvedTool::Builtin(kind));
            }
            return None;
        }
        self.connectors
            .iter()
            .find(|connector| connector.name() == name && connector.is_enabled())
            .cloned()
            .map(ResolvedTool::Connector)
    }

    fn approval_scope(&self, caller_task_id: &str) -> ApprovalScope {
        let ctx = self.ctx();
        ApprovalScope::new(
            Arc::clone(&ctx.approvals),
            Arc::clone(&ctx.events),
            Arc::clone(&ctx.graph),
            caller_task_id,
        )
    }

    async fn run_builtin(
        &self,
        kind: ToolKind,
        workspace: &Workspace,
        input: Value,
        caller_task_id: &str,
    ) -> Result<Value, RuntimeError> {
        match kind {
            ToolKind::ReadFile => {
                let input: ReadFileInput = parse_input(input)?;
                let path = path_guard::resolve(workspace, &input.path)?;
                let cap = input
                    .max_bytes
                    .map_or(self.io_limits.max_read_bytes, |requested| {
                        requested.min(self.io_limits.max_read_bytes)
                    });
                let outcome = read::read_file(&path, cap).await?;
                Ok(json!({
                    "success": true,
                    "path": path_guard::display_relative(workspace, &path),
                    "content": outcome.content,
                    "truncated": outcome.truncated,
                    "size_bytes": outcome.size_bytes,
                }))
            }
            ToolKind::WriteFile => {
                let input: WriteFileInput = parse_input(input)?;
                let path = path_guard::resolve(workspace, &input.path)?;
                let outcome = write::write_file(&path, &input.content).await?;
                let relative = path_guard::display_relative(workspace, &path);
                self.ctx().events.append(
                    caller_task_id,
                    EventPayload::FileChange {
                        path: relative.clone(),
                        kind: if outcome.created {
                            FileChangeKind::Added
                        } else {
                            FileChangeKind::Modified
                        },
                    },
                );
                Ok(json!({
                    "success": true,
                    "path": relative,
                    "bytes_written": outcome.bytes_written,
                    "created": outcome.created,
                }))
            }
            ToolKind::DeleteFile => {
                let input: DeleteFileInput = parse_input(input)?;
                let path = path_guard::resolve(workspace, &input.path)?;
                let relative = path_guard::display_relative(workspace, &path);
                self.approval_scope(caller_task_id)
                    .require_approval(
                        "delete",
                        &format!("delete {relative}"),
                        json!({"path": relative, "recursive": input.recursive}),
                    )
                    .await?;
                write::delete_path(&path, input.recursive).await?;
                self.ctx().events.append(
                    caller_task_id,
                    EventPayload::FileChange {
                        path: relative.clone(),
                        kind: FileChangeKind::Deleted,
                    },
                );
                Ok(json!({"success": true, "path": relative}))
            }
            ToolKind::ListDir => {
                let input: ListDirInput = parse_input(input)?;
                let path =
                    path_guard::resolve(workspace, input.path.as_deref().unwrap_or("."))?;
                let outcome = list::list_dir(&path, self.io_limits.max_list_entries).await?;
                Ok(json!({
                    "success": true,
                    "path": path_guard::display_relative(workspace, &path),
                    "entries": outcome.entries,
                    "truncated": outcome.truncated,
                }))
            }
            ToolKind::GlobSearch => {
                let input: GlobSearchInput = parse_input(input)?;
                let base =
                    path_guard::resolve(workspace, input.path.as_deref().unwrap_or("."))?;
                let pattern = glob::compile(&input.pattern)?;
                let max_results = input.max_results.unwrap_or(50);
                let outcome =
                    tokio::task::spawn_blocking(move || glob::scan(&base, &pattern, max_results))
                        .await
                        .context("glob scan task failed")??;
                let matches: Vec<Value> = outcome
                    .matches
                    .iter()
                    .map(|found| {
                        json!({
                            "path": found.relative,
                            "modified_ms": found
                                .modified
                                .duration_since(UNIX_EPOCH)
                                .map(|d| d.as_millis() as u64)
                                .unwrap_or(0),
                        })
                    })
                    .collect();
                Ok(json!({
                    "success": true,
                    "matches": matches,
                    "truncated": outcome.truncated,
                    "files_scanned": outcome.files_scanned,
                    "dirs_scanned": outcome.dirs_scanned,
                }))
            }
            ToolKind::GrepSearch => {
                let input: GrepSearchInput = parse_input(input)?;
                let base =
                    path_guard::resolve(workspace, input.path.as_deref().unwrap_or("."))?;
                let limits = self.io_limits;
                let outcome = tokio::task::spawn_blocking(move || {
                    search::search_contents(&base, &input.pattern, input.case_sensitive, &limits)
                })
                .await
                .context("content search task failed")??;
                Ok(json!({
                    "success": true,
                    "matches": outcome.matches,
                    "truncated": outcome.truncated,
                    "files_visited": outcome.files_visited,
                }))
            }
            ToolKind::RunCommand => {
                let input: RunCommandInput = parse_input(input)?;
                self.approval_scope(caller_task_id)
                    .require_approval(
                        "shell",
                        &shell::approval_summary(&input),
                        json!({"command": input.command, "working_dir": input.working_dir}),
                    )
                    .await?;
                shell::run_command(workspace, self.shell_executor.as_ref(), &input).await
            }
            ToolKind::SpawnAgent => {
                let input: SpawnAgentInput = parse_input(input)?;
                agent_control::spawn_agent(&self.orchestrator, caller_task_id, &input)
            }
            ToolKind::WaitForAgent => {
                let input: WaitForAgentInput = parse_input(input)?;
                agent_control::wait_for_agent(&self.orchestrator, caller_task_id, &input).await
            }
            ToolKind::SendAgentMessage => {
                let input: SendAgentMessageInput = parse_input(input)?;
                agent_control::send_agent_message(&self.orchestrator, caller_task_id, &input)
            }
            ToolKind::CaptureAgentEvents => {
                let input: CaptureAgentEventsInput = parse_input(input)?;
                agent_control::capture_agent_events(&self.orchestrator, caller_task_id, &input)
            }
            ToolKind::CancelAgent => {
                let input: AgentTargetInput = parse_input(input)?;
                agent_control::cancel_agent(&self.orchestrator, caller_task_id, &input)
            }
            ToolKind::PauseAgent => {
                let input: AgentTargetInput = parse_input(input)?;
                agent_control::pause_agent(&self.orchestrator, caller_task_id, &input)
            }
            ToolKind::ResumeAgent => {
                let input: AgentTargetInput = parse_input(input)?;
                agent_control::resume_agent(&self.orchestrator, caller_task_id, &input)
            }
        }
    }
}

fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, RuntimeError> {
    serde_json::from_value(input)
        .context("invalid tool input")
        .map_err(RuntimeError::from)
}
