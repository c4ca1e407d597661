//! Core library for the taskhive runtime.
//!
//! The runtime executes agent-issued tasks: units of work driven by a
//! language model that proceeds by invoking a bounded set of named tools.
//! This crate provides the task graph with hierarchical control, the
//! capability-gated tool registry with human approval, and the sandboxed
//! bounded filesystem primitives every file-touching tool depends on.

pub mod approval;
pub mod config;
pub mod connectors;
pub mod context;
pub mod error;
pub mod events;
pub mod policy;
pub mod tasks;
pub mod tools;
pub mod workspace;

pub use approval::{ApprovalGate, ApprovalScope, PendingApproval};
pub use config::RuntimeConfig;
pub use connectors::{Connector, ConnectorResponse};
pub use context::RuntimeContext;
pub use error::RuntimeError;
pub use events::EventLog;
pub use policy::{Capability, PermissionPolicy};
pub use tasks::executor::{ExecutorHandle, ExecutorRegistry, ExecutorSignals};
pub use tasks::graph::{Task, TaskGraph, MAX_SPAWN_DEPTH};
pub use tasks::orchestrator::{
    ClosureDriver, Orchestrator, SpawnParams, TaskDriver, WaitOutcome,
};
pub use tasks::status::TaskStatus;
pub use tools::fs::IoLimits;
pub use tools::registry::{ToolDeclaration, ToolRegistry};
pub use tools::ToolKind;
pub use workspace::{Workspace, WorkspacePermissions};
