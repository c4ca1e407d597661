//! Workspace model: a filesystem root plus the capability set that bounds
//! what tools may do inside it.
//!
//! Workspaces are owned externally (created and destroyed by a workspace
//! manager); the runtime reads them per call. The one exception is lazy
//! materialization: a task spawned from a shared or ephemeral workspace gets
//! a dedicated directory of its own so siblings cannot trample each other.

use crate::error::RuntimeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Capability flags granted to tools operating in a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkspacePermissions {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub network: bool,
    pub shell: bool,
    /// When set, path-escape checks are bypassed entirely.
    pub unrestricted_file_access: bool,
    /// External paths reachable despite being outside the root. Matching is
    /// component-wise (exact or boundary prefix), never substring.
    pub allowed_paths: Vec<PathBuf>,
}

impl Default for WorkspacePermissions {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            delete: false,
            network: false,
            shell: false,
            unrestricted_file_access: false,
            allowed_paths: Vec::new(),
        }
    }
}

/// A filesystem root with its permission set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Workspace {
    pub id: String,
    pub root: PathBuf,
    pub permissions: WorkspacePermissions,
    /// Shared/temporary workspaces are flagged ephemeral; tasks spawned from
    /// one are given a materialized workspace of their own.
    #[serde(default)]
    pub ephemeral: bool,
}

impl Workspace {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            permissions: WorkspacePermissions::default(),
            ephemeral: false,
        }
    }

    pub fn with_permissions(mut self, permissions: WorkspacePermissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Creates a dedicated workspace directory for `task_id` under this
    /// workspace's root and returns the derived workspace. Permissions carry
    /// over; the derived workspace is not itself ephemeral.
    pub fn materialize_for_task(&self, task_id: &str) -> Result<Workspace, RuntimeError> {
        let root = self.root.join(".taskhive").join("tasks").join(task_id);
        std::fs::create_dir_all(&root)?;
        Ok(Workspace {
            id: format!("{}/{task_id}", self.id),
            root,
            permissions: self.permissions.clone(),
            ephemeral: false,
        })
    }
}
