//! Per-call permission policy.
//!
//! A [`PermissionPolicy`] is a snapshot of the workspace's permission set
//! taken at dispatch time. It is never cached across calls: a permission
//! toggle on the workspace is visible to the very next tool call.

use crate::workspace::Workspace;
use serde::Serialize;
use std::path::PathBuf;

/// Capability classes a tool can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    Write,
    Delete,
    Network,
    Shell,
    /// Hierarchical task control; always granted (authorization happens per
    /// call against the ownership graph instead).
    Control,
}

/// Snapshot of a workspace's capability grants, derived per dispatch.
#[derive(Debug, Clone)]
pub struct PermissionPolicy {
    read: bool,
    write: bool,
    delete: bool,
    network: bool,
    shell: bool,
    unrestricted_file_access: bool,
    allowed_paths: Vec<PathBuf>,
    ephemeral: bool,
}

impl PermissionPolicy {
    /// Derives the policy from the workspace's current permission set.
    pub fn snapshot(workspace: &Workspace) -> Self {
        let perms = &workspace.permissions;
        Self {
            read: perms.read,
            write: perms.write,
            delete: perms.delete,
            network: perms.network,
            shell: perms.shell,
            unrestricted_file_access: perms.unrestricted_file_access,
            allowed_paths: perms.allowed_paths.clone(),
            ephemeral: workspace.ephemeral,
        }
    }

    pub fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.read,
            Capability::Write => self.write,
            Capability::Delete => self.delete,
            Capability::Network => self.network,
            Capability::Shell => self.shell,
            Capability::Control => true,
        }
    }

    pub fn unrestricted_file_access(&self) -> bool {
        self.unrestricted_file_access
    }

    pub fn allowed_paths(&self) -> &[PathBuf] {
        &self.allowed_paths
    }

    pub fn ephemeral(&self) -> bool {
        self.ephemeral
    }
}
