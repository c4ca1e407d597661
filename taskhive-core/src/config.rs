//! Runtime configuration.
//!
//! A workspace definition plus operational limits, loaded from TOML:
//!
//! ```toml
//! [workspace]
//! id = "main"
//! root = "/srv/agents/main"
//!
//! [workspace.permissions]
//! read = true
//! write = true
//! shell = false
//! allowed_paths = ["/opt/shared-data"]
//!
//! [limits]
//! approval_timeout_secs = 900
//! ```

use crate::approval::ApprovalGate;
use crate::context::RuntimeContext;
use crate::tools::fs::IoLimits;
use crate::workspace::{Workspace, WorkspacePermissions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_id")]
    pub id: String,
    pub root: PathBuf,
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub permissions: WorkspacePermissions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub io: IoLimits,
    /// Unresolved approvals are denied after this many seconds. Absent
    /// means wait indefinitely.
    pub approval_timeout_secs: Option<u64>,
}

fn default_workspace_id() -> String {
    "main".to_string()
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn workspace(&self) -> Workspace {
        let mut workspace = Workspace::new(&self.workspace.id, &self.workspace.root)
            .with_permissions(self.workspace.permissions.clone());
        if self.workspace.ephemeral {
            workspace = workspace.ephemeral();
        }
        workspace
    }

    /// Builds the runtime context this config describes, including the
    /// approval gate's decision timeout when one is configured.
    pub fn build_context(&self) -> RuntimeContext {
        let ctx = RuntimeContext::new(self.workspace());
        match self.limits.approval_timeout_secs {
            Some(secs) => {
                ctx.with_approval_gate(ApprovalGate::with_timeout(Duration::from_secs(secs)))
            }
            None => ctx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            [workspace]
            root = "/srv/agents/main"
            "#,
        )
        .expect("parse");
        assert_eq!(config.workspace.id, "main");
        assert!(!config.workspace.ephemeral);
        let workspace = config.workspace();
        assert!(workspace.permissions.read);
        assert!(!workspace.permissions.shell);
        assert!(config.limits.approval_timeout_secs.is_none());
    }

    #[test]
    fn permissions_and_limits_parse() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            [workspace]
            id = "build"
            root = "/srv/build"
            ephemeral = true

            [workspace.permissions]
            write = true
            shell = true
            allowed_paths = ["/opt/data"]

            [limits]
            approval_timeout_secs = 60
            "#,
        )
        .expect("parse");
        let workspace = config.workspace();
        assert!(workspace.ephemeral);
        assert!(workspace.permissions.shell);
        assert_eq!(
            workspace.permissions.allowed_paths,
            vec![PathBuf::from("/opt/data")]
        );
        assert_eq!(config.limits.approval_timeout_secs, Some(60));
    }

    #[test]
    fn load_surfaces_missing_file_with_context() {
        let err = RuntimeConfig::load(Path::new("/no/such/config.toml")).expect_err("missing");
        assert!(err.to_string().contains("/no/such/config.toml"));
    }
}
