//! Workspace path sandbox.
//!
//! Every file-touching tool resolves its path argument here first. The
//! guard normalizes the candidate lexically and compares its relation to
//! the workspace root component-wise — never by substring — so trailing
//! slashes and sibling directories with a shared prefix cannot slip
//! through. Escapes fail with `PATH_OUTSIDE_WORKSPACE` unless the
//! workspace is ephemeral/unrestricted or the path is allow-listed.

use crate::error::RuntimeError;
use crate::workspace::Workspace;
use std::path::{Component, Path, PathBuf};

/// Normalizes a path by resolving `.` and `..` components lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Resolves a workspace-relative or absolute candidate path to an absolute
/// path guaranteed to be inside the workspace root or an allow-listed
/// external prefix.
pub fn resolve(workspace: &Workspace, candidate: impl AsRef<Path>) -> Result<PathBuf, RuntimeError> {
    let candidate = candidate.as_ref();
    let root = normalize_path(&workspace.root);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let resolved = normalize_path(&joined);

    if workspace.ephemeral || workspace.permissions.unrestricted_file_access {
        return Ok(resolved);
    }
    if resolved.starts_with(&root) {
        return Ok(resolved);
    }
    for allowed in &workspace.permissions.allowed_paths {
        let allowed = normalize_path(allowed);
        // Path::starts_with matches whole components, so `/opt/data` does
        // not cover `/opt/database`.
        if resolved.starts_with(&allowed) {
            return Ok(resolved);
        }
    }
    Err(RuntimeError::PathOutsideWorkspace(
        candidate.display().to_string(),
    ))
}

/// Workspace-relative rendering of a resolved path, with `/` separators,
/// for events and results. Paths outside the root render absolutely.
pub fn display_relative(workspace: &Workspace, resolved: &Path) -> String {
    let root = normalize_path(&workspace.root);
    match resolved.strip_prefix(&root) {
        Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
        Err(_) => resolved.to_string_lossy().replace('\\', "/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspacePermissions;
    use pretty_assertions::assert_eq;

    fn workspace() -> Workspace {
        Workspace::new("ws", "/ws")
    }

    #[test]
    fn relative_paths_resolve_under_the_root() {
        let resolved = resolve(&workspace(), "src/lib.rs").expect("resolve");
        assert_eq!(resolved, PathBuf::from("/ws/src/lib.rs"));
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let err = resolve(&workspace(), "../../etc/passwd").expect_err("escape");
        assert_eq!(err.code(), "PATH_OUTSIDE_WORKSPACE");
    }

    #[test]
    fn interior_traversal_that_stays_inside_is_allowed() {
        let resolved = resolve(&workspace(), "src/../docs/a.md").expect("resolve");
        assert_eq!(resolved, PathBuf::from("/ws/docs/a.md"));
    }

    #[test]
    fn absolute_path_outside_the_root_is_rejected() {
        let err = resolve(&workspace(), "/etc/passwd").expect_err("escape");
        assert_eq!(err.code(), "PATH_OUTSIDE_WORKSPACE");
    }

    #[test]
    fn absolute_path_inside_the_root_is_allowed() {
        let resolved = resolve(&workspace(), "/ws/notes.md").expect("resolve");
        assert_eq!(resolved, PathBuf::from("/ws/notes.md"));
    }

    #[test]
    fn shared_prefix_sibling_directory_is_rejected() {
        let err = resolve(&workspace(), "/ws-evil/secret").expect_err("sibling");
        assert_eq!(err.code(), "PATH_OUTSIDE_WORKSPACE");
    }

    #[test]
    fn allow_listed_prefix_matches_on_component_boundaries() {
        let mut ws = workspace();
        ws.permissions = WorkspacePermissions {
            allowed_paths: vec![PathBuf::from("/opt/data")],
            ..WorkspacePermissions::default()
        };
        assert!(resolve(&ws, "/opt/data").is_ok());
        assert!(resolve(&ws, "/opt/data/reports/q3.csv").is_ok());
        let err = resolve(&ws, "/opt/database/x").expect_err("boundary");
        assert_eq!(err.code(), "PATH_OUTSIDE_WORKSPACE");
    }

    #[test]
    fn ephemeral_workspace_bypasses_the_guard() {
        let ws = workspace().ephemeral();
        assert!(resolve(&ws, "/etc/hosts").is_ok());
    }

    #[test]
    fn unrestricted_flag_bypasses_the_guard() {
        let mut ws = workspace();
        ws.permissions.unrestricted_file_access = true;
        assert!(resolve(&ws, "../outside").is_ok());
    }

    #[test]
    fn display_relative_uses_forward_slashes() {
        let ws = workspace();
        let resolved = resolve(&ws, "src/main.rs").expect("resolve");
        assert_eq!(display_relative(&ws, &resolved), "src/main.rs");
    }
}
