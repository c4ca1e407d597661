//! File writes and deletes.
//!
//! Both run behind the registry's permission and approval checks; the
//! functions here only perform the filesystem work.

use crate::error::RuntimeError;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    pub bytes_written: usize,
    /// False when an existing file was overwritten.
    pub created: bool,
}

/// Writes `content` to `path`, creating parent directories as needed.
pub async fn write_file(path: &Path, content: &str) -> Result<WriteOutcome, RuntimeError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let created = !tokio::fs::try_exists(path).await?;
    tokio::fs::write(path, content.as_bytes()).await?;
    Ok(WriteOutcome {
        bytes_written: content.len(),
        created,
    })
}

/// Deletes a file, or a directory when `recursive` is set. Deleting a
/// non-empty directory without `recursive` is an error.
pub async fn delete_path(path: &Path, recursive: bool) -> Result<(), RuntimeError> {
    let meta = tokio::fs::symlink_metadata(path).await?;
    if meta.is_dir() {
        if recursive {
            tokio::fs::remove_dir_all(path).await?;
        } else {
            tokio::fs::remove_dir(path).await?;
        }
    } else {
        tokio::fs::remove_file(path).await?;
    }
    Ok(())
}
