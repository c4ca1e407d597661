//! Size-capped file reads.

use crate::error::RuntimeError;
use serde::Serialize;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Marker appended to truncated content.
pub const TRUNCATION_MARKER: &str = "\n[content truncated]";

#[derive(Debug, Clone, Serialize)]
pub struct ReadOutcome {
    pub content: String,
    pub truncated: bool,
    /// Total size of the file on disk, not the bytes returned.
    pub size_bytes: u64,
}

/// Reads at most `max_bytes` from the file. Larger files come back with the
/// head of the content, a truncation marker, and `truncated` set.
pub async fn read_file(path: &Path, max_bytes: usize) -> Result<ReadOutcome, RuntimeError> {
    let file = tokio::fs::File::open(path).await?;
    let size_bytes = file.metadata().await?.len();

    let mut buffer = Vec::with_capacity((max_bytes.min(size_bytes as usize)).min(64 * 1024));
    let mut limited = file.take(max_bytes as u64);
    limited.read_to_end(&mut buffer).await?;

    let truncated = size_bytes > max_bytes as u64;
    let mut content = String::from_utf8_lossy(&buffer).into_owned();
    if truncated {
        content.push_str(TRUNCATION_MARKER);
    }
    Ok(ReadOutcome {
        content,
        truncated,
        size_bytes,
    })
}
