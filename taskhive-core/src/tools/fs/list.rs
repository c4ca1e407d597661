//! Entry-capped directory listings.

use crate::error::RuntimeError;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
    /// File size in bytes; zero for directories.
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListOutcome {
    pub entries: Vec<DirEntryInfo>,
    pub truncated: bool,
}

/// Lists a directory, name-sorted, returning at most `max_entries` entries.
pub async fn list_dir(path: &Path, max_entries: usize) -> Result<ListOutcome, RuntimeError> {
    let mut reader = tokio::fs::read_dir(path).await?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let file_type = entry.file_type().await?;
        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        let size_bytes = if kind == EntryKind::File {
            entry.metadata().await.map(|meta| meta.len()).unwrap_or(0)
        } else {
            0
        };
        entries.push(DirEntryInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
            size_bytes,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let truncated = entries.len() > max_entries;
    if truncated {
        entries.truncate(max_entries);
    }
    Ok(ListOutcome { entries, truncated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn lists_entries_sorted_by_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("b.txt"), "b").expect("write");
        std::fs::write(dir.path().join("a.txt"), "a").expect("write");
        std::fs::create_dir(dir.path().join("sub")).expect("mkdir");

        let outcome = list_dir(dir.path(), 100).await.expect("list");
        assert!(!outcome.truncated);
        let names: Vec<&str> = outcome.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert_eq!(outcome.entries[2].kind, EntryKind::Directory);
    }

    #[tokio::test]
    async fn entry_count_is_capped() {
        let dir = tempfile::tempdir().expect("tempdir");
        for i in 0..10 {
            std::fs::write(dir.path().join(format!("f{i:02}")), "x").expect("write");
        }
        let outcome = list_dir(dir.path(), 3).await.expect("list");
        assert!(outcome.truncated);
        assert_eq!(outcome.entries.len(), 3);
    }
}
