//! Bounded recursive content search.
//!
//! Visits at most a fixed number of files below the search root, skipping
//! the same dependency/VCS directories the glob scan prunes, and returns at
//! most a fixed number of line matches. Files that are not valid UTF-8 or
//! exceed the per-file size ceiling are skipped, not errors.

use crate::error::RuntimeError;
use crate::tools::fs::IoLimits;
use anyhow::Context;
use regex::RegexBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};

const SKIP_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    ".venv",
    "venv",
    "__pycache__",
    ".next",
    ".cache",
    "vendor",
];

#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    /// Path relative to the search root, `/`-separated.
    pub path: String,
    /// 1-based line number.
    pub line_number: usize,
    pub line: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub matches: Vec<SearchMatch>,
    pub truncated: bool,
    pub files_visited: usize,
}

/// Searches file contents under `root` for lines matching `pattern`.
pub fn search_contents(
    root: &Path,
    pattern: &str,
    case_sensitive: bool,
    limits: &IoLimits,
) -> Result<SearchOutcome, RuntimeError> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .with_context(|| format!("invalid search pattern: {pattern}"))?;

    let mut matches = Vec::new();
    let mut truncated = false;
    let mut files_visited = 0usize;

    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    'walk: while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if dir == root => return Err(error.into()),
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(_) => continue,
            };
            if file_type.is_dir() {
                let name = entry.file_name();
                if !SKIP_DIRS.contains(&name.to_string_lossy().as_ref()) {
                    stack.push(path);
                }
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            if files_visited >= limits.max_search_visits {
                truncated = true;
                break 'walk;
            }
            files_visited += 1;

            if let Ok(meta) = entry.metadata() {
                if meta.len() > limits.max_search_file_bytes {
                    continue;
                }
            }
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue; // binary or unreadable
            };
            let relative = path
                .strip_prefix(root)
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_else(|_| path.to_string_lossy().into_owned());
            for (index, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    if matches.len() >= limits.max_search_results {
                        truncated = true;
                        break 'walk;
                    }
                    matches.push(SearchMatch {
                        path: relative.clone(),
                        line_number: index + 1,
                        line: line.to_string(),
                    });
                }
            }
        }
    }

    Ok(SearchOutcome {
        matches,
        truncated,
        files_visited,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn limits() -> IoLimits {
        IoLimits::default()
    }

    #[test]
    fn finds_matching_lines_with_positions() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.txt"), "one\ntwo needle\nthree").expect("write");
        std::fs::create_dir(dir.path().join("sub")).expect("mkdir");
        std::fs::write(dir.path().join("sub/b.txt"), "needle here").expect("write");

        let outcome = search_contents(dir.path(), "needle", true, &limits()).expect("search");
        assert_eq!(outcome.matches.len(), 2);
        assert!(!outcome.truncated);
        let a = outcome
            .matches
            .iter()
            .find(|m| m.path == "a.txt")
            .expect("a.txt match");
        assert_eq!(a.line_number, 2);
    }

    #[test]
    fn search_is_case_insensitive_by_default_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.txt"), "NEEDLE").expect("write");
        let found = search_contents(dir.path(), "needle", false, &limits()).expect("search");
        assert_eq!(found.matches.len(), 1);
        let missed = search_contents(dir.path(), "needle", true, &limits()).expect("search");
        assert!(missed.matches.is_empty());
    }

    #[test]
    fn result_count_is_capped_with_truncation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let body = "hit\n".repeat(50);
        std::fs::write(dir.path().join("a.txt"), &body).expect("write");
        let mut small = limits();
        small.max_search_results = 10;
        let outcome = search_contents(dir.path(), "hit", true, &small).expect("search");
        assert_eq!(outcome.matches.len(), 10);
        assert!(outcome.truncated);
    }

    #[test]
    fn skip_list_directories_are_pruned() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("node_modules")).expect("mkdir");
        std::fs::write(dir.path().join("node_modules/x.js"), "needle").expect("write");
        let outcome = search_contents(dir.path(), "needle", true, &limits()).expect("search");
        assert!(outcome.matches.is_empty());
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(search_contents(dir.path(), "([", true, &limits()).is_err());
    }
}
