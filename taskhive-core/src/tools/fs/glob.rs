//! Glob compilation and bounded directory scanning.
//!
//! Patterns support `*`, `?`, globstar (`**`), and recursive brace
//! alternation (`{a,b}`). Brace groups are expanded into literal patterns
//! first; each is rewritten to a regex fragment and the fragments are
//! combined into one anchored, case-insensitive alternation.
//!
//! The scan walks the target directory with three independent ceilings —
//! files scanned, directories scanned, recursion depth — each scaled from
//! the requested result count but clamped to fixed floors and ceilings.
//! Exceeding any ceiling sets `truncated` on the result instead of failing
//! the call.

use crate::error::RuntimeError;
use anyhow::Context;
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Directories pruned below the scan root: build output, dependency caches,
/// and version-control metadata produce pathological walks.
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

const FILE_SCAN_FLOOR: usize = 1_000;
const FILE_SCAN_CEILING: usize = 50_000;
const DIR_SCAN_FLOOR: usize = 100;
const DIR_SCAN_CEILING: usize = 5_000;
const DEPTH_FLOOR: usize = 8;
const DEPTH_CEILING: usize = 32;

/// A compiled glob expression.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    regex: Regex,
    source: String,
}

impl GlobPattern {
    /// Tests a workspace-relative path (with `/` separators) against the
    /// pattern. Matching is anchored and case-insensitive.
    pub fn matches(&self, relative_path: &str) -> bool {
        self.regex.is_match(relative_path)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Compiles a glob expression into a [`GlobPattern`].
pub fn compile(pattern: &str) -> Result<GlobPattern, RuntimeError> {
    let alternatives = expand_braces(pattern);
    let fragments: Vec<String> = alternatives.iter().map(|alt| glob_to_regex(alt)).collect();
    let anchored = format!("^(?:{})$", fragments.join("|"));
    let regex = RegexBuilder::new(&anchored)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(GlobPattern {
        regex,
        source: pattern.to_string(),
    })
}

/// Expands the first top-level brace group and recurses on each
/// alternative. Unbalanced braces are treated as literal characters.
fn expand_braces(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let Some(open) = find_brace_group(&chars) else {
        return vec![pattern.to_string()];
    };
    let (start, end) = open;
    let prefix: String = chars[..start].iter().collect();
    let suffix: String = chars[end + 1..].iter().collect();

    let mut alternatives = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for &ch in &chars[start + 1..end] {
        match ch {
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                alternatives.push(current.clone());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    alternatives.push(current);

    let mut expanded = Vec::new();
    for alternative in alternatives {
        let candidate = format!("{prefix}{alternative}{suffix}");
        expanded.extend(expand_braces(&candidate));
    }
    expanded
}

/// Finds the first `{` with a matching `}`, returning both indices.
fn find_brace_group(chars: &[char]) -> Option<(usize, usize)> {
    let start = chars.iter().position(|&c| c == '{')?;
    let mut depth = 0usize;
    for (offset, &ch) in chars[start..].iter().enumerate() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset));
                }
            }
            _ => {}
        }
    }
    None
}

/// Rewrites one brace-free glob to a regex fragment: `**/` at a segment
/// boundary is zero or more whole segments, a bare `**` is any sequence
/// including separators, `*` is any run excluding the separator, `?` is one
/// character excluding the separator, and everything else is escaped.
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let at_segment_start = i == 0 || chars[i - 1] == '/';
                if at_segment_start && chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:[^/]+/)*");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            ch => {
                out.push_str(&regex::escape(&ch.to_string()));
                i += 1;
            }
        }
    }
    out
}

/// Per-scan ceilings, scaled from the requested result count.
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    pub max_files: usize,
    pub max_dirs: usize,
    pub max_depth: usize,
}

impl ScanLimits {
    pub fn for_result_count(max_results: usize) -> Self {
        Self {
            max_files: (max_results.saturating_mul(100)).clamp(FILE_SCAN_FLOOR, FILE_SCAN_CEILING),
            max_dirs: (max_results.saturating_mul(10)).clamp(DIR_SCAN_FLOOR, DIR_SCAN_CEILING),
            max_depth: (max_results / 2).clamp(DEPTH_FLOOR, DEPTH_CEILING),
        }
    }
}

/// A file matched during a scan.
#[derive(Debug, Clone)]
pub struct FileMatch {
    pub path: PathBuf,
    pub relative: String,
    pub modified: SystemTime,
}

/// Result of a bounded scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Matches sorted by modification time, newest first, capped at the
    /// requested maximum.
    pub matches: Vec<FileMatch>,
    /// Set when any ceiling was hit or the match list was cut down.
    pub truncated: bool,
    pub files_scanned: usize,
    pub dirs_scanned: usize,
}

/// Recursively scans `root` for files matching `pattern`, honoring the
/// ceilings derived from `max_results`.
pub fn scan(
    root: &Path,
    pattern: &GlobPattern,
    max_results: usize,
) -> Result<ScanOutcome, RuntimeError> {
    let limits = ScanLimits::for_result_count(max_results);
    let mut matches = Vec::new();
    let mut truncated = false;
    let mut files_scanned = 0usize;
    let mut dirs_scanned = 0usize;

    let mut stack: Vec<(PathBuf, usize)> = vec![(root.to_path_buf(), 0)];
    'walk: while let Some((dir, depth)) = stack.pop() {
        if dirs_scanned >= limits.max_dirs {
            truncated = true;
            break;
        }
        dirs_scanned += 1;

        // The scan root itself must be readable; failures below it are
        // skipped rather than failing the whole call.
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if depth == 0 => return Err(error.into()),
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
                let name = name.to_string_lossy();
                if SKIP_DIRS.contains(&name.as_ref()) {
                    continue;
                }
                if depth + 1 > limits.max_depth {
                    truncated = true;
                    continue;
                }
                stack.push((path, depth + 1));
            } else if file_type.is_file() {
                if files_scanned >= limits.max_files {
                    truncated = true;
                    break 'walk;
                }
                files_scanned += 1;
                let relative = match path.strip_prefix(root) {
                    Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
                    Err(_) => continue,
                };
                if pattern.matches(&relative) {
                    let modified = entry
                        .metadata()
                        .and_then(|meta| meta.modified())
                        .unwrap_or(SystemTime::UNIX_EPOCH);
                    matches.push(FileMatch {
                        path,
                        relative,
                        modified,
                    });
                }
            }
        }
    }

    matches.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.relative.cmp(&b.relative)));
    if matches.len() > max_results {
        matches.truncate(max_results);
        truncated = true;
    }

    Ok(ScanOutcome {
        matches,
        truncated,
        files_scanned,
        dirs_scanned,
    })
}
