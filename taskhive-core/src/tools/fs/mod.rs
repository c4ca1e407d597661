//! Sandboxed, bounded filesystem primitives.
//!
//! Every operation here resolves paths through the [`path_guard`] and caps
//! what it reads, lists, or visits, reporting truncation explicitly instead
//! of returning unbounded payloads.

pub mod glob;
pub mod list;
pub mod path_guard;
pub mod read;
pub mod search;
pub mod write;

use serde::{Deserialize, Serialize};

/// Ceilings applied by the bounded IO primitives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IoLimits {
    /// Bytes returned by a single file read.
    pub max_read_bytes: usize,
    /// Entries returned by a directory listing.
    pub max_list_entries: usize,
    /// Files visited by one content search.
    pub max_search_visits: usize,
    /// Matches returned by one content search.
    pub max_search_results: usize,
    /// Bytes of a file a content search is willing to inspect.
    pub max_search_file_bytes: u64,
}

impl Default for IoLimits {
    fn default() -> Self {
        Self {
            max_read_bytes: 256 * 1024,
            max_list_entries: 500,
            max_search_visits: 2_000,
            max_search_results: 200,
            max_search_file_bytes: 1024 * 1024,
        }
    }
}
