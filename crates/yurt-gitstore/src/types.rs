// types.rs — Value types returned by the repository store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a tree entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Full path from the repository root.
    pub path: String,
    pub kind: EntryKind,
}

/// One entry of a single-directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// File or directory name without the directory prefix.
    pub name: String,
    /// Full path from the repository root.
    pub path: String,
    pub kind: EntryKind,
}

/// File bytes plus the blob sha the host will demand back on the next write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub sha: String,
}

impl FileContent {
    /// Content as UTF-8 text. Content files are always text (JSON or
    /// markdown); lossy conversion keeps a mangled file readable rather
    /// than unreachable.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// A branch name and the sha of its tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSummary {
    pub name: String,
    pub sha: String,
}

/// A single commit, as much of it as the engine cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub date: DateTime<Utc>,
}

/// Result of comparing two refs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Commits reachable from `head` but not `base`.
    pub ahead_by: u64,
    pub commits: Vec<CommitInfo>,
    /// Best-effort common ancestor.
    pub merge_base: Option<String>,
}
