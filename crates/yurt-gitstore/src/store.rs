// store.rs — The RepoStore trait: what Yurt needs from a repository host.
//
// Any host that can serve these thirteen operations can back the engine.
// The contract is deliberately file-at-a-time: every mutation is one
// commit, and the host enforces write safety by rejecting a put/delete
// whose sha no longer matches the current file (surfaced as Conflict).

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{BranchSummary, CommitInfo, Comparison, DirEntry, FileContent, TreeEntry};

/// Async contract against the hosting repository's API.
///
/// `reference` parameters accept a branch name or commit sha; `None` means
/// the host's default branch.
#[async_trait]
pub trait RepoStore: Send + Sync {
    /// Name of the repository's default branch.
    async fn default_branch(&self) -> Result<String, StoreError>;

    /// Recursive listing of every entry reachable from `reference`.
    async fn list_tree(&self, reference: &str) -> Result<Vec<TreeEntry>, StoreError>;

    /// Fetch one file's content and blob sha.
    async fn get_file(
        &self,
        path: &str,
        reference: Option<&str>,
    ) -> Result<FileContent, StoreError>;

    /// List one directory (non-recursive). An empty `path` lists the root.
    async fn list_dir(
        &self,
        path: &str,
        reference: Option<&str>,
    ) -> Result<Vec<DirEntry>, StoreError>;

    /// Create or update one file as a commit. `sha` must be the current
    /// blob sha when the file exists, and `None` for brand-new files.
    /// Returns the commit sha.
    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
        branch: Option<&str>,
    ) -> Result<String, StoreError>;

    /// Delete one file as a commit. The current blob sha is mandatory.
    async fn delete_file(
        &self,
        path: &str,
        message: &str,
        sha: &str,
        branch: Option<&str>,
    ) -> Result<String, StoreError>;

    /// Tip sha of a branch.
    async fn branch_sha(&self, branch: &str) -> Result<String, StoreError>;

    /// Create a branch ref pointing at `sha`. Fails if the name is taken.
    async fn create_branch(&self, name: &str, sha: &str) -> Result<(), StoreError>;

    /// Delete a branch ref.
    async fn delete_branch(&self, name: &str) -> Result<(), StoreError>;

    /// All branches with their tip shas.
    async fn list_branches(&self) -> Result<Vec<BranchSummary>, StoreError>;

    /// Compare two refs: how far `head` is ahead of `base`, the commits in
    /// between, and the merge base.
    async fn compare(&self, base: &str, head: &str) -> Result<Comparison, StoreError>;

    /// Merge `head` into `base` with the given commit message.
    async fn merge(&self, base: &str, head: &str, message: &str) -> Result<(), StoreError>;

    /// Author and date details for one commit.
    async fn get_commit(&self, sha: &str) -> Result<CommitInfo, StoreError>;
}
