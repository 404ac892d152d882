// memory.rs — In-memory RepoStore used as the workspace-wide test double.
//
// Models just enough of a hosted git repository to exercise the engine:
// named branches over per-file blobs, a linear commit history per branch,
// stale-sha rejection on writes, branch compare with a merge base, and a
// protected-branch switch for publish-failure tests.
//
// Not a git implementation. Merging replaces the base branch's files with
// the head's, which matches how the engine uses merge (publish a draft
// whose base is main).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::store::RepoStore;
use crate::types::{
    BranchSummary, CommitInfo, Comparison, DirEntry, EntryKind, FileContent, TreeEntry,
};

#[derive(Debug, Clone)]
struct FileRecord {
    bytes: Vec<u8>,
    sha: String,
}

#[derive(Debug, Clone, Default)]
struct Branch {
    files: BTreeMap<String, FileRecord>,
    /// Commit shas, oldest first.
    history: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
    default_branch: String,
    branches: HashMap<String, Branch>,
    commits: HashMap<String, CommitInfo>,
    protected: HashSet<String>,
    counter: u64,
}

/// In-memory repository store.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty repository with a `main` default branch and a root commit.
    pub fn new() -> Self {
        let mut inner = Inner {
            default_branch: "main".to_string(),
            ..Inner::default()
        };
        let root = record_commit(&mut inner, "initial commit", Utc::now());
        inner.branches.insert(
            "main".to_string(),
            Branch {
                files: BTreeMap::new(),
                history: vec![root],
            },
        );
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Put a file on the default branch without the sha handshake.
    pub fn seed_file(&self, path: &str, bytes: &[u8]) {
        let mut inner = self.inner.lock().expect("store lock");
        let default = inner.default_branch.clone();
        let sha = record_commit(&mut inner, &format!("seed {path}"), Utc::now());
        let branch = inner.branches.get_mut(&default).expect("default branch");
        branch.files.insert(
            path.to_string(),
            FileRecord {
                sha: blob_sha(bytes),
                bytes: bytes.to_vec(),
            },
        );
        branch.history.push(sha);
    }

    /// Make every write and merge against `branch` fail with Conflict.
    pub fn protect(&self, branch: &str) {
        let mut inner = self.inner.lock().expect("store lock");
        inner.protected.insert(branch.to_string());
    }

    /// Rewrite the date of a branch's latest commit (staleness tests).
    pub fn backdate_tip(&self, branch: &str, date: DateTime<Utc>) {
        let mut inner = self.inner.lock().expect("store lock");
        let Some(tip) = inner
            .branches
            .get(branch)
            .and_then(|b| b.history.last())
            .cloned()
        else {
            return;
        };
        if let Some(commit) = inner.commits.get_mut(&tip) {
            commit.date = date;
        }
    }

    /// Raw file bytes on a branch, for asserting exact on-disk results.
    pub fn file_bytes(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().expect("store lock");
        inner
            .branches
            .get(branch)
            .and_then(|b| b.files.get(path))
            .map(|f| f.bytes.clone())
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.inner.lock().expect("store lock").branches.contains_key(name)
    }
}

fn blob_sha(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn record_commit(inner: &mut Inner, message: &str, date: DateTime<Utc>) -> String {
    inner.counter += 1;
    let mut hasher = Sha256::new();
    hasher.update(inner.counter.to_be_bytes());
    hasher.update(message.as_bytes());
    let sha = format!("{:x}", hasher.finalize());
    inner.commits.insert(
        sha.clone(),
        CommitInfo {
            sha: sha.clone(),
            message: message.to_string(),
            author_name: "Test Author".to_string(),
            author_email: "test@example.com".to_string(),
            date,
        },
    );
    sha
}

impl Inner {
    /// Resolve a branch name or commit sha into that ref's history.
    fn resolve_history(&self, reference: &str) -> Result<Vec<String>, StoreError> {
        if let Some(branch) = self.branches.get(reference) {
            return Ok(branch.history.clone());
        }
        // A sha resolves to the history up to and including it.
        for branch in self.branches.values() {
            if let Some(idx) = branch.history.iter().position(|s| s == reference) {
                return Ok(branch.history[..=idx].to_vec());
            }
        }
        Err(StoreError::NotFound {
            what: format!("ref '{reference}'"),
        })
    }

    fn branch_for_ref(&self, reference: &str) -> Result<&Branch, StoreError> {
        if let Some(branch) = self.branches.get(reference) {
            return Ok(branch);
        }
        self.branches
            .values()
            .find(|b| b.history.last().map(String::as_str) == Some(reference))
            .ok_or_else(|| StoreError::NotFound {
                what: format!("ref '{reference}'"),
            })
    }
}

#[async_trait]
impl RepoStore for MemoryStore {
    async fn default_branch(&self) -> Result<String, StoreError> {
        Ok(self.inner.lock().expect("store lock").default_branch.clone())
    }

    async fn list_tree(&self, reference: &str) -> Result<Vec<TreeEntry>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        let branch = inner.branch_for_ref(reference)?;

        let mut dirs: HashSet<String> = HashSet::new();
        let mut entries = Vec::new();
        for path in branch.files.keys() {
            // Every ancestor directory shows up once as a tree entry.
            let mut idx = 0;
            while let Some(slash) = path[idx..].find('/') {
                idx += slash;
                dirs.insert(path[..idx].to_string());
                idx += 1;
            }
            entries.push(TreeEntry {
                path: path.clone(),
                kind: EntryKind::Blob,
            });
        }
        for dir in dirs {
            entries.push(TreeEntry {
                path: dir,
                kind: EntryKind::Tree,
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn get_file(
        &self,
        path: &str,
        reference: Option<&str>,
    ) -> Result<FileContent, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        let reference = reference.unwrap_or(&inner.default_branch);
        let branch = inner.branch_for_ref(reference)?;
        let record = branch.files.get(path).ok_or_else(|| StoreError::NotFound {
            what: format!("{path} on {reference}"),
        })?;
        Ok(FileContent {
            bytes: record.bytes.clone(),
            sha: record.sha.clone(),
        })
    }

    async fn list_dir(
        &self,
        path: &str,
        reference: Option<&str>,
    ) -> Result<Vec<DirEntry>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        let reference = reference.unwrap_or(&inner.default_branch);
        let branch = inner.branch_for_ref(reference)?;

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };

        let mut files = Vec::new();
        let mut dirs = HashSet::new();
        for full in branch.files.keys() {
            let Some(rest) = full.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                None => files.push(DirEntry {
                    name: rest.to_string(),
                    path: full.clone(),
                    kind: EntryKind::Blob,
                }),
                Some((dir, _)) => {
                    dirs.insert(dir.to_string());
                }
            }
        }

        if files.is_empty() && dirs.is_empty() && !path.is_empty() {
            return Err(StoreError::NotFound {
                what: format!("{path} on {reference}"),
            });
        }

        let mut entries: Vec<DirEntry> = dirs
            .into_iter()
            .map(|name| DirEntry {
                path: format!("{prefix}{name}"),
                name,
                kind: EntryKind::Tree,
            })
            .collect();
        entries.extend(files);
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
        branch: Option<&str>,
    ) -> Result<String, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let branch_name = branch.unwrap_or(&inner.default_branch).to_string();

        if inner.protected.contains(&branch_name) {
            return Err(StoreError::Conflict {
                reason: format!("branch '{branch_name}' is protected"),
            });
        }
        if !inner.branches.contains_key(&branch_name) {
            return Err(StoreError::NotFound {
                what: format!("branch '{branch_name}'"),
            });
        }

        // The host rejects blind writes: an existing file demands its
        // current sha, a missing file demands no sha at all.
        let existing = inner.branches[&branch_name].files.get(path).cloned();
        match (&existing, sha) {
            (Some(record), Some(given)) if record.sha != given => {
                return Err(StoreError::Conflict {
                    reason: format!("{path} is at sha {} but {given} was supplied", record.sha),
                })
            }
            (Some(_), None) => {
                return Err(StoreError::Conflict {
                    reason: format!("{path} already exists; update requires its current sha"),
                })
            }
            (None, Some(_)) => {
                return Err(StoreError::NotFound {
                    what: format!("{path} on {branch_name}"),
                })
            }
            _ => {}
        }

        let commit = record_commit(&mut inner, message, Utc::now());
        let branch_state = inner.branches.get_mut(&branch_name).expect("checked above");
        branch_state.files.insert(
            path.to_string(),
            FileRecord {
                sha: blob_sha(content),
                bytes: content.to_vec(),
            },
        );
        branch_state.history.push(commit.clone());
        Ok(commit)
    }

    async fn delete_file(
        &self,
        path: &str,
        message: &str,
        sha: &str,
        branch: Option<&str>,
    ) -> Result<String, StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let branch_name = branch.unwrap_or(&inner.default_branch).to_string();

        if inner.protected.contains(&branch_name) {
            return Err(StoreError::Conflict {
                reason: format!("branch '{branch_name}' is protected"),
            });
        }

        let Some(record) = inner
            .branches
            .get(&branch_name)
            .and_then(|b| b.files.get(path))
            .cloned()
        else {
            return Err(StoreError::NotFound {
                what: format!("{path} on {branch_name}"),
            });
        };
        if record.sha != sha {
            return Err(StoreError::Conflict {
                reason: format!("{path} is at sha {} but {sha} was supplied", record.sha),
            });
        }

        let commit = record_commit(&mut inner, message, Utc::now());
        let branch_state = inner.branches.get_mut(&branch_name).expect("checked above");
        branch_state.files.remove(path);
        branch_state.history.push(commit.clone());
        Ok(commit)
    }

    async fn branch_sha(&self, branch: &str) -> Result<String, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        inner
            .branches
            .get(branch)
            .and_then(|b| b.history.last())
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: format!("branch '{branch}'"),
            })
    }

    async fn create_branch(&self, name: &str, sha: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        if inner.branches.contains_key(name) {
            return Err(StoreError::Conflict {
                reason: format!("reference '{name}' already exists"),
            });
        }
        let source = inner
            .branches
            .values()
            .find(|b| b.history.iter().any(|s| s == sha))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: format!("commit '{sha}'"),
            })?;
        let idx = source.history.iter().position(|s| s == sha).expect("found above");
        inner.branches.insert(
            name.to_string(),
            Branch {
                files: source.files.clone(),
                history: source.history[..=idx].to_vec(),
            },
        );
        Ok(())
    }

    async fn delete_branch(&self, name: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        if inner.branches.remove(name).is_none() {
            return Err(StoreError::NotFound {
                what: format!("branch '{name}'"),
            });
        }
        Ok(())
    }

    async fn list_branches(&self) -> Result<Vec<BranchSummary>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        let mut branches: Vec<BranchSummary> = inner
            .branches
            .iter()
            .filter_map(|(name, b)| {
                b.history.last().map(|sha| BranchSummary {
                    name: name.clone(),
                    sha: sha.clone(),
                })
            })
            .collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    async fn compare(&self, base: &str, head: &str) -> Result<Comparison, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        let base_history = inner.resolve_history(base)?;
        let head_history = inner.resolve_history(head)?;

        let base_set: HashSet<&String> = base_history.iter().collect();
        let merge_base = head_history
            .iter()
            .rev()
            .find(|sha| base_set.contains(*sha))
            .cloned();

        let ahead: Vec<CommitInfo> = head_history
            .iter()
            .filter(|sha| !base_set.contains(*sha))
            .filter_map(|sha| inner.commits.get(sha).cloned())
            .collect();

        Ok(Comparison {
            ahead_by: ahead.len() as u64,
            commits: ahead,
            merge_base,
        })
    }

    async fn merge(&self, base: &str, head: &str, message: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        if inner.protected.contains(base) {
            return Err(StoreError::Conflict {
                reason: format!("branch '{base}' is protected"),
            });
        }
        let head_state = inner.branches.get(head).cloned().ok_or_else(|| {
            StoreError::NotFound {
                what: format!("branch '{head}'"),
            }
        })?;
        if !inner.branches.contains_key(base) {
            return Err(StoreError::NotFound {
                what: format!("branch '{base}'"),
            });
        }

        let commit = record_commit(&mut inner, message, Utc::now());
        let base_state = inner.branches.get_mut(base).expect("checked above");
        let new_commits: Vec<String> = head_state
            .history
            .iter()
            .filter(|sha| !base_state.history.contains(sha))
            .cloned()
            .collect();
        base_state.files = head_state.files;
        base_state.history.extend(new_commits);
        base_state.history.push(commit);
        Ok(())
    }

    async fn get_commit(&self, sha: &str) -> Result<CommitInfo, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        inner
            .commits
            .get(sha)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: format!("commit '{sha}'"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_sha_write_is_rejected() {
        let store = MemoryStore::new();
        store.seed_file("a.json", b"{}");

        let current = store.get_file("a.json", None).await.unwrap();
        store
            .put_file("a.json", b"{\"x\":1}", "update", Some(&current.sha), None)
            .await
            .unwrap();

        // Second write with the now-stale sha loses the race.
        let err = store
            .put_file("a.json", b"{\"x\":2}", "update", Some(&current.sha), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn blind_overwrite_of_existing_file_is_rejected() {
        let store = MemoryStore::new();
        store.seed_file("a.json", b"{}");
        let err = store
            .put_file("a.json", b"{}", "update", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn branch_create_compare_and_merge() {
        let store = MemoryStore::new();
        store.seed_file("a.json", b"{\"v\":1}");

        let main_sha = store.branch_sha("main").await.unwrap();
        store.create_branch("preview-2024-01-01", &main_sha).await.unwrap();

        let file = store.get_file("a.json", Some("preview-2024-01-01")).await.unwrap();
        store
            .put_file(
                "a.json",
                b"{\"v\":2}",
                "edit on draft",
                Some(&file.sha),
                Some("preview-2024-01-01"),
            )
            .await
            .unwrap();

        let compared = store.compare("main", "preview-2024-01-01").await.unwrap();
        assert_eq!(compared.ahead_by, 1);
        assert_eq!(compared.merge_base.as_deref(), Some(main_sha.as_str()));

        store
            .merge("main", "preview-2024-01-01", "publish")
            .await
            .unwrap();
        assert_eq!(
            store.file_bytes("main", "a.json").unwrap(),
            b"{\"v\":2}".to_vec()
        );
    }

    #[tokio::test]
    async fn duplicate_branch_name_conflicts() {
        let store = MemoryStore::new();
        let sha = store.branch_sha("main").await.unwrap();
        store.create_branch("preview-2024-01-01", &sha).await.unwrap();
        let err = store.create_branch("preview-2024-01-01", &sha).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn missing_branch_lookup_is_not_found() {
        let store = MemoryStore::new();
        let err = store.branch_sha("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
