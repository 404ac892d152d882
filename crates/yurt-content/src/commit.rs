// commit.rs — Commit orchestration: the sha-fetch-then-write protocol.
//
// The backing store rejects blind writes: updating an existing file
// requires presenting its current blob sha. Every write and delete in the
// engine goes through these two functions so the handshake can't be
// skipped. A 404 on the pre-fetch during a write means "brand-new file",
// which is the one case where no sha is sent.

use yurt_gitstore::RepoStore;

use crate::error::ContentError;

/// What a commit does, for message generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAction {
    Create,
    Update,
    Delete,
    Rename,
}

impl CommitAction {
    fn verb(self) -> &'static str {
        match self {
            CommitAction::Create => "Create",
            CommitAction::Update => "Update",
            CommitAction::Delete => "Delete",
            CommitAction::Rename => "Rename",
        }
    }
}

/// Deterministic commit message: "Update Blog Posts: my-post via Yurt CMS".
pub fn commit_message(action: CommitAction, label: &str, identifier: Option<&str>) -> String {
    match identifier {
        Some(id) => format!("{} {}: {} via Yurt CMS", action.verb(), label, id),
        None => format!("{} {} via Yurt CMS", action.verb(), label),
    }
}

/// Create or update `path` on `branch` as a single commit.
pub async fn write_file<S: RepoStore + ?Sized>(
    store: &S,
    path: &str,
    content: &[u8],
    message: &str,
    branch: Option<&str>,
) -> Result<(), ContentError> {
    // Pre-fetch the current sha. Absence is not an error here: it means
    // the write will create the file.
    let sha = match store.get_file(path, branch).await {
        Ok(existing) => Some(existing.sha),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };

    store
        .put_file(path, content, message, sha.as_deref(), branch)
        .await?;
    tracing::debug!(path, branch = branch.unwrap_or("default"), "committed write");
    Ok(())
}

/// Delete `path` on `branch` as a single commit.
///
/// Unlike writes, deletion of a missing file is an error: the sha
/// pre-fetch propagates its NotFound.
pub async fn remove_file<S: RepoStore + ?Sized>(
    store: &S,
    path: &str,
    message: &str,
    branch: Option<&str>,
) -> Result<(), ContentError> {
    let existing = store.get_file(path, branch).await?;
    store
        .delete_file(path, message, &existing.sha, branch)
        .await?;
    tracing::debug!(path, branch = branch.unwrap_or("default"), "committed delete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yurt_gitstore::MemoryStore;

    #[test]
    fn message_formats() {
        assert_eq!(
            commit_message(CommitAction::Update, "Blog Posts", Some("my-post")),
            "Update Blog Posts: my-post via Yurt CMS"
        );
        assert_eq!(
            commit_message(CommitAction::Create, "Settings", None),
            "Create Settings via Yurt CMS"
        );
    }

    #[tokio::test]
    async fn write_creates_then_updates() {
        let store = MemoryStore::new();

        write_file(&store, "a.json", b"{\"v\":1}\n", "create", None)
            .await
            .unwrap();
        // Second write must pick up the new sha transparently.
        write_file(&store, "a.json", b"{\"v\":2}\n", "update", None)
            .await
            .unwrap();

        assert_eq!(
            store.file_bytes("main", "a.json").unwrap(),
            b"{\"v\":2}\n".to_vec()
        );
    }

    #[tokio::test]
    async fn remove_missing_file_propagates_not_found() {
        let store = MemoryStore::new();
        let err = remove_file(&store, "ghost.json", "delete", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
