// preview.rs — Change previews for pending editor operations.
//
// A preview answers "what exactly will this save commit?" before anything
// is written. It runs the same planning code the write path runs and just
// stops short of applying, so the preview and the eventual commit cannot
// disagree.

use yurt_content::write::{self, FileChange, FileOp};
use yurt_content::Record;
use yurt_gitstore::RepoStore;
use yurt_schema::Config;

use crate::error::DraftError;

/// A mutation an editor is about to perform.
#[derive(Debug, Clone)]
pub enum PendingChange<'a> {
    /// Update an existing item (or the singleton record).
    Save(&'a Record),
    /// Create a new item.
    Create(&'a Record),
    /// Delete the item addressed by this identifier.
    Delete(&'a str),
}

/// Roll-up of a plan for the confirmation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviewSummary {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    /// Net byte growth across all files (negative when shrinking).
    pub net_bytes: i64,
}

/// Plan the file changes `change` would commit on `branch`, without
/// applying them.
///
/// Create previews include a freshly generated identifier when a
/// `generated` id field was left empty; the identifier generated at save
/// time will differ.
pub async fn preview_change<S: RepoStore + ?Sized>(
    store: &S,
    config: &Config,
    config_path: &str,
    change: PendingChange<'_>,
    branch: Option<&str>,
) -> Result<Vec<FileChange>, DraftError> {
    let changes = match change {
        PendingChange::Save(record) => {
            write::plan_save(store, config, config_path, record, branch).await?
        }
        PendingChange::Create(record) => {
            write::plan_create(store, config, config_path, record, branch)
                .await?
                .0
        }
        PendingChange::Delete(id) => {
            write::plan_delete(store, config, config_path, id, branch).await?
        }
    };
    tracing::debug!(
        label = %config.label,
        files = changes.len(),
        "previewed pending change"
    );
    Ok(changes)
}

/// Summarize a plan for display.
pub fn summarize(changes: &[FileChange]) -> PreviewSummary {
    let mut summary = PreviewSummary::default();
    for change in changes {
        match change.op {
            FileOp::Create => summary.creates += 1,
            FileOp::Update => summary.updates += 1,
            FileOp::Delete => summary.deletes += 1,
        }
        summary.net_bytes += change.size_delta();
    }
    summary
}
