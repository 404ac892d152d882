// error.rs — Error types for the draft lifecycle.

use thiserror::Error;
use yurt_content::ContentError;
use yurt_gitstore::StoreError;

/// Errors from draft branch management, comparison, or previewing.
#[derive(Debug, Error)]
pub enum DraftError {
    /// The backing store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Content could not be read or planned.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// An operation needed an active draft and none exists.
    #[error("no active draft branch")]
    NoDraft,

    /// The draft has no commits beyond the default branch.
    #[error("draft '{branch}' has no changes to publish")]
    NothingToPublish { branch: String },

    /// Publish and discard only touch draft branches; anything else is
    /// refused outright so the default branch can never be deleted.
    #[error("'{branch}' is not a draft branch")]
    NotADraft { branch: String },

    /// Every candidate draft name for today is already taken.
    #[error("could not allocate a draft branch name for {date}")]
    NameExhausted { date: String },
}

impl DraftError {
    pub fn is_not_found(&self) -> bool {
        match self {
            DraftError::Store(e) => e.is_not_found(),
            DraftError::Content(e) => e.is_not_found(),
            DraftError::NoDraft => true,
            _ => false,
        }
    }
}
