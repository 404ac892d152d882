//! # yurt-draft
//!
//! Draft lifecycle for Yurt: dated draft branches, content-level draft
//! comparison, and pre-commit change previews.
//!
//! ## Key components
//!
//! - [`branch`] — create, find, publish, and discard `preview-YYYY-MM-DD`
//!   branches. The active draft is the newest by date, then by same-day
//!   sequence suffix.
//! - [`compare::compare_draft`] — what a draft changes, expressed as
//!   records per content type rather than file diffs.
//! - [`preview::preview_change`] — the exact file commits a pending save,
//!   create, or delete would produce, computed by the same planner the
//!   write path uses.

pub mod branch;
pub mod compare;
pub mod error;
pub mod preview;

pub use branch::{
    active_draft, commits_since_main, discard, draft_status, ensure_draft, list_drafts, publish,
    DraftBranch, DraftStatus, PublishOutcome, DRAFT_PREFIX, STALE_AFTER_DAYS,
};
pub use compare::{
    compare_draft, ChangeKind, ConfigComparison, DraftComparison, ItemChange, SINGLETON_ID,
};
pub use error::DraftError;
pub use preview::{preview_change, summarize, PendingChange, PreviewSummary};
