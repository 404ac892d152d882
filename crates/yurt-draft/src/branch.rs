// branch.rs — Draft branch lifecycle.
//
// Drafts live on dated branches named `preview-YYYY-MM-DD`, with a numeric
// suffix (`-2`, `-3`, ...) when the plain name is taken. The active draft
// is the newest by date, then by suffix. Publishing merges the draft into
// the default branch and deletes it; discarding just deletes it.
//
// Publish and discard refuse to touch anything that does not parse as a
// draft name, so the default branch is structurally out of reach.

use chrono::{Duration, NaiveDate, Utc};
use yurt_gitstore::{CommitInfo, RepoStore};

use crate::error::DraftError;

/// Name prefix every draft branch carries.
pub const DRAFT_PREFIX: &str = "preview-";

/// A draft older than this (by last commit date) is flagged stale.
pub const STALE_AFTER_DAYS: i64 = 7;

const MAX_NAME_ATTEMPTS: u32 = 50;

/// A parsed draft branch name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DraftBranch {
    /// Creation date encoded in the name.
    pub date: NaiveDate,
    /// Same-day sequence number; the bare name is sequence 1.
    pub seq: u32,
}

impl DraftBranch {
    pub fn name(&self) -> String {
        if self.seq <= 1 {
            format!("{DRAFT_PREFIX}{}", self.date.format("%Y-%m-%d"))
        } else {
            format!("{DRAFT_PREFIX}{}-{}", self.date.format("%Y-%m-%d"), self.seq)
        }
    }
}

/// Parse a branch name as a draft name; anything else is `None`.
pub fn parse_draft_name(name: &str) -> Option<DraftBranch> {
    let rest = name.strip_prefix(DRAFT_PREFIX)?;
    // Branch names come straight from the host, so slicing must stay on
    // char boundaries; `get` rejects anything that is not ASCII there.
    let (date_part, seq) = if rest.len() > 10 {
        let date_part = rest.get(..10)?;
        let seq: u32 = rest.get(10..)?.strip_prefix('-')?.parse().ok()?;
        // `-0` and `-1` never appear; the bare name is sequence 1.
        if seq < 2 {
            return None;
        }
        (date_part, seq)
    } else {
        (rest, 1)
    };
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some(DraftBranch { date, seq })
}

/// Every draft branch in the repository, oldest first.
pub async fn list_drafts<S: RepoStore + ?Sized>(store: &S) -> Result<Vec<DraftBranch>, DraftError> {
    let mut drafts: Vec<DraftBranch> = store
        .list_branches()
        .await?
        .into_iter()
        .filter_map(|b| parse_draft_name(&b.name))
        .collect();
    drafts.sort();
    Ok(drafts)
}

/// The active draft: newest date, then highest sequence.
pub async fn active_draft<S: RepoStore + ?Sized>(
    store: &S,
) -> Result<Option<DraftBranch>, DraftError> {
    Ok(list_drafts(store).await?.pop())
}

/// The active draft, creating one named for today when none exists.
pub async fn ensure_draft<S: RepoStore + ?Sized>(store: &S) -> Result<DraftBranch, DraftError> {
    ensure_draft_on(store, Utc::now().date_naive()).await
}

/// [`ensure_draft`] with an explicit "today", so date handling is testable.
pub async fn ensure_draft_on<S: RepoStore + ?Sized>(
    store: &S,
    today: NaiveDate,
) -> Result<DraftBranch, DraftError> {
    if let Some(active) = active_draft(store).await? {
        return Ok(active);
    }
    allocate_draft(store, today).await
}

/// Create a fresh draft branch for `today` off the default branch tip.
async fn allocate_draft<S: RepoStore + ?Sized>(
    store: &S,
    today: NaiveDate,
) -> Result<DraftBranch, DraftError> {
    let default = store.default_branch().await?;
    let base_sha = store.branch_sha(&default).await?;

    // The plain dated name first, then suffixed names until one sticks.
    // Losing the create race to a concurrent editor shows up as Conflict,
    // which the next attempt absorbs.
    for seq in 1..=MAX_NAME_ATTEMPTS {
        let draft = DraftBranch { date: today, seq };
        match store.create_branch(&draft.name(), &base_sha).await {
            Ok(()) => {
                tracing::info!(branch = %draft.name(), base = %default, "created draft branch");
                return Ok(draft);
            }
            Err(e) if matches!(e, yurt_gitstore::StoreError::Conflict { .. }) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(DraftError::NameExhausted {
        date: today.format("%Y-%m-%d").to_string(),
    })
}

/// The commits a draft carries beyond the default branch, oldest first.
pub async fn commits_since_main<S: RepoStore + ?Sized>(
    store: &S,
    draft: &str,
) -> Result<Vec<CommitInfo>, DraftError> {
    let default = store.default_branch().await?;
    let comparison = store.compare(&default, draft).await?;
    Ok(comparison.commits)
}

/// A draft's standing relative to the default branch.
#[derive(Debug, Clone)]
pub struct DraftStatus {
    pub branch: DraftBranch,
    /// Commits the draft is ahead of the default branch.
    pub ahead: Vec<CommitInfo>,
    /// The default branch moved since the draft was cut; publishing may
    /// overwrite those changes.
    pub behind_main: bool,
    /// No activity for [`STALE_AFTER_DAYS`]; the editor should suggest
    /// publishing or discarding.
    pub stale: bool,
    pub last_commit: Option<CommitInfo>,
}

/// Compute the status of `draft` against the default branch.
pub async fn draft_status<S: RepoStore + ?Sized>(
    store: &S,
    draft: &DraftBranch,
) -> Result<DraftStatus, DraftError> {
    let name = draft.name();
    let default = store.default_branch().await?;

    let ahead = store.compare(&default, &name).await?.commits;
    let behind_main = store.compare(&name, &default).await?.ahead_by > 0;

    let tip_sha = store.branch_sha(&name).await?;
    let last_commit = match store.get_commit(&tip_sha).await {
        Ok(commit) => Some(commit),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };

    let stale = last_commit
        .as_ref()
        .map(|c| Utc::now() - c.date >= Duration::days(STALE_AFTER_DAYS))
        .unwrap_or(false);

    Ok(DraftStatus {
        branch: draft.clone(),
        ahead,
        behind_main,
        stale,
        last_commit,
    })
}

/// What a publish did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub branch: String,
    /// How many draft commits landed on the default branch.
    pub commits: u64,
}

/// Merge `draft` into the default branch and delete it.
pub async fn publish<S: RepoStore + ?Sized>(
    store: &S,
    draft: &str,
) -> Result<PublishOutcome, DraftError> {
    if parse_draft_name(draft).is_none() {
        return Err(DraftError::NotADraft {
            branch: draft.to_string(),
        });
    }
    let default = store.default_branch().await?;

    let comparison = store.compare(&default, draft).await?;
    if comparison.ahead_by == 0 {
        return Err(DraftError::NothingToPublish {
            branch: draft.to_string(),
        });
    }

    let message = format!("Publish {draft} via Yurt CMS");
    store.merge(&default, draft, &message).await?;
    tracing::info!(branch = draft, commits = comparison.ahead_by, "published draft");

    // The merge already landed; a failed branch cleanup should not turn a
    // successful publish into an error.
    if let Err(e) = store.delete_branch(draft).await {
        tracing::warn!(branch = draft, error = %e, "published draft branch was not deleted");
    }

    Ok(PublishOutcome {
        branch: draft.to_string(),
        commits: comparison.ahead_by,
    })
}

/// Delete `draft` without merging.
pub async fn discard<S: RepoStore + ?Sized>(store: &S, draft: &str) -> Result<(), DraftError> {
    if parse_draft_name(draft).is_none() {
        return Err(DraftError::NotADraft {
            branch: draft.to_string(),
        });
    }
    store.delete_branch(draft).await?;
    tracing::info!(branch = draft, "discarded draft");
    Ok(())
}
