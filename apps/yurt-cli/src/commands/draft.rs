// draft.rs — Draft subcommands: status, diff, ensure, discard.

use clap::Subcommand;
use yurt_draft::ChangeKind;
use yurt_gitstore::RepoStore;

#[derive(Subcommand)]
pub enum DraftCommands {
    /// Show the active draft and how it relates to the default branch.
    Status,
    /// Show what the active draft changes, per content type.
    Diff,
    /// Create a draft branch for today if none is active.
    Ensure,
    /// Delete the active draft without publishing it.
    Discard {
        /// Skip the "are you sure" check.
        #[arg(long)]
        yes: bool,
    },
}

pub async fn execute<S: RepoStore>(cmd: &DraftCommands, store: &S) -> anyhow::Result<()> {
    match cmd {
        DraftCommands::Status => status(store).await,
        DraftCommands::Diff => diff(store).await,
        DraftCommands::Ensure => ensure(store).await,
        DraftCommands::Discard { yes } => discard(store, *yes).await,
    }
}

async fn status<S: RepoStore>(store: &S) -> anyhow::Result<()> {
    let Some(draft) = yurt_draft::active_draft(store).await? else {
        println!("No active draft.");
        return Ok(());
    };

    let status = yurt_draft::draft_status(store, &draft).await?;
    println!("Draft:   {}", draft.name());
    println!("Commits: {} ahead of the default branch", status.ahead.len());
    if let Some(last) = &status.last_commit {
        println!(
            "Updated: {} ({})",
            last.date.format("%Y-%m-%d %H:%M UTC"),
            last.author_name
        );
    }
    if status.behind_main {
        println!("Warning: the default branch moved since this draft was cut.");
    }
    if status.stale {
        println!(
            "Warning: no activity for {} days; consider publishing or discarding.",
            yurt_draft::STALE_AFTER_DAYS
        );
    }
    for commit in &status.ahead {
        println!("  {}  {}", &commit.sha[..7.min(commit.sha.len())], commit.message);
    }
    Ok(())
}

async fn diff<S: RepoStore>(store: &S) -> anyhow::Result<()> {
    let Some(draft) = yurt_draft::active_draft(store).await? else {
        println!("No active draft.");
        return Ok(());
    };

    let comparison = yurt_draft::compare_draft(store, &draft.name()).await;
    if comparison.is_empty() && comparison.degraded.is_empty() {
        println!("{} has no content changes.", comparison.branch);
        return Ok(());
    }

    for config in &comparison.configs {
        println!("{} ({}):", config.label, config.slug);
        for change in &config.changes {
            let marker = match change.kind {
                ChangeKind::Added => "+",
                ChangeKind::Modified => "~",
                ChangeKind::Removed => "-",
            };
            println!("  {marker} {}", change.id);
        }
    }
    for slug in &comparison.degraded {
        println!("! {slug}: could not be compared");
    }
    Ok(())
}

async fn ensure<S: RepoStore>(store: &S) -> anyhow::Result<()> {
    let draft = yurt_draft::ensure_draft(store).await?;
    println!("Active draft: {}", draft.name());
    Ok(())
}

async fn discard<S: RepoStore>(store: &S, yes: bool) -> anyhow::Result<()> {
    let Some(draft) = yurt_draft::active_draft(store).await? else {
        println!("No active draft.");
        return Ok(());
    };
    let name = draft.name();

    if !yes {
        let status = yurt_draft::draft_status(store, &draft).await?;
        if !status.ahead.is_empty() {
            anyhow::bail!(
                "{name} carries {} unpublished commit(s); pass --yes to discard them",
                status.ahead.len()
            );
        }
    }

    yurt_draft::discard(store, &name).await?;
    println!("Discarded {name}.");
    Ok(())
}
