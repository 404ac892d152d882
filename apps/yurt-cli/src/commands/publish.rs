// publish.rs — Merge the active draft into the default branch.

use yurt_gitstore::RepoStore;

pub async fn execute<S: RepoStore>(store: &S, force: bool) -> anyhow::Result<()> {
    let Some(draft) = yurt_draft::active_draft(store).await? else {
        anyhow::bail!("no active draft to publish");
    };
    let name = draft.name();

    let status = yurt_draft::draft_status(store, &draft).await?;
    if status.behind_main && !force {
        anyhow::bail!(
            "the default branch moved since {name} was cut; \
             review `yurt draft diff` and pass --force to publish anyway"
        );
    }

    let outcome = yurt_draft::publish(store, &name).await?;
    println!(
        "Published {} ({} commit(s) merged).",
        outcome.branch, outcome.commits
    );
    Ok(())
}
