// configs.rs — List the content types a repository declares.

use yurt_content::discovery;
use yurt_gitstore::RepoStore;

pub async fn execute<S: RepoStore>(store: &S, branch: Option<&str>) -> anyhow::Result<()> {
    let discovered = discovery::discover(store, branch).await?;
    if discovered.is_empty() {
        println!("No content types declared (no *.yurt.json files found).");
        return Ok(());
    }

    println!("{:<24} {:<12} {:<28} PATH", "SLUG", "SHAPE", "LABEL");
    for entry in &discovered {
        println!(
            "{:<24} {:<12} {:<28} {}",
            entry.slug,
            entry.config.kind.name(),
            entry.config.label,
            entry.path
        );
    }
    Ok(())
}
