// show.rs — Print one content type's records as JSON.

use anyhow::Context;
use yurt_content::{discovery, fetch_content, Content};
use yurt_gitstore::RepoStore;

pub async fn execute<S: RepoStore>(
    store: &S,
    slug: &str,
    branch: Option<&str>,
) -> anyhow::Result<()> {
    let discovered = discovery::discover(store, branch).await?;
    let entry = discovery::find_by_slug(&discovered, slug)
        .with_context(|| format!("no content type with slug '{slug}'"))?;

    let content = fetch_content(store, &entry.config, &entry.path, branch).await?;
    let rendered = match content {
        Content::Single(record) => serde_json::to_string_pretty(&record)?,
        Content::Many(items) => serde_json::to_string_pretty(&items)?,
    };
    println!("{rendered}");
    Ok(())
}
