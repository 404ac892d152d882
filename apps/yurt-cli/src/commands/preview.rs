// preview.rs — Show the exact commits a pending edit would produce.
//
// Runs the same planners the write path runs and stops short of applying,
// so the printed plan is byte-for-byte what a real save would commit.

use std::io::Read;

use anyhow::Context;
use serde_json::Value;
use yurt_content::record::id_of;
use yurt_content::validate::is_id_taken;
use yurt_content::{discovery, fetch_content, validate_record, FileOp, Record};
use yurt_draft::{preview_change, summarize, PendingChange};
use yurt_gitstore::RepoStore;

pub async fn execute<S: RepoStore>(
    store: &S,
    slug: &str,
    record_path: Option<&str>,
    create: bool,
    delete: Option<&str>,
    branch: Option<&str>,
) -> anyhow::Result<()> {
    // Edits land on the active draft unless a branch was named explicitly.
    let draft_name = match branch {
        Some(b) => Some(b.to_string()),
        None => yurt_draft::active_draft(store).await?.map(|d| d.name()),
    };
    let branch = draft_name.as_deref();

    let discovered = discovery::discover(store, branch).await?;
    let entry = discovery::find_by_slug(&discovered, slug)
        .with_context(|| format!("no content type with slug \"{slug}\" (see `yurt configs`)"))?;
    let config = &entry.config;

    let changes = if let Some(id) = delete {
        preview_change(store, config, &entry.path, PendingChange::Delete(id), branch).await?
    } else {
        let record = load_record(record_path)?;

        let issues = validate_record(&config.fields, &record);
        if !issues.is_empty() {
            for issue in &issues {
                eprintln!("  {}: {}", issue.field, issue.message);
            }
            anyhow::bail!("{} validation issue(s); nothing planned", issues.len());
        }

        if create {
            if let Some(id) = id_of(&record, config.id_field()) {
                let items = fetch_content(store, config, &entry.path, branch)
                    .await?
                    .into_many();
                if is_id_taken(&items, config.id_field(), &id, None) {
                    anyhow::bail!("{} \"{id}\" is already taken", config.id_field());
                }
            }
            preview_change(store, config, &entry.path, PendingChange::Create(&record), branch)
                .await?
        } else {
            preview_change(store, config, &entry.path, PendingChange::Save(&record), branch)
                .await?
        }
    };

    println!(
        "Plan for {} on {}:",
        config.label,
        branch.unwrap_or("the default branch")
    );
    for change in &changes {
        let marker = match change.op {
            FileOp::Create => "+",
            FileOp::Update => "~",
            FileOp::Delete => "-",
        };
        println!("  {marker} {} ({:+} bytes)", change.path, change.size_delta());
    }
    let summary = summarize(&changes);
    println!(
        "{} create(s), {} update(s), {} delete(s), {:+} bytes net. Nothing was written.",
        summary.creates, summary.updates, summary.deletes, summary.net_bytes
    );
    Ok(())
}

/// Read the record JSON from a file, or stdin for "-" / no path.
fn load_record(path: Option<&str>) -> anyhow::Result<Record> {
    let text = match path {
        Some("-") | None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("could not read the record from stdin")?;
            text
        }
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("could not read {p}"))?,
    };
    let value: Value = serde_json::from_str(&text).context("record is not valid JSON")?;
    match value {
        Value::Object(record) => Ok(record),
        _ => anyhow::bail!("record must be a JSON object"),
    }
}
