// fetch.rs — Reading content records out of the repository.
//
// Fetch semantics per storage shape:
//   singleton  → one JSON file, one record
//   array      → one JSON file, records selected by the collectionPath query
//   collection → one directory, one record per file (JSON or frontmatter)
//
// Collection reads fan out concurrently, and a single unreadable file is
// logged and skipped — editors see the rest of the list rather than an
// error page.

use futures::future::join_all;
use serde_json::Value;
use yurt_gitstore::{EntryKind, RepoStore};
use yurt_schema::{resolve_path, Config, ConfigKind};

use crate::discovery::CONFIG_SUFFIX;
use crate::error::ContentError;
use crate::frontmatter;
use crate::record::{Content, Record, BODY_KEY, FILENAME_KEY};
use crate::{query, write};

/// Fetch the content a config describes, from `branch` (default branch when
/// `None`).
pub async fn fetch_content<S: RepoStore + ?Sized>(
    store: &S,
    config: &Config,
    config_path: &str,
    branch: Option<&str>,
) -> Result<Content, ContentError> {
    match &config.kind {
        ConfigKind::Singleton { content_file } => {
            let path = resolve_path(config_path, content_file);
            let record = fetch_json_record(store, &path, branch).await?;
            Ok(Content::Single(record))
        }
        ConfigKind::Array {
            content_file,
            collection_path,
        } => {
            let path = resolve_path(config_path, content_file);
            let items = fetch_array_items(store, &path, collection_path, branch).await?;
            Ok(Content::Many(items))
        }
        ConfigKind::Collection { template, .. } => {
            let template_path = resolve_path(config_path, template);
            let items = fetch_collection_items(store, &template_path, branch).await?;
            Ok(Content::Many(items))
        }
    }
}

/// Read and parse one JSON file into a record.
async fn fetch_json_record<S: RepoStore + ?Sized>(
    store: &S,
    path: &str,
    branch: Option<&str>,
) -> Result<Record, ContentError> {
    let file = store.get_file(path, branch).await?;
    let value: Value = serde_json::from_slice(&file.bytes).map_err(|source| {
        ContentError::Parse {
            path: path.to_string(),
            source,
        }
    })?;
    match value {
        Value::Object(record) => Ok(record),
        _ => Err(ContentError::NotARecord {
            path: path.to_string(),
        }),
    }
}

async fn fetch_array_items<S: RepoStore + ?Sized>(
    store: &S,
    path: &str,
    collection_path: &str,
    branch: Option<&str>,
) -> Result<Vec<Record>, ContentError> {
    let file = store.get_file(path, branch).await?;
    let document: Value = serde_json::from_slice(&file.bytes).map_err(|source| {
        ContentError::Parse {
            path: path.to_string(),
            source,
        }
    })?;

    let matches = query::select(&document, collection_path);
    if matches.is_empty() {
        // An empty selection is not an error — partially-configured repos
        // rely on this — but it may also mean a broken query expression.
        tracing::warn!(path, collection_path, "collectionPath selected nothing");
        return Ok(Vec::new());
    }

    // A query that matched one array yields its elements; a wildcard that
    // matched several arrays flattens one level.
    let items: Vec<&Value> = if matches.iter().all(|v| v.is_array()) {
        matches
            .iter()
            .filter_map(|v| v.as_array())
            .flatten()
            .collect()
    } else {
        matches
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record.clone()),
            other => {
                tracing::warn!(path, collection_path, ?other, "skipping non-record item");
                None
            }
        })
        .collect())
}

async fn fetch_collection_items<S: RepoStore + ?Sized>(
    store: &S,
    template_path: &str,
    branch: Option<&str>,
) -> Result<Vec<Record>, ContentError> {
    let dir = write::parent_dir(template_path);
    let template_name = write::file_name(template_path);
    let ext = write::extension(template_path);

    let entries = store.list_dir(dir, branch).await?;
    let content_files: Vec<_> = entries
        .into_iter()
        .filter(|entry| {
            entry.kind == EntryKind::Blob
                && !entry.name.starts_with('_')
                && entry.name != template_name
                && !entry.name.ends_with(CONFIG_SUFFIX)
                && entry.name.ends_with(&ext)
        })
        .collect();

    // Independent reads: fetch every file concurrently and keep whatever
    // parses. One broken file must not empty the whole listing.
    let fetches = content_files.iter().map(|entry| async {
        match fetch_collection_file(store, &entry.path, &entry.name, &ext, branch).await {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %entry.path, error = %e, "skipping unreadable collection file");
                None
            }
        }
    });

    Ok(join_all(fetches).await.into_iter().flatten().collect())
}

async fn fetch_collection_file<S: RepoStore + ?Sized>(
    store: &S,
    path: &str,
    name: &str,
    ext: &str,
    branch: Option<&str>,
) -> Result<Record, ContentError> {
    let mut record = if write::is_markdown_ext(ext) {
        let file = store.get_file(path, branch).await?;
        let (fields, body) = frontmatter::parse(path, &file.text())?;
        let mut record = fields;
        record.insert(BODY_KEY.to_string(), Value::String(body));
        record
    } else {
        fetch_json_record(store, path, branch).await?
    };
    record.insert(FILENAME_KEY.to_string(), Value::String(name.to_string()));
    Ok(record)
}
