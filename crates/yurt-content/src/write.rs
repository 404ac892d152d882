// write.rs — Mutation planning and application.
//
// Every mutation is computed in two stages. Planning produces a list of
// FileChange values: exact file paths, the operation, the full before and
// after text, and the commit message. Applying walks the plan through the
// commit orchestrator. The change-preview surface renders the same plans
// without applying them, so a preview can never show something different
// from what a save would commit.
//
// Re-serialization discipline: array mutations edit the parsed document in
// place and re-serialize the whole document, so sibling keys and key order
// survive untouched.

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use yurt_gitstore::{RepoStore, StoreError};
use yurt_schema::{resolve_path, slugify, Config, ConfigKind};

use crate::commit::{self, commit_message, CommitAction};
use crate::error::ContentError;
use crate::record::{id_of, strip_reserved, value_to_id, Record, BODY_KEY, FILENAME_KEY};
use crate::{fetch, frontmatter, query, template};

/// What a planned change does to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Create,
    Update,
    Delete,
}

/// One planned file change: path, operation, full before/after text, and
/// the commit message that will carry it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileChange {
    pub path: String,
    pub op: FileOp,
    pub before: Option<String>,
    pub after: Option<String>,
    pub message: String,
}

impl FileChange {
    /// Byte-size delta this change introduces (negative for shrinkage).
    pub fn size_delta(&self) -> i64 {
        let before = self.before.as_deref().map_or(0, str::len) as i64;
        let after = self.after.as_deref().map_or(0, str::len) as i64;
        after - before
    }
}

/// Plan the changes that saving (updating) `record` would commit.
pub async fn plan_save<S: RepoStore + ?Sized>(
    store: &S,
    config: &Config,
    config_path: &str,
    record: &Record,
    branch: Option<&str>,
) -> Result<Vec<FileChange>, ContentError> {
    match &config.kind {
        ConfigKind::Singleton { content_file } => {
            let path = resolve_path(config_path, content_file);
            let (before, exists) = read_optional(store, &path, branch).await?;
            let after = to_json_text(&path, &strip_reserved(record))?;
            let op = if exists { FileOp::Update } else { FileOp::Create };
            Ok(vec![FileChange {
                path,
                op,
                before,
                after: Some(after),
                message: commit_message(CommitAction::Update, &config.label, None),
            }])
        }
        ConfigKind::Array {
            content_file,
            collection_path,
        } => {
            let path = resolve_path(config_path, content_file);
            let id = required_id(config, record)?;
            let replacement = Value::Object(strip_reserved(record));

            let (before, mut document) = read_document(store, &path, branch).await?;
            mutate_matching_item(config, &path, &mut document, collection_path, &id, |slot| {
                *slot = replacement.clone();
            })?;

            let after = document_text(&path, &document)?;
            Ok(vec![FileChange {
                path,
                op: FileOp::Update,
                before: Some(before),
                after: Some(after),
                message: commit_message(CommitAction::Update, &config.label, Some(&id)),
            }])
        }
        ConfigKind::Collection {
            template: template_ref,
            filename_pattern,
        } => {
            let template_path = resolve_path(config_path, template_ref);
            let dir = parent_dir(&template_path);
            let ext = extension(&template_path);

            let current_name = record
                .get(FILENAME_KEY)
                .and_then(Value::as_str)
                .ok_or(ContentError::MissingFilename { operation: "save" })?
                .to_string();
            let current_path = join_dir(dir, &current_name);

            let after = render_record_file(&ext, &current_path, record)?;
            let before = store.get_file(&current_path, branch).await?.text();
            let id = id_of(record, config.id_field());

            // A filename pattern can move the file when the fields feeding
            // it changed. A move is a delete of the old path plus a create
            // of the new one.
            let mut desired_name = filename_pattern
                .as_deref()
                .map(|pattern| template::substitute(pattern, record))
                .unwrap_or_else(|| current_name.clone());
            if !desired_name.ends_with(&ext) {
                desired_name.push_str(&ext);
            }

            if desired_name != current_name {
                let message = commit_message(CommitAction::Rename, &config.label, id.as_deref());
                return Ok(vec![
                    FileChange {
                        path: current_path,
                        op: FileOp::Delete,
                        before: Some(before),
                        after: None,
                        message: message.clone(),
                    },
                    FileChange {
                        path: join_dir(dir, &desired_name),
                        op: FileOp::Create,
                        before: None,
                        after: Some(after),
                        message,
                    },
                ]);
            }

            Ok(vec![FileChange {
                path: current_path,
                op: FileOp::Update,
                before: Some(before),
                after: Some(after),
                message: commit_message(CommitAction::Update, &config.label, id.as_deref()),
            }])
        }
    }
}

/// Plan an array item update addressed by position instead of identifier.
///
/// The fallback addressing mode for items whose identifier field is
/// absent or not unique; only the array shape supports it.
pub async fn plan_save_at<S: RepoStore + ?Sized>(
    store: &S,
    config: &Config,
    config_path: &str,
    record: &Record,
    index: usize,
    branch: Option<&str>,
) -> Result<Vec<FileChange>, ContentError> {
    let ConfigKind::Array {
        content_file,
        collection_path,
    } = &config.kind
    else {
        return Err(ContentError::UnsupportedOperation {
            shape: config.kind.name(),
            operation: "save by position",
        });
    };

    let path = resolve_path(config_path, content_file);
    let replacement = Value::Object(strip_reserved(record));

    let (before, mut document) = read_document(store, &path, branch).await?;
    let mut saw_array = false;
    let replaced = query::with_array_mut(&mut document, collection_path, &mut |items| {
        saw_array = true;
        match items.get_mut(index) {
            Some(slot) => {
                *slot = replacement.clone();
                true
            }
            None => false,
        }
    });
    if !replaced {
        if !saw_array {
            return Err(ContentError::QueryUnmatched {
                path: collection_path.clone(),
                file: path,
            });
        }
        return Err(ContentError::ItemNotFound {
            id: format!("#{index}"),
            label: config.label.clone(),
        });
    }

    let after = document_text(&path, &document)?;
    let id = id_of(record, config.id_field());
    Ok(vec![FileChange {
        path,
        op: FileOp::Update,
        before: Some(before),
        after: Some(after),
        message: commit_message(CommitAction::Update, &config.label, id.as_deref()),
    }])
}

/// Plan and apply a position-addressed array item save.
pub async fn save_item_at<S: RepoStore + ?Sized>(
    store: &S,
    config: &Config,
    config_path: &str,
    record: &Record,
    index: usize,
    branch: Option<&str>,
) -> Result<Vec<FileChange>, ContentError> {
    let changes = plan_save_at(store, config, config_path, record, index, branch).await?;
    apply_changes(store, &changes, branch).await?;
    tracing::info!(label = %config.label, index, "saved item by position");
    Ok(changes)
}

/// Plan the changes that creating a new item would commit.
///
/// Returns the plan together with the finalized record (identifier filled
/// in when the caller left it empty).
pub async fn plan_create<S: RepoStore + ?Sized>(
    store: &S,
    config: &Config,
    config_path: &str,
    record: &Record,
    branch: Option<&str>,
) -> Result<(Vec<FileChange>, Record), ContentError> {
    match &config.kind {
        ConfigKind::Singleton { .. } => Err(ContentError::UnsupportedOperation {
            shape: "singleton",
            operation: "create",
        }),
        ConfigKind::Array {
            content_file,
            collection_path,
        } => {
            let path = resolve_path(config_path, content_file);
            let finalized = finalize_record(config, record);
            let id = required_id(config, &finalized)?;
            let item = Value::Object(strip_reserved(&finalized));

            let (before, mut document) = read_document(store, &path, branch).await?;
            let appended = query::with_array_mut(&mut document, collection_path, &mut |items| {
                items.push(item.clone());
                true
            });
            if !appended {
                return Err(ContentError::QueryUnmatched {
                    path: collection_path.clone(),
                    file: path,
                });
            }

            let after = document_text(&path, &document)?;
            let changes = vec![FileChange {
                path,
                op: FileOp::Update,
                before: Some(before),
                after: Some(after),
                message: commit_message(CommitAction::Create, &config.label, Some(&id)),
            }];
            Ok((changes, finalized))
        }
        ConfigKind::Collection {
            template: template_ref,
            filename_pattern,
        } => {
            let template_path = resolve_path(config_path, template_ref);
            let dir = parent_dir(&template_path);
            let ext = extension(&template_path);

            let caller = finalize_record(config, record);
            let id = required_id(config, &caller)?;

            // New files start from the template: its frontmatter supplies
            // defaults and its body supplies the initial prose, with
            // {{placeholder}}s resolved against the caller's fields.
            // Caller-supplied fields win over template defaults.
            let template_file = store.get_file(&template_path, branch).await?;
            let mut finalized = if is_markdown_ext(&ext) {
                let (defaults, template_body) =
                    frontmatter::parse(&template_path, &template_file.text())?;
                let mut merged = template::substitute_fields(&defaults, &caller);
                for (key, value) in &caller {
                    merged.insert(key.clone(), value.clone());
                }
                let body_given = caller
                    .get(BODY_KEY)
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.is_empty());
                if !body_given && !template_body.is_empty() {
                    merged.insert(
                        BODY_KEY.to_string(),
                        Value::String(template::substitute(&template_body, &caller)),
                    );
                }
                merged
            } else {
                let defaults: Value = serde_json::from_slice(&template_file.bytes)
                    .map_err(|source| ContentError::Parse {
                        path: template_path.clone(),
                        source,
                    })?;
                let Value::Object(defaults) = defaults else {
                    return Err(ContentError::NotARecord {
                        path: template_path.clone(),
                    });
                };
                let mut merged = template::substitute_fields(&defaults, &caller);
                for (key, value) in &caller {
                    merged.insert(key.clone(), value.clone());
                }
                merged
            };

            let mut name = match filename_pattern.as_deref() {
                Some(pattern) => template::substitute(pattern, &finalized),
                None => format!("{}{ext}", slugify(&id)),
            };
            if !name.ends_with(&ext) {
                name.push_str(&ext);
            }
            finalized.insert(FILENAME_KEY.to_string(), Value::String(name.clone()));
            let path = join_dir(dir, &name);

            // Creating over an existing file would silently clobber it.
            match store.get_file(&path, branch).await {
                Ok(_) => {
                    return Err(StoreError::Conflict {
                        reason: format!("{path} already exists"),
                    }
                    .into())
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }

            let after = render_record_file(&ext, &path, &finalized)?;
            let changes = vec![FileChange {
                path,
                op: FileOp::Create,
                before: None,
                after: Some(after),
                message: commit_message(CommitAction::Create, &config.label, Some(&id)),
            }];
            Ok((changes, finalized))
        }
    }
}

/// Plan the changes that deleting the item addressed by `id` would commit.
pub async fn plan_delete<S: RepoStore + ?Sized>(
    store: &S,
    config: &Config,
    config_path: &str,
    id: &str,
    branch: Option<&str>,
) -> Result<Vec<FileChange>, ContentError> {
    match &config.kind {
        ConfigKind::Singleton { .. } => Err(ContentError::UnsupportedOperation {
            shape: "singleton",
            operation: "delete",
        }),
        ConfigKind::Array {
            content_file,
            collection_path,
        } => {
            let path = resolve_path(config_path, content_file);
            let (before, mut document) = read_document(store, &path, branch).await?;

            let id_field = config.id_field().to_string();
            let target = id.to_string();
            let matched = query::with_array_mut(&mut document, collection_path, &mut |items| {
                let len_before = items.len();
                items.retain(|item| !item_has_id(item, &id_field, &target));
                items.len() < len_before
            });
            if !matched {
                // Distinguish a broken query from a missing item: check
                // whether any array was reachable at all.
                let any_array = query::select(&document, collection_path)
                    .iter()
                    .any(|v| v.is_array());
                if !any_array {
                    return Err(ContentError::QueryUnmatched {
                        path: collection_path.clone(),
                        file: path,
                    });
                }
                return Err(ContentError::ItemNotFound {
                    id: id.to_string(),
                    label: config.label.clone(),
                });
            }

            let after = document_text(&path, &document)?;
            Ok(vec![FileChange {
                path,
                op: FileOp::Update,
                before: Some(before),
                after: Some(after),
                message: commit_message(CommitAction::Delete, &config.label, Some(id)),
            }])
        }
        ConfigKind::Collection {
            template: template_ref,
            ..
        } => {
            let template_path = resolve_path(config_path, template_ref);
            let dir = parent_dir(&template_path);

            // The file is addressed by its record id, so find the record
            // that carries it.
            let items = fetch::fetch_content(store, config, config_path, branch)
                .await?
                .into_many();
            let record = items
                .iter()
                .find(|item| id_of(item, config.id_field()).as_deref() == Some(id))
                .ok_or_else(|| ContentError::ItemNotFound {
                    id: id.to_string(),
                    label: config.label.clone(),
                })?;
            let name = record
                .get(FILENAME_KEY)
                .and_then(Value::as_str)
                .ok_or(ContentError::MissingFilename {
                    operation: "delete",
                })?;

            let path = join_dir(dir, name);
            let before = store.get_file(&path, branch).await?.text();
            Ok(vec![FileChange {
                path,
                op: FileOp::Delete,
                before: Some(before),
                after: None,
                message: commit_message(CommitAction::Delete, &config.label, Some(id)),
            }])
        }
    }
}

/// Apply a plan, one commit per change, in plan order.
pub async fn apply_changes<S: RepoStore + ?Sized>(
    store: &S,
    changes: &[FileChange],
    branch: Option<&str>,
) -> Result<(), ContentError> {
    for change in changes {
        match change.op {
            FileOp::Create | FileOp::Update => {
                let text = change.after.as_deref().unwrap_or_default();
                commit::write_file(store, &change.path, text.as_bytes(), &change.message, branch)
                    .await?;
            }
            FileOp::Delete => {
                commit::remove_file(store, &change.path, &change.message, branch).await?;
            }
        }
    }
    Ok(())
}

/// Plan and apply an item save.
pub async fn save_item<S: RepoStore + ?Sized>(
    store: &S,
    config: &Config,
    config_path: &str,
    record: &Record,
    branch: Option<&str>,
) -> Result<Vec<FileChange>, ContentError> {
    let changes = plan_save(store, config, config_path, record, branch).await?;
    apply_changes(store, &changes, branch).await?;
    tracing::info!(label = %config.label, changes = changes.len(), "saved item");
    Ok(changes)
}

/// Plan and apply an item creation; returns the finalized record.
pub async fn create_item<S: RepoStore + ?Sized>(
    store: &S,
    config: &Config,
    config_path: &str,
    record: &Record,
    branch: Option<&str>,
) -> Result<Record, ContentError> {
    let (changes, finalized) = plan_create(store, config, config_path, record, branch).await?;
    apply_changes(store, &changes, branch).await?;
    tracing::info!(label = %config.label, changes = changes.len(), "created item");
    Ok(finalized)
}

/// Plan and apply an item deletion.
pub async fn delete_item<S: RepoStore + ?Sized>(
    store: &S,
    config: &Config,
    config_path: &str,
    id: &str,
    branch: Option<&str>,
) -> Result<Vec<FileChange>, ContentError> {
    let changes = plan_delete(store, config, config_path, id, branch).await?;
    apply_changes(store, &changes, branch).await?;
    tracing::info!(label = %config.label, id, "deleted item");
    Ok(changes)
}

/// Generated identifier: millisecond timestamp plus a short random base36
/// suffix. Sortable by creation time, collision-safe enough for content.
pub fn generate_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..7)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{suffix}", Utc::now().timestamp_millis())
}

/// Fill in the identifier field when the caller left it empty.
///
/// Only fields declared `generated: true` are filled; an empty
/// non-generated identifier is the caller's mistake and surfaces as an
/// error downstream instead of a silently invented id.
fn finalize_record(config: &Config, record: &Record) -> Record {
    let mut finalized = record.clone();
    let id_field = config.id_field();
    let generated = config
        .fields
        .get(id_field)
        .map(|field| field.generated)
        .unwrap_or(false);
    let missing = match finalized.get(id_field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if missing && generated && !id_field.is_empty() {
        finalized.insert(id_field.to_string(), Value::String(generate_id()));
    }
    finalized
}

fn required_id(config: &Config, record: &Record) -> Result<String, ContentError> {
    id_of(record, config.id_field()).ok_or_else(|| ContentError::ItemNotFound {
        id: format!("<no {}>", config.id_field()),
        label: config.label.clone(),
    })
}

fn item_has_id(item: &Value, id_field: &str, id: &str) -> bool {
    item.as_object()
        .and_then(|record| record.get(id_field))
        .map(|value| value_to_id(value) == id)
        .unwrap_or(false)
}

/// Replace the array element whose identifier matches, in place.
fn mutate_matching_item<F>(
    config: &Config,
    file: &str,
    document: &mut Value,
    collection_path: &str,
    id: &str,
    mut replace: F,
) -> Result<(), ContentError>
where
    F: FnMut(&mut Value),
{
    let id_field = config.id_field().to_string();
    let mut saw_array = false;
    let replaced = query::with_array_mut(document, collection_path, &mut |items| {
        saw_array = true;
        match items
            .iter_mut()
            .find(|item| item_has_id(item, &id_field, id))
        {
            Some(slot) => {
                replace(slot);
                true
            }
            None => false,
        }
    });

    if replaced {
        Ok(())
    } else if saw_array {
        Err(ContentError::ItemNotFound {
            id: id.to_string(),
            label: config.label.clone(),
        })
    } else {
        Err(ContentError::QueryUnmatched {
            path: collection_path.to_string(),
            file: file.to_string(),
        })
    }
}

async fn read_optional<S: RepoStore + ?Sized>(
    store: &S,
    path: &str,
    branch: Option<&str>,
) -> Result<(Option<String>, bool), ContentError> {
    match store.get_file(path, branch).await {
        Ok(file) => Ok((Some(file.text()), true)),
        Err(e) if e.is_not_found() => Ok((None, false)),
        Err(e) => Err(e.into()),
    }
}

async fn read_document<S: RepoStore + ?Sized>(
    store: &S,
    path: &str,
    branch: Option<&str>,
) -> Result<(String, Value), ContentError> {
    let text = store.get_file(path, branch).await?.text();
    let document: Value =
        serde_json::from_str(&text).map_err(|source| ContentError::Parse {
            path: path.to_string(),
            source,
        })?;
    Ok((text, document))
}

/// Render a collection record into its file form: frontmatter plus body for
/// markdown, a pretty-printed object for JSON.
fn render_record_file(ext: &str, path: &str, record: &Record) -> Result<String, ContentError> {
    if is_markdown_ext(ext) {
        let body = record
            .get(BODY_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default();
        frontmatter::render(&strip_reserved(record), body)
    } else {
        to_json_text(path, &strip_reserved(record))
    }
}

fn to_json_text(path: &str, record: &Record) -> Result<String, ContentError> {
    document_text(path, &Value::Object(record.clone()))
}

fn document_text(path: &str, document: &Value) -> Result<String, ContentError> {
    let mut text =
        serde_json::to_string_pretty(document).map_err(|source| ContentError::Parse {
            path: path.to_string(),
            source,
        })?;
    text.push('\n');
    Ok(text)
}

pub(crate) fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// The extension including its dot, or empty when there is none.
pub(crate) fn extension(path: &str) -> String {
    let name = file_name(path);
    name.rfind('.')
        .map(|i| name[i..].to_string())
        .unwrap_or_default()
}

pub(crate) fn is_markdown_ext(ext: &str) -> bool {
    matches!(ext, ".md" | ".markdown")
}

fn join_dir(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yurt_gitstore::MemoryStore;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn singleton_config() -> Config {
        Config::parse(
            br#"{ "label": "Settings", "contentFile": "./settings.json", "fields": { "title": "text" } }"#,
        )
        .unwrap()
    }

    fn array_config() -> Config {
        Config::parse(
            br#"{
                "label": "Team",
                "idField": "id",
                "contentFile": "./team.json",
                "collectionPath": "members",
                "fields": {
                    "id": { "type": "text", "generated": true },
                    "name": "text"
                }
            }"#,
        )
        .unwrap()
    }

    fn collection_config(pattern: Option<&str>) -> Config {
        let filename = pattern
            .map(|p| format!(r#", "filename": "{p}""#))
            .unwrap_or_default();
        Config::parse(
            format!(
                r#"{{
                    "label": "Posts",
                    "idField": "slug",
                    "template": "./_template.md"{filename},
                    "fields": {{ "slug": "text", "title": "text" }}
                }}"#
            )
            .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn generated_id_shape() {
        let id = generate_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 7);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn singleton_save_strips_reserved_keys() {
        let store = MemoryStore::new();
        store.seed_file("site/settings.json", b"{\"title\": \"Old\"}\n");

        let rec = record(json!({"title": "New", "_filename": "nope"}));
        let changes = save_item(&store, &singleton_config(), "site/config.yurt.json", &rec, None)
            .await
            .unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].op, FileOp::Update);
        let written = store.file_bytes("main", "site/settings.json").unwrap();
        let text = String::from_utf8(written).unwrap();
        assert!(text.contains("\"title\": \"New\""));
        assert!(!text.contains("_filename"));
    }

    #[tokio::test]
    async fn array_save_replaces_item_and_preserves_siblings() {
        let store = MemoryStore::new();
        store.seed_file(
            "data/team.json",
            br#"{ "heading": "Us", "members": [ {"id": "a", "name": "Ann"}, {"id": "b", "name": "Bo"} ] }"#,
        );

        let rec = record(json!({"id": "a", "name": "Anna"}));
        save_item(&store, &array_config(), "data/config.yurt.json", &rec, None)
            .await
            .unwrap();

        let text =
            String::from_utf8(store.file_bytes("main", "data/team.json").unwrap()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["heading"], "Us");
        assert_eq!(doc["members"][0]["name"], "Anna");
        assert_eq!(doc["members"][1]["name"], "Bo");
    }

    #[tokio::test]
    async fn array_save_unknown_id_is_item_not_found() {
        let store = MemoryStore::new();
        store.seed_file("data/team.json", br#"{ "members": [ {"id": "a"} ] }"#);

        let rec = record(json!({"id": "zz"}));
        let err = save_item(&store, &array_config(), "data/config.yurt.json", &rec, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ItemNotFound { .. }));
    }

    #[tokio::test]
    async fn array_save_broken_query_is_query_unmatched() {
        let store = MemoryStore::new();
        store.seed_file("data/team.json", br#"{ "people": [ {"id": "a"} ] }"#);

        let rec = record(json!({"id": "a"}));
        let err = save_item(&store, &array_config(), "data/config.yurt.json", &rec, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::QueryUnmatched { .. }));
    }

    #[tokio::test]
    async fn array_save_by_position_replaces_the_nth_item() {
        let store = MemoryStore::new();
        store.seed_file(
            "data/team.json",
            br#"{ "members": [ {"id": "a", "name": "Ann"}, {"id": "b", "name": "Bo"} ] }"#,
        );

        let rec = record(json!({"id": "b", "name": "Beatrice"}));
        save_item_at(&store, &array_config(), "data/config.yurt.json", &rec, 1, None)
            .await
            .unwrap();

        let text =
            String::from_utf8(store.file_bytes("main", "data/team.json").unwrap()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["members"][0]["name"], "Ann");
        assert_eq!(doc["members"][1]["name"], "Beatrice");
    }

    #[tokio::test]
    async fn array_save_by_position_rejects_out_of_range() {
        let store = MemoryStore::new();
        store.seed_file("data/team.json", br#"{ "members": [ {"id": "a"} ] }"#);

        let rec = record(json!({"id": "a"}));
        let err = save_item_at(&store, &array_config(), "data/config.yurt.json", &rec, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ItemNotFound { .. }));
    }

    #[tokio::test]
    async fn save_by_position_is_array_only() {
        let store = MemoryStore::new();
        let rec = record(json!({"title": "x"}));
        let err = plan_save_at(&store, &singleton_config(), "c.yurt.json", &rec, 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::UnsupportedOperation { .. }));
    }

    #[tokio::test]
    async fn array_create_appends_and_generates_id() {
        let store = MemoryStore::new();
        store.seed_file("data/team.json", br#"{ "members": [ {"id": "a"} ] }"#);

        let rec = record(json!({"name": "New person"}));
        let created = create_item(&store, &array_config(), "data/config.yurt.json", &rec, None)
            .await
            .unwrap();
        let id = created.get("id").and_then(Value::as_str).unwrap();
        assert!(id.contains('-'));

        let text =
            String::from_utf8(store.file_bytes("main", "data/team.json").unwrap()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["members"].as_array().unwrap().len(), 2);
        assert_eq!(doc["members"][1]["id"], *id);
    }

    #[tokio::test]
    async fn create_without_a_non_generated_id_is_refused() {
        let store = MemoryStore::new();
        store.seed_file("posts/_template.md", b"---\ntitle: ''\n---\n");

        // "slug" is a plain text field, not generated; leaving it empty is
        // a caller error, never an invented identifier.
        let config = collection_config(None);
        let rec = record(json!({"title": "No slug"}));
        let err = create_item(&store, &config, "posts/config.yurt.json", &rec, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ItemNotFound { .. }));
    }

    #[tokio::test]
    async fn collection_create_uses_filename_pattern() {
        let store = MemoryStore::new();
        store.seed_file("posts/_template.md", b"---\ntitle: ''\n---\n");

        let config = collection_config(Some("{{slug}}.md"));
        let rec = record(json!({"slug": "hello-world", "title": "Hello"}));
        let created = create_item(&store, &config, "posts/config.yurt.json", &rec, None)
            .await
            .unwrap();

        assert_eq!(created.get(FILENAME_KEY), Some(&json!("hello-world.md")));
        let text = String::from_utf8(
            store.file_bytes("main", "posts/hello-world.md").unwrap(),
        )
        .unwrap();
        assert!(text.starts_with("---\n"));
        assert!(text.contains("slug: hello-world"));
    }

    #[tokio::test]
    async fn collection_create_merges_template_defaults_and_body() {
        let store = MemoryStore::new();
        store.seed_file(
            "posts/_template.md",
            b"---\ndraft: true\ntitle: '{{title}}'\n---\n\n# {{title}}\n",
        );

        let config = collection_config(Some("{{slug}}.md"));
        let rec = record(json!({"slug": "hello", "title": "Hello"}));
        let created = create_item(&store, &config, "posts/config.yurt.json", &rec, None)
            .await
            .unwrap();

        // Template defaults survive, placeholders resolve, caller wins.
        assert_eq!(created.get("draft"), Some(&json!(true)));
        assert_eq!(created.get("title"), Some(&json!("Hello")));
        assert_eq!(created.get(BODY_KEY), Some(&json!("# Hello\n")));

        let text =
            String::from_utf8(store.file_bytes("main", "posts/hello.md").unwrap()).unwrap();
        assert!(text.contains("draft: true"));
        assert!(text.contains("# Hello"));
    }

    #[tokio::test]
    async fn collection_create_keeps_the_caller_body() {
        let store = MemoryStore::new();
        store.seed_file(
            "posts/_template.md",
            b"---\ntitle: ''\n---\n\nTemplate body.\n",
        );

        let config = collection_config(Some("{{slug}}.md"));
        let rec = record(json!({"slug": "own", "title": "T", "_body": "My own prose.\n"}));
        let created = create_item(&store, &config, "posts/config.yurt.json", &rec, None)
            .await
            .unwrap();
        assert_eq!(created.get(BODY_KEY), Some(&json!("My own prose.\n")));
    }

    #[tokio::test]
    async fn collection_create_appends_missing_extension() {
        let store = MemoryStore::new();
        store.seed_file("posts/_template.md", b"---\ntitle: ''\n---\n");

        let config = collection_config(Some("{{slug}}"));
        let rec = record(json!({"slug": "bare-name", "title": "Bare"}));
        let created = create_item(&store, &config, "posts/config.yurt.json", &rec, None)
            .await
            .unwrap();

        assert_eq!(created.get(FILENAME_KEY), Some(&json!("bare-name.md")));
        assert!(store.file_bytes("main", "posts/bare-name.md").is_some());
    }

    #[tokio::test]
    async fn collection_create_falls_back_to_slugified_id() {
        let store = MemoryStore::new();
        store.seed_file("posts/_template.md", b"---\ntitle: ''\n---\n");

        let config = collection_config(None);
        let rec = record(json!({"slug": "Hello World!", "title": "Hi"}));
        create_item(&store, &config, "posts/config.yurt.json", &rec, None)
            .await
            .unwrap();
        assert!(store.file_bytes("main", "posts/hello-world.md").is_some());
    }

    #[tokio::test]
    async fn collection_create_refuses_to_clobber() {
        let store = MemoryStore::new();
        store.seed_file("posts/_template.md", b"---\ntitle: ''\n---\n");
        store.seed_file("posts/hello.md", b"---\nslug: hello\n---\n");

        let config = collection_config(Some("{{slug}}.md"));
        let rec = record(json!({"slug": "hello", "title": "Again"}));
        let err = create_item(&store, &config, "posts/config.yurt.json", &rec, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContentError::Store(StoreError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn collection_rename_is_delete_plus_create() {
        let store = MemoryStore::new();
        store.seed_file("posts/_template.md", b"---\ntitle: ''\n---\n");
        store.seed_file("posts/old-slug.md", b"---\nslug: old-slug\ntitle: T\n---\n");

        let config = collection_config(Some("{{slug}}.md"));
        let rec = record(json!({
            "slug": "new-slug",
            "title": "T",
            "_filename": "old-slug.md"
        }));
        let changes = save_item(&store, &config, "posts/config.yurt.json", &rec, None)
            .await
            .unwrap();

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].op, FileOp::Delete);
        assert_eq!(changes[1].op, FileOp::Create);
        assert!(store.file_bytes("main", "posts/old-slug.md").is_none());
        assert!(store.file_bytes("main", "posts/new-slug.md").is_some());
    }

    #[tokio::test]
    async fn collection_delete_removes_the_matched_file() {
        let store = MemoryStore::new();
        store.seed_file("posts/_template.md", b"---\ntitle: ''\n---\n");
        store.seed_file("posts/hello.md", b"---\nslug: hello\n---\n");

        let config = collection_config(None);
        let changes = delete_item(&store, &config, "posts/config.yurt.json", "hello", None)
            .await
            .unwrap();
        assert_eq!(changes[0].op, FileOp::Delete);
        assert!(store.file_bytes("main", "posts/hello.md").is_none());
    }

    #[tokio::test]
    async fn array_save_is_idempotent_in_effect() {
        let store = MemoryStore::new();
        store.seed_file(
            "data/team.json",
            br#"{ "members": [ {"id": "a", "name": "Ann"} ] }"#,
        );

        let config = array_config();
        let rec = record(json!({"id": "a", "name": "Anna"}));
        save_item(&store, &config, "data/config.yurt.json", &rec, None)
            .await
            .unwrap();
        let once = store.file_bytes("main", "data/team.json").unwrap();

        save_item(&store, &config, "data/config.yurt.json", &rec, None)
            .await
            .unwrap();
        let twice = store.file_bytes("main", "data/team.json").unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn array_delete_unknown_id_is_item_not_found() {
        let store = MemoryStore::new();
        store.seed_file("data/team.json", br#"{ "members": [ {"id": "a"} ] }"#);

        let err = delete_item(&store, &array_config(), "data/config.yurt.json", "zz", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ItemNotFound { .. }));
        // The file is exactly as it was.
        assert_eq!(
            store.file_bytes("main", "data/team.json").unwrap(),
            br#"{ "members": [ {"id": "a"} ] }"#.to_vec()
        );
    }

    #[tokio::test]
    async fn create_on_singleton_is_unsupported() {
        let store = MemoryStore::new();
        let rec = record(json!({"title": "x"}));
        let err = plan_create(&store, &singleton_config(), "c.yurt.json", &rec, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContentError::UnsupportedOperation {
                shape: "singleton",
                operation: "create"
            }
        ));
    }

    #[tokio::test]
    async fn applied_bytes_match_the_plan() {
        let store = MemoryStore::new();
        store.seed_file("data/team.json", br#"{ "members": [ {"id": "a"} ] }"#);

        let rec = record(json!({"id": "a", "name": "Ann"}));
        let config = array_config();
        let changes = plan_save(&store, &config, "data/config.yurt.json", &rec, None)
            .await
            .unwrap();
        apply_changes(&store, &changes, None).await.unwrap();

        let written =
            String::from_utf8(store.file_bytes("main", "data/team.json").unwrap()).unwrap();
        assert_eq!(Some(written.as_str()), changes[0].after.as_deref());
    }
}
