// compare.rs — What a draft changes, expressed as content, not files.
//
// Editors review drafts in terms of records: which items a content type
// gained, lost, or changed between the default branch and the draft. File
// paths and commit shas stay out of the picture; that is the status
// surface's job.
//
// Comparison degrades gracefully. A content type that cannot be read on
// either branch is reported as degraded instead of failing the whole
// comparison, because a half-broken draft is exactly when an editor most
// needs to see the rest.

use chrono::{Duration, Utc};
use serde_json::Value;
use yurt_content::record::{id_of, Content, Record, FILENAME_KEY};
use yurt_content::{discovery, fetch_content};
use yurt_gitstore::{CommitInfo, RepoStore};
use yurt_schema::ConfigKind;

use crate::branch::STALE_AFTER_DAYS;
use crate::error::DraftError;

/// How one record differs between the branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One changed record, addressed the way editors address it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemChange {
    pub id: String,
    pub kind: ChangeKind,
}

/// All changes within one content type.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigComparison {
    pub slug: String,
    pub label: String,
    pub changes: Vec<ItemChange>,
}

/// Draft bookkeeping shown alongside the content changes.
#[derive(Debug, Clone, Default)]
pub struct DraftMetadata {
    /// Commits the draft is ahead of the default branch.
    pub commit_count: u64,
    /// The draft branch's tip commit.
    pub last_commit: Option<CommitInfo>,
    /// The default branch moved since the draft was cut.
    pub behind_main: bool,
    /// No activity for [`STALE_AFTER_DAYS`].
    pub stale: bool,
    /// Best-effort merge base of the draft and the default branch.
    pub merge_base: Option<String>,
}

/// The full content-level comparison of a draft against the default branch.
#[derive(Debug, Clone)]
pub struct DraftComparison {
    pub branch: String,
    /// False when the named draft branch does not exist; the comparison is
    /// then empty rather than an error, so callers can render "no draft"
    /// without a separate existence check.
    pub branch_exists: bool,
    pub metadata: DraftMetadata,
    /// Content types with at least one change, in discovery order.
    pub configs: Vec<ConfigComparison>,
    /// Slugs that could not be compared.
    pub degraded: Vec<String>,
}

impl DraftComparison {
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.configs.iter().map(|c| c.changes.len()).sum()
    }
}

/// Compare `draft` against the default branch, record by record.
///
/// Discovery runs on the draft so content types added there are seen; a
/// type deleted on the draft shows up through its records being removed.
///
/// This never fails: a missing draft branch yields an empty comparison
/// with `branch_exists: false`, and any systemic failure (tree listing,
/// commit comparison) is logged and degrades to an empty comparison too.
/// Callers render "no differences" instead of an error page.
pub async fn compare_draft<S: RepoStore + ?Sized>(store: &S, draft: &str) -> DraftComparison {
    match try_compare(store, draft).await {
        Ok(comparison) => comparison,
        Err(e) => {
            tracing::warn!(branch = draft, error = %e, "draft comparison degraded to empty");
            empty_comparison(draft, true)
        }
    }
}

fn empty_comparison(draft: &str, branch_exists: bool) -> DraftComparison {
    DraftComparison {
        branch: draft.to_string(),
        branch_exists,
        metadata: DraftMetadata::default(),
        configs: Vec::new(),
        degraded: Vec::new(),
    }
}

async fn try_compare<S: RepoStore + ?Sized>(
    store: &S,
    draft: &str,
) -> Result<DraftComparison, DraftError> {
    let default = store.default_branch().await?;

    let tip = match store.branch_sha(draft).await {
        Ok(sha) => sha,
        Err(e) if e.is_not_found() => return Ok(empty_comparison(draft, false)),
        Err(e) => return Err(e.into()),
    };

    let ahead = store.compare(&default, draft).await?;
    let behind_main = store.compare(draft, &default).await?.ahead_by > 0;
    let last_commit = match store.get_commit(&tip).await {
        Ok(commit) => Some(commit),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };
    let stale = last_commit
        .as_ref()
        .map(|c| Utc::now() - c.date >= Duration::days(STALE_AFTER_DAYS))
        .unwrap_or(false);
    let metadata = DraftMetadata {
        commit_count: ahead.ahead_by,
        last_commit,
        behind_main,
        stale,
        merge_base: ahead.merge_base.clone(),
    };

    let discovered = discovery::discover(store, Some(draft)).await?;

    let mut configs = Vec::new();
    let mut degraded = Vec::new();
    for entry in &discovered {
        let draft_content =
            match fetch_content(store, &entry.config, &entry.path, Some(draft)).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(slug = %entry.slug, error = %e, "draft side unreadable");
                    degraded.push(entry.slug.clone());
                    continue;
                }
            };
        let main_content =
            match fetch_content(store, &entry.config, &entry.path, Some(&default)).await {
                Ok(content) => Some(content),
                Err(e) if e.is_not_found() => None,
                Err(e) => {
                    tracing::warn!(slug = %entry.slug, error = %e, "default side unreadable");
                    degraded.push(entry.slug.clone());
                    continue;
                }
            };

        let changes = diff_content(
            &entry.config.kind,
            entry.config.id_field(),
            main_content.as_ref(),
            &draft_content,
        );
        if !changes.is_empty() {
            configs.push(ConfigComparison {
                slug: entry.slug.clone(),
                label: entry.config.label.clone(),
                changes,
            });
        }
    }

    Ok(DraftComparison {
        branch: draft.to_string(),
        branch_exists: true,
        metadata,
        configs,
        degraded,
    })
}

/// Sentinel identifier for singleton changes, which have no per-item id.
pub const SINGLETON_ID: &str = "_singleton";

/// Diff the records of one content type. Equality is structural, so two
/// files that re-serialize differently but hold the same values count as
/// unchanged.
///
/// Identity per shape: arrays by the config's id field, collections by
/// origin filename (extension stripped), singletons by the sentinel.
fn diff_content(
    kind: &ConfigKind,
    id_field: &str,
    main: Option<&Content>,
    draft: &Content,
) -> Vec<ItemChange> {
    if let ConfigKind::Singleton { .. } = kind {
        return match (main, draft) {
            (None, _) => vec![ItemChange {
                id: SINGLETON_ID.to_string(),
                kind: ChangeKind::Added,
            }],
            (Some(before), after) if before != after => vec![ItemChange {
                id: SINGLETON_ID.to_string(),
                kind: ChangeKind::Modified,
            }],
            _ => Vec::new(),
        };
    }

    let draft_items = draft.items();
    let main_items = main.map(Content::items).unwrap_or_default();

    let by_filename = matches!(kind, ConfigKind::Collection { .. });
    let key = |record: &Record| -> Option<String> {
        if by_filename {
            record
                .get(FILENAME_KEY)
                .and_then(Value::as_str)
                .map(strip_extension)
        } else {
            id_of(record, id_field)
        }
    };

    let mut changes = Vec::new();
    for item in &draft_items {
        let Some(id) = key(item) else { continue };
        match main_items.iter().find(|m| key(m).as_deref() == Some(id.as_str())) {
            None => changes.push(ItemChange {
                id,
                kind: ChangeKind::Added,
            }),
            Some(before) if !records_equal(before, item) => changes.push(ItemChange {
                id,
                kind: ChangeKind::Modified,
            }),
            Some(_) => {}
        }
    }
    for item in &main_items {
        let Some(id) = key(item) else { continue };
        if !draft_items.iter().any(|d| key(d).as_deref() == Some(id.as_str())) {
            changes.push(ItemChange {
                id,
                kind: ChangeKind::Removed,
            });
        }
    }
    changes
}

/// Structural equality, ignoring the origin filename (it is already the
/// identity key for collection items).
fn records_equal(a: &Record, b: &Record) -> bool {
    let strip = |record: &Record| -> Record {
        record
            .iter()
            .filter(|(key, _)| key.as_str() != FILENAME_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    };
    Value::Object(strip(a)) == Value::Object(strip(b))
}

fn strip_extension(name: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => name[..dot].to_string(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::ensure_draft_on;
    use chrono::NaiveDate;
    use yurt_gitstore::{
        BranchSummary, Comparison, DirEntry, FileContent, MemoryStore, StoreError, TreeEntry,
    };

    const POSTS: &[u8] = br#"{
        "label": "Blog Posts",
        "idField": "slug",
        "template": "./_template.md",
        "fields": { "slug": "text", "title": "text" }
    }"#;

    const SETTINGS: &[u8] = br#"{
        "label": "Site Settings",
        "contentFile": "./settings.json",
        "fields": { "title": "text" }
    }"#;

    async fn seeded_draft(store: &MemoryStore) -> String {
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        ensure_draft_on(store, today).await.unwrap().name()
    }

    async fn edit(store: &MemoryStore, branch: &str, path: &str, bytes: &[u8]) {
        let sha = match store.get_file(path, Some(branch)).await {
            Ok(file) => Some(file.sha),
            Err(_) => None,
        };
        store
            .put_file(path, bytes, "edit", sha.as_deref(), Some(branch))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reports_added_modified_and_removed_items() {
        let store = MemoryStore::new();
        store.seed_file("posts/config.yurt.json", POSTS);
        store.seed_file("posts/_template.md", b"---\ntitle: ''\n---\n");
        store.seed_file("posts/keep.md", b"---\nslug: keep\ntitle: Keep\n---\n");
        store.seed_file("posts/edit.md", b"---\nslug: edit\ntitle: Old\n---\n");
        store.seed_file("posts/gone.md", b"---\nslug: gone\ntitle: Gone\n---\n");

        let draft = seeded_draft(&store).await;
        edit(&store, &draft, "posts/edit.md", b"---\nslug: edit\ntitle: New\n---\n").await;
        edit(&store, &draft, "posts/fresh.md", b"---\nslug: fresh\ntitle: Fresh\n---\n").await;
        let gone = store.get_file("posts/gone.md", Some(&draft)).await.unwrap();
        store
            .delete_file("posts/gone.md", "rm", &gone.sha, Some(&draft))
            .await
            .unwrap();

        let comparison = compare_draft(&store, &draft).await;
        assert_eq!(comparison.configs.len(), 1);
        let posts = &comparison.configs[0];
        assert_eq!(posts.slug, "blog-posts");

        let kind_of = |id: &str| {
            posts
                .changes
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.kind)
        };
        assert_eq!(kind_of("fresh"), Some(ChangeKind::Added));
        assert_eq!(kind_of("edit"), Some(ChangeKind::Modified));
        assert_eq!(kind_of("gone"), Some(ChangeKind::Removed));
        assert_eq!(kind_of("keep"), None);
        assert_eq!(comparison.change_count(), 3);
    }

    #[tokio::test]
    async fn array_items_diff_by_identifier() {
        let store = MemoryStore::new();
        store.seed_file(
            "team.yurt.json",
            br#"{
                "label": "Team",
                "idField": "id",
                "contentFile": "./team.json",
                "collectionPath": "members",
                "fields": { "id": "text", "name": "text" }
            }"#,
        );
        store.seed_file(
            "team.json",
            br#"{ "members": [ {"id": "1", "name": "A"} ] }"#,
        );

        let draft = seeded_draft(&store).await;
        edit(
            &store,
            &draft,
            "team.json",
            br#"{ "members": [ {"id": "1", "name": "B"}, {"id": "2", "name": "C"} ] }"#,
        )
        .await;

        let comparison = compare_draft(&store, &draft).await;
        assert_eq!(
            comparison.configs[0].changes,
            vec![
                ItemChange {
                    id: "1".to_string(),
                    kind: ChangeKind::Modified
                },
                ItemChange {
                    id: "2".to_string(),
                    kind: ChangeKind::Added
                },
            ]
        );
    }

    #[tokio::test]
    async fn metadata_carries_staleness_and_merge_base() {
        let store = MemoryStore::new();
        store.seed_file("site.yurt.json", SETTINGS);
        store.seed_file("settings.json", b"{\"title\": \"Hi\"}\n");

        let draft = seeded_draft(&store).await;
        edit(&store, &draft, "settings.json", b"{\"title\": \"Bye\"}\n").await;
        store.backdate_tip(&draft, Utc::now() - Duration::days(10));

        let comparison = compare_draft(&store, &draft).await;
        assert!(comparison.metadata.stale);
        assert!(comparison.metadata.merge_base.is_some());
        assert!(comparison.metadata.last_commit.is_some());
    }

    #[tokio::test]
    async fn systemic_failure_degrades_to_an_empty_comparison() {
        let store = BrokenCompare(MemoryStore::new());
        store.0.seed_file("site.yurt.json", SETTINGS);
        store.0.seed_file("settings.json", b"{\"title\": \"Hi\"}\n");
        let sha = store.0.branch_sha("main").await.unwrap();
        store.0.create_branch("preview-2026-08-29", &sha).await.unwrap();

        let comparison = compare_draft(&store, "preview-2026-08-29").await;
        assert!(comparison.is_empty());
        assert_eq!(comparison.metadata.commit_count, 0);
        assert!(comparison.degraded.is_empty());
    }

    /// A store whose commit comparison always fails, as under rate limiting.
    struct BrokenCompare(MemoryStore);

    #[async_trait::async_trait]
    impl RepoStore for BrokenCompare {
        async fn default_branch(&self) -> Result<String, StoreError> {
            self.0.default_branch().await
        }

        async fn list_tree(&self, reference: &str) -> Result<Vec<TreeEntry>, StoreError> {
            self.0.list_tree(reference).await
        }

        async fn get_file(
            &self,
            path: &str,
            reference: Option<&str>,
        ) -> Result<FileContent, StoreError> {
            self.0.get_file(path, reference).await
        }

        async fn list_dir(
            &self,
            path: &str,
            reference: Option<&str>,
        ) -> Result<Vec<DirEntry>, StoreError> {
            self.0.list_dir(path, reference).await
        }

        async fn put_file(
            &self,
            path: &str,
            content: &[u8],
            message: &str,
            sha: Option<&str>,
            branch: Option<&str>,
        ) -> Result<String, StoreError> {
            self.0.put_file(path, content, message, sha, branch).await
        }

        async fn delete_file(
            &self,
            path: &str,
            message: &str,
            sha: &str,
            branch: Option<&str>,
        ) -> Result<String, StoreError> {
            self.0.delete_file(path, message, sha, branch).await
        }

        async fn branch_sha(&self, branch: &str) -> Result<String, StoreError> {
            self.0.branch_sha(branch).await
        }

        async fn create_branch(&self, name: &str, sha: &str) -> Result<(), StoreError> {
            self.0.create_branch(name, sha).await
        }

        async fn delete_branch(&self, name: &str) -> Result<(), StoreError> {
            self.0.delete_branch(name).await
        }

        async fn list_branches(&self) -> Result<Vec<BranchSummary>, StoreError> {
            self.0.list_branches().await
        }

        async fn compare(&self, _base: &str, _head: &str) -> Result<Comparison, StoreError> {
            Err(StoreError::Transient {
                reason: "API rate limit exceeded".to_string(),
            })
        }

        async fn merge(&self, base: &str, head: &str, message: &str) -> Result<(), StoreError> {
            self.0.merge(base, head, message).await
        }

        async fn get_commit(&self, sha: &str) -> Result<CommitInfo, StoreError> {
            self.0.get_commit(sha).await
        }
    }

    #[tokio::test]
    async fn missing_draft_branch_compares_empty_without_error() {
        let store = MemoryStore::new();
        store.seed_file("site.yurt.json", SETTINGS);
        store.seed_file("settings.json", b"{\"title\": \"Hi\"}\n");

        let comparison = compare_draft(&store, "preview-2026-01-01").await;
        assert!(!comparison.branch_exists);
        assert!(comparison.is_empty());
        assert_eq!(comparison.metadata.commit_count, 0);
    }

    #[tokio::test]
    async fn identical_branches_compare_empty() {
        let store = MemoryStore::new();
        store.seed_file("site.yurt.json", SETTINGS);
        store.seed_file("settings.json", b"{\"title\": \"Hi\"}\n");

        let draft = seeded_draft(&store).await;
        let comparison = compare_draft(&store, &draft).await;
        assert!(comparison.is_empty());
        assert_eq!(comparison.metadata.commit_count, 0);
    }

    #[tokio::test]
    async fn reformatted_but_equal_json_is_not_a_change() {
        let store = MemoryStore::new();
        store.seed_file("site.yurt.json", SETTINGS);
        store.seed_file("settings.json", b"{\"title\":\"Hi\",\"n\":1}");

        let draft = seeded_draft(&store).await;
        // Same values, different formatting and key order.
        edit(
            &store,
            &draft,
            "settings.json",
            b"{\n  \"n\": 1,\n  \"title\": \"Hi\"\n}\n",
        )
        .await;

        let comparison = compare_draft(&store, &draft).await;
        assert!(comparison.is_empty());
    }

    #[tokio::test]
    async fn singleton_edit_reports_one_modification() {
        let store = MemoryStore::new();
        store.seed_file("site.yurt.json", SETTINGS);
        store.seed_file("settings.json", b"{\"title\": \"Hi\"}\n");

        let draft = seeded_draft(&store).await;
        edit(&store, &draft, "settings.json", b"{\"title\": \"Bye\"}\n").await;

        let comparison = compare_draft(&store, &draft).await;
        assert_eq!(comparison.configs.len(), 1);
        assert_eq!(
            comparison.configs[0].changes,
            vec![ItemChange {
                id: SINGLETON_ID.to_string(),
                kind: ChangeKind::Modified
            }]
        );
    }

    #[tokio::test]
    async fn unreadable_config_degrades_instead_of_failing() {
        let store = MemoryStore::new();
        store.seed_file("site.yurt.json", SETTINGS);
        store.seed_file("settings.json", b"{\"title\": \"Hi\"}\n");

        let draft = seeded_draft(&store).await;
        // Break the draft's copy of the content file.
        edit(&store, &draft, "settings.json", b"{broken").await;
        edit(&store, &draft, "extra.json", b"{\"x\":1}\n").await;

        let comparison = compare_draft(&store, &draft).await;
        assert_eq!(comparison.degraded, vec!["site-settings".to_string()]);
    }

    #[tokio::test]
    async fn content_type_added_on_the_draft_is_all_additions() {
        let store = MemoryStore::new();
        store.seed_file("README.md", b"# hi\n");

        let draft = seeded_draft(&store).await;
        edit(&store, &draft, "site.yurt.json", SETTINGS).await;
        edit(&store, &draft, "settings.json", b"{\"title\": \"Hi\"}\n").await;

        let comparison = compare_draft(&store, &draft).await;
        assert_eq!(comparison.configs.len(), 1);
        assert_eq!(comparison.configs[0].changes[0].kind, ChangeKind::Added);
        assert!(comparison.metadata.commit_count >= 2);
    }
}
