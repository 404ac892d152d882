// discovery.rs — Finding content-type declarations in a repository.
//
// A content type is declared by any file whose name ends in `.yurt.json`,
// anywhere in the tree. Discovery walks the full tree once, parses every
// declaration, and derives each type's URL slug from its label. Broken
// declarations are logged and skipped so one bad file cannot hide the rest.

use futures::future::join_all;
use yurt_gitstore::{EntryKind, RepoStore};
use yurt_schema::{slugify, Config};

use crate::error::ContentError;

/// File-name suffix that marks a content-type declaration.
pub const CONFIG_SUFFIX: &str = ".yurt.json";

/// One discovered content type.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredConfig {
    /// Repository path of the declaration file.
    pub path: String,
    /// URL slug derived from the config's label.
    pub slug: String,
    pub config: Config,
}

/// Discover every content type declared on `branch` (default branch when
/// `None`), in tree order.
///
/// Two labels that slugify identically would make one type unreachable, so
/// later duplicates are dropped with a warning.
pub async fn discover<S: RepoStore + ?Sized>(
    store: &S,
    branch: Option<&str>,
) -> Result<Vec<DiscoveredConfig>, ContentError> {
    let reference = match branch {
        Some(b) => b.to_string(),
        None => store.default_branch().await?,
    };

    let tree = store.list_tree(&reference).await?;
    let config_paths: Vec<String> = tree
        .into_iter()
        .filter(|entry| {
            entry.kind == EntryKind::Blob
                && entry.path.ends_with(CONFIG_SUFFIX)
                // Underscored names are private/draft markers, not live
                // declarations.
                && !crate::write::file_name(&entry.path).starts_with('_')
        })
        .map(|entry| entry.path)
        .collect();

    let reference = &reference;
    let fetches = config_paths.iter().map(|path| async move {
        let file = match store.get_file(path, Some(reference.as_str())).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "could not read config declaration");
                return None;
            }
        };
        match Config::parse(&file.bytes) {
            Ok(config) => Some(DiscoveredConfig {
                slug: slugify(&config.label),
                path: path.clone(),
                config,
            }),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "skipping malformed config declaration");
                None
            }
        }
    });

    let mut discovered: Vec<DiscoveredConfig> = Vec::new();
    for candidate in join_all(fetches).await.into_iter().flatten() {
        if let Some(existing) = discovered.iter().find(|d| d.slug == candidate.slug) {
            tracing::warn!(
                slug = %candidate.slug,
                kept = %existing.path,
                dropped = %candidate.path,
                "duplicate content-type slug"
            );
            continue;
        }
        discovered.push(candidate);
    }

    tracing::debug!(count = discovered.len(), branch = %reference, "discovered content types");
    Ok(discovered)
}

/// Find a discovered content type by its slug.
pub fn find_by_slug<'a>(
    discovered: &'a [DiscoveredConfig],
    slug: &str,
) -> Option<&'a DiscoveredConfig> {
    discovered.iter().find(|d| d.slug == slug)
}
