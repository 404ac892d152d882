// error.rs — Error types for content access.

use thiserror::Error;
use yurt_gitstore::StoreError;
use yurt_schema::SchemaError;

/// Errors from fetching, mutating, or discovering content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The backing store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The config itself is malformed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A content file is not valid JSON.
    #[error("could not parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    /// A markdown file's frontmatter block is not valid YAML.
    #[error("invalid frontmatter in {path}: {reason}")]
    Frontmatter { path: String, reason: String },

    /// A content file holds something other than a JSON object where a
    /// record was expected.
    #[error("{path} does not contain a record object")]
    NotARecord { path: String },

    /// The collectionPath expression did not address any array in the
    /// document, so there is nowhere to put or take items.
    #[error("collectionPath '{path}' does not address an array in {file}")]
    QueryUnmatched { path: String, file: String },

    /// The addressed item is not present in the array or collection.
    #[error("item '{id}' not found in {label}")]
    ItemNotFound { id: String, label: String },

    /// The operation does not exist for this storage shape
    /// (e.g. create on a singleton).
    #[error("cannot {operation} items for a {shape} config")]
    UnsupportedOperation {
        shape: &'static str,
        operation: &'static str,
    },

    /// Collection saves and deletes must address a file.
    #[error("a filename is required to {operation} a collection item")]
    MissingFilename { operation: &'static str },
}

impl ContentError {
    /// True for both a missing store object and a missing logical item.
    pub fn is_not_found(&self) -> bool {
        match self {
            ContentError::Store(e) => e.is_not_found(),
            ContentError::ItemNotFound { .. } => true,
            _ => false,
        }
    }
}
