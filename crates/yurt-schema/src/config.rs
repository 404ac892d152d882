// config.rs — Content-type config parsing and shape inference.
//
// A config file declares one content type. Which storage shape it uses is
// inferred from which keys are present:
//
//   template                    → Collection (many files, one record each)
//   contentFile + collectionPath → Array     (one file, many records)
//   contentFile                  → Singleton (one file, one record)
//
// Inference happens exactly once, here, and yields a ConfigKind tag.
// Everything downstream matches on the tag exhaustively.

use serde::Deserialize;

use crate::error::SchemaError;
use crate::fields::{normalize_fields, FieldSet, FieldsDecl};

/// The three storage shapes a content type can use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigKind {
    /// A single JSON file holding a single record.
    Singleton { content_file: String },
    /// A single JSON file holding many records under a query path.
    Array {
        content_file: String,
        collection_path: String,
    },
    /// A directory of files, one record each, shaped by a template file.
    Collection {
        template: String,
        /// Deprecated filename pattern; still honored for `{{placeholder}}`
        /// substitution when present.
        filename_pattern: Option<String>,
    },
}

impl ConfigKind {
    /// Short shape name, for labels and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKind::Singleton { .. } => "singleton",
            ConfigKind::Array { .. } => "array",
            ConfigKind::Collection { .. } => "collection",
        }
    }
}

/// A parsed and validated content-type declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Display name, also the source of the URL slug.
    pub label: String,
    /// Identifier property name. Always present for arrays and collections;
    /// optional for singletons.
    pub id_field: Option<String>,
    /// Normalized field definitions, in display order.
    pub fields: FieldSet,
    /// Override for where image uploads land.
    pub image_path: Option<String>,
    /// Storage shape plus its shape-specific file references.
    pub kind: ConfigKind,
}

/// The config file exactly as declared, before inference.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    label: String,
    #[serde(default)]
    id_field: Option<String>,
    fields: FieldsDecl,
    #[serde(default)]
    image_path: Option<String>,
    #[serde(default)]
    content_file: Option<String>,
    #[serde(default)]
    collection_path: Option<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

impl Config {
    /// Parse a config from raw file bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, SchemaError> {
        let raw: RawConfig = serde_json::from_slice(bytes)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, SchemaError> {
        let kind = infer_kind(&raw)?;

        // Arrays and collections address records by id; without an idField
        // there is no way to target an item for update or delete.
        if raw.id_field.is_none() && !matches!(kind, ConfigKind::Singleton { .. }) {
            return Err(SchemaError::MissingIdField {
                label: raw.label,
                shape: kind.name().to_string(),
            });
        }

        Ok(Config {
            fields: normalize_fields(&raw.fields)?,
            label: raw.label,
            id_field: raw.id_field,
            image_path: raw.image_path,
            kind,
        })
    }

    /// The identifier property for shapes that require one.
    ///
    /// Valid to call for arrays and collections, where parsing guarantees
    /// presence.
    pub fn id_field(&self) -> &str {
        self.id_field.as_deref().unwrap_or("")
    }
}

fn infer_kind(raw: &RawConfig) -> Result<ConfigKind, SchemaError> {
    if let Some(template) = non_empty(&raw.template) {
        return Ok(ConfigKind::Collection {
            template: template.to_string(),
            filename_pattern: non_empty(&raw.filename).map(str::to_string),
        });
    }

    if let Some(content_file) = non_empty(&raw.content_file) {
        if let Some(collection_path) = non_empty(&raw.collection_path) {
            return Ok(ConfigKind::Array {
                content_file: content_file.to_string(),
                collection_path: collection_path.to_string(),
            });
        }
        return Ok(ConfigKind::Singleton {
            content_file: content_file.to_string(),
        });
    }

    Err(SchemaError::UnknownShape {
        label: raw.label.clone(),
    })
}

fn non_empty(opt: &Option<String>) -> Option<&str> {
    opt.as_deref().filter(|s| !s.is_empty())
}
