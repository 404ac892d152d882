// error.rs — Error types for the schema subsystem.

use thiserror::Error;

/// Errors that can occur while parsing or validating a content-type config.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The config matches none of the three storage shapes.
    #[error("unable to infer shape for config '{label}': expected a template, or a contentFile (optionally with collectionPath)")]
    UnknownShape { label: String },

    /// Array and collection configs must name the identifier property.
    #[error("config '{label}' is a {shape} and requires idField")]
    MissingIdField { label: String, shape: String },

    /// A field definition could not be interpreted.
    #[error("invalid definition for field '{name}': {reason}")]
    InvalidField { name: String, reason: String },

    /// The config file is not valid JSON (or not an object).
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
