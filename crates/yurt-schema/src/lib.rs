//! # yurt-schema
//!
//! Schema model for Yurt content types.
//!
//! A content type is declared by a small JSON config file checked into the
//! repository it describes. This crate parses those declarations, infers
//! which of the three storage shapes the config uses, and normalizes field
//! declarations into a single canonical form.
//!
//! ## Key components
//!
//! - [`Config`] — a parsed, validated content-type declaration. Its
//!   [`ConfigKind`] tag is produced exactly once, at parse time; downstream
//!   code matches on the tag and never re-inspects raw JSON shape.
//! - [`FieldSet`] — ordered, normalized field definitions. Configs may
//!   declare fields as a keyed object or as an ordered list; both normalize
//!   to the same form.
//! - [`resolve_path`] — resolves `./` and `../` references declared in a
//!   config against the config file's own location in the repository tree.

pub mod config;
pub mod error;
pub mod fields;
pub mod path;
pub mod slug;

pub use config::{Config, ConfigKind};
pub use error::SchemaError;
pub use fields::{normalize_fields, Field, FieldSet, FieldType, FieldsDecl, ShowPriority};
pub use path::resolve_path;
pub use slug::slugify;
