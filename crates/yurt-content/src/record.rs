// record.rs — The content record model.
//
// A record is an ordered key→value map. Two reserved keys, both prefixed
// with an underscore so they can never collide with schema fields, carry
// bookkeeping for collection items:
//
//   _filename — the file the record was read from
//   _body     — the markdown prose payload, kept apart from frontmatter

use serde_json::{Map, Value};

/// Reserved key: origin file name of a collection record.
pub const FILENAME_KEY: &str = "_filename";

/// Reserved key: markdown body of a collection record.
pub const BODY_KEY: &str = "_body";

/// One content record. serde_json's preserve_order feature keeps keys in
/// file order, which keeps re-serialization byte-stable.
pub type Record = Map<String, Value>;

/// Fetched content for a config: one record or many, depending on shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Singleton result.
    Single(Record),
    /// Array or collection result.
    Many(Vec<Record>),
}

impl Content {
    pub fn len(&self) -> usize {
        match self {
            Content::Single(_) => 1,
            Content::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Many(items) if items.is_empty())
    }

    /// Items view: a singleton is a one-element slice.
    pub fn items(&self) -> Vec<&Record> {
        match self {
            Content::Single(record) => vec![record],
            Content::Many(items) => items.iter().collect(),
        }
    }

    pub fn into_many(self) -> Vec<Record> {
        match self {
            Content::Single(record) => vec![record],
            Content::Many(items) => items,
        }
    }
}

/// The record minus reserved keys — what actually lands in a file.
pub fn strip_reserved(record: &Record) -> Record {
    record
        .iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// The record's value at `id_field` as the string identifier callers use.
pub fn id_of(record: &Record, id_field: &str) -> Option<String> {
    record.get(id_field).map(value_to_id)
}

/// Identifier rendering: strings stay bare, everything else serializes.
pub fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
