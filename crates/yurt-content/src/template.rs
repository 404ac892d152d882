// template.rs — {{placeholder}} substitution.
//
// Single-token substitution only: `{{name}}` is replaced with the
// same-named data field rendered as a string, and left untouched when the
// field is absent. No conditionals, no loops. Configs rely on unmatched
// placeholders passing through unchanged, so this must never grow into a
// general template engine.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::record::{value_to_id, Record};

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid regex"))
}

/// Replace each `{{name}}` with `data[name]`; unknown names pass through.
pub fn substitute(template: &str, data: &Record) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures<'_>| {
            match data.get(&caps[1]) {
                Some(value) => value_to_id(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Substitute placeholders inside every string-valued field of a record.
pub fn substitute_fields(fields: &Record, data: &Record) -> Record {
    fields
        .iter()
        .map(|(key, value)| {
            let replaced = match value {
                Value::String(s) => Value::String(substitute(s, data)),
                other => other.clone(),
            };
            (key.clone(), replaced)
        })
        .collect()
}
