// validate.rs — Record validation against a config's field definitions.
//
// Validation is advisory and total: it never aborts at the first problem,
// it collects every issue so the editor can mark all bad inputs in one
// round trip. Absent optional fields are fine; present values must match
// their declared type.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use url::Url;
use yurt_schema::{Field, FieldSet, FieldType};

use crate::record::{id_of, Record, FILENAME_KEY};

/// One problem with one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"))
}

/// Check `record` against the field definitions, collecting every issue.
pub fn validate_record(fields: &FieldSet, record: &Record) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for field in fields.iter() {
        check_field(field, record.get(&field.name), &field.name, &mut issues);
    }
    issues
}

fn check_field(
    field: &Field,
    value: Option<&Value>,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let value = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v),
    };
    let Some(value) = value else {
        // Generated fields are filled by the engine before anything is
        // committed, so an empty input is expected.
        if field.required && !field.generated {
            issues.push(ValidationIssue {
                field: path.to_string(),
                message: format!("{} is required", field.label()),
            });
        }
        return;
    };

    match field.ty {
        FieldType::Text | FieldType::Textarea | FieldType::Markdown | FieldType::Image => {
            if !value.is_string() {
                push_type_issue(issues, path, field, "a string");
            }
        }
        FieldType::Email => match value.as_str() {
            Some(s) if email_re().is_match(s) => {}
            _ => push_type_issue(issues, path, field, "an email address"),
        },
        FieldType::Url => match value.as_str() {
            Some(s) if Url::parse(s).is_ok() => {}
            _ => push_type_issue(issues, path, field, "a URL"),
        },
        FieldType::Number => {
            if !value.is_number() {
                push_type_issue(issues, path, field, "a number");
            }
        }
        FieldType::Date => match value.as_str() {
            Some(s) if is_date(s) => {}
            _ => push_type_issue(issues, path, field, "a date"),
        },
        FieldType::Boolean => {
            if !value.is_boolean() {
                push_type_issue(issues, path, field, "true or false");
            }
        }
        FieldType::Array => match value.as_array() {
            Some(items) => {
                if let Some(nested) = &field.fields {
                    for (index, item) in items.iter().enumerate() {
                        check_array_item(nested, item, path, index, issues);
                    }
                }
            }
            None => push_type_issue(issues, path, field, "a list"),
        },
    }
}

fn check_array_item(
    nested: &FieldSet,
    item: &Value,
    path: &str,
    index: usize,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(record) = item.as_object() else {
        issues.push(ValidationIssue {
            field: format!("{path}[{index}]"),
            message: "list entries must be objects".to_string(),
        });
        return;
    };
    for field in nested.iter() {
        let child_path = format!("{path}[{index}].{}", field.name);
        check_field(field, record.get(&field.name), &child_path, issues);
    }
}

fn push_type_issue(issues: &mut Vec<ValidationIssue>, path: &str, field: &Field, expected: &str) {
    issues.push(ValidationIssue {
        field: path.to_string(),
        message: format!("{} must be {expected}", field.label()),
    });
}

/// Accept calendar dates and full timestamps.
fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
}

/// True when another item already carries `id`. For collections the item
/// being edited is excluded by its filename so saving without renaming
/// never trips the check.
pub fn is_id_taken(
    items: &[Record],
    id_field: &str,
    id: &str,
    exclude_filename: Option<&str>,
) -> bool {
    items.iter().any(|item| {
        if let Some(exclude) = exclude_filename {
            if item.get(FILENAME_KEY).and_then(Value::as_str) == Some(exclude) {
                return false;
            }
        }
        id_of(item, id_field).as_deref() == Some(id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yurt_schema::{normalize_fields, FieldsDecl};

    fn fields(json: serde_json::Value) -> FieldSet {
        let decl: FieldsDecl = serde_json::from_value(json).unwrap();
        normalize_fields(&decl).unwrap()
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn required_fields_must_be_present_and_non_empty() {
        let set = fields(json!({
            "title": { "type": "text", "required": true },
            "subtitle": "text"
        }));

        assert!(validate_record(&set, &record(json!({"title": "Hi"}))).is_empty());

        let issues = validate_record(&set, &record(json!({"title": ""})));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "title");
        assert_eq!(issues[0].message, "Title is required");
    }

    #[test]
    fn generated_fields_may_be_empty() {
        let set = fields(json!({
            "id": { "type": "text", "required": true, "generated": true }
        }));
        assert!(validate_record(&set, &record(json!({}))).is_empty());
    }

    #[test]
    fn type_checks_cover_the_scalar_types() {
        let set = fields(json!({
            "contact": "email",
            "site": "url",
            "count": "number",
            "when": "date",
            "live": "boolean"
        }));

        let good = record(json!({
            "contact": "a@b.co",
            "site": "https://example.com",
            "count": 3,
            "when": "2026-08-29",
            "live": true
        }));
        assert!(validate_record(&set, &good).is_empty());

        let bad = record(json!({
            "contact": "not-an-email",
            "site": "not a url",
            "count": "3",
            "when": "yesterday",
            "live": "yes"
        }));
        let issues = validate_record(&set, &bad);
        assert_eq!(issues.len(), 5);
    }

    #[test]
    fn rfc3339_timestamps_count_as_dates() {
        let set = fields(json!({"when": "date"}));
        let rec = record(json!({"when": "2026-08-29T10:00:00Z"}));
        assert!(validate_record(&set, &rec).is_empty());
    }

    #[test]
    fn array_items_are_validated_recursively() {
        let set = fields(json!({
            "links": {
                "type": "array",
                "fields": { "url": { "type": "url", "required": true } }
            }
        }));

        let rec = record(json!({
            "links": [
                { "url": "https://example.com" },
                { "url": "nope" },
                {}
            ]
        }));
        let issues = validate_record(&set, &rec);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].field, "links[1].url");
        assert_eq!(issues[1].field, "links[2].url");
    }

    #[test]
    fn id_uniqueness_excludes_the_edited_file() {
        let items = vec![
            record(json!({"slug": "hello", "_filename": "hello.md"})),
            record(json!({"slug": "other", "_filename": "other.md"})),
        ];

        assert!(is_id_taken(&items, "slug", "other", Some("hello.md")));
        assert!(!is_id_taken(&items, "slug", "hello", Some("hello.md")));
        assert!(is_id_taken(&items, "slug", "hello", None));
        assert!(!is_id_taken(&items, "slug", "brand-new", None));
    }
}
