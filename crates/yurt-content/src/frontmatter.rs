// frontmatter.rs — Markdown frontmatter codec.
//
// Wire format: a YAML key-value block fenced by `---` lines, a blank line,
// then the prose body. Parsing and rendering round-trip: rendering a parsed
// file with unchanged data reproduces the frontmatter block byte for byte
// (key order follows the record's key order).

use serde_json::Value;

use crate::error::ContentError;
use crate::record::Record;

/// Split a markdown file into its frontmatter record and body.
///
/// A file without a frontmatter fence parses as an empty record with the
/// whole text as body.
pub fn parse(path: &str, text: &str) -> Result<(Record, String), ContentError> {
    let Some(rest) = text.strip_prefix("---\n") else {
        return Ok((Record::new(), text.to_string()));
    };

    let (yaml, after) = match rest.find("\n---\n") {
        Some(end) => (&rest[..end + 1], &rest[end + 5..]),
        None => match rest.strip_suffix("\n---") {
            // Fence at end of file: no body at all.
            Some(yaml) => (yaml, ""),
            None => {
                return Err(ContentError::Frontmatter {
                    path: path.to_string(),
                    reason: "unterminated frontmatter block".to_string(),
                })
            }
        },
    };

    let fields: Record = if yaml.trim().is_empty() {
        Record::new()
    } else {
        serde_yaml::from_str(yaml).map_err(|e| ContentError::Frontmatter {
            path: path.to_string(),
            reason: e.to_string(),
        })?
    };

    // One newline ends the fence line, one more is the blank separator.
    let body = after.strip_prefix('\n').unwrap_or(after);
    Ok((fields, body.to_string()))
}

/// Render a record and body back into frontmatter form.
pub fn render(fields: &Record, body: &str) -> Result<String, ContentError> {
    let mut out = String::from("---\n");
    if !fields.is_empty() {
        // serde_yaml writes a trailing newline of its own.
        let yaml =
            serde_yaml::to_string(&Value::Object(fields.clone())).map_err(|e| {
                ContentError::Frontmatter {
                    path: String::new(),
                    reason: e.to_string(),
                }
            })?;
        out.push_str(&yaml);
    }
    out.push_str("---\n");

    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}
