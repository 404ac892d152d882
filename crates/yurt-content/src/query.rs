// query.rs — The collectionPath query expression.
//
// Deliberately small: dot-separated keys with an optional `$`/`$.` prefix,
// `*` (or `[*]`) as a wildcard over object values or array elements, and
// bare numeric segments as array indexes. That covers every config in the
// wild; this is not a general JSONPath engine and must not grow into one.

use serde_json::Value;

/// Split a query expression into segments.
fn segments(path: &str) -> Vec<String> {
    path.replace("[*]", ".*")
        .split('.')
        .filter(|s| !s.is_empty() && *s != "$")
        .map(str::to_string)
        .collect()
}

/// Select every value matched by the expression.
pub fn select<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![root];
    for seg in segments(path) {
        let mut next = Vec::new();
        for value in current {
            match (seg.as_str(), value) {
                ("*", Value::Object(map)) => next.extend(map.values()),
                ("*", Value::Array(items)) => next.extend(items.iter()),
                (key, Value::Object(map)) => {
                    if let Some(v) = map.get(key) {
                        next.push(v);
                    }
                }
                (key, Value::Array(items)) => {
                    if let Ok(idx) = key.parse::<usize>() {
                        if let Some(v) = items.get(idx) {
                            next.push(v);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

/// Walk to each array matched by the expression and hand it to `apply`,
/// stopping at the first array for which `apply` returns true.
///
/// This is the mutation path: the caller edits the array in place and the
/// surrounding document structure is untouched, so re-serialization
/// preserves everything else.
pub fn with_array_mut<F>(root: &mut Value, path: &str, apply: &mut F) -> bool
where
    F: FnMut(&mut Vec<Value>) -> bool,
{
    let segs = segments(path);
    walk_mut(root, &segs, apply)
}

fn walk_mut<F>(value: &mut Value, segs: &[String], apply: &mut F) -> bool
where
    F: FnMut(&mut Vec<Value>) -> bool,
{
    if segs.is_empty() {
        if let Value::Array(items) = value {
            return apply(items);
        }
        return false;
    }

    let (seg, rest) = (&segs[0], &segs[1..]);
    match (seg.as_str(), value) {
        ("*", Value::Object(map)) => {
            for child in map.values_mut() {
                if walk_mut(child, rest, apply) {
                    return true;
                }
            }
            false
        }
        ("*", Value::Array(items)) => {
            for child in items.iter_mut() {
                if walk_mut(child, rest, apply) {
                    return true;
                }
            }
            false
        }
        (key, Value::Object(map)) => match map.get_mut(key) {
            Some(child) => walk_mut(child, rest, apply),
            None => false,
        },
        (key, Value::Array(items)) => match key.parse::<usize>() {
            Ok(idx) => match items.get_mut(idx) {
                Some(child) => walk_mut(child, rest, apply),
                None => false,
            },
            Err(_) => false,
        },
        _ => false,
    }
}
