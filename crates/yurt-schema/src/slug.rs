// slug.rs — URL-safe identifiers derived from config labels.

/// Derive a URL-safe slug from a display label.
///
/// Lowercases, maps runs of non-alphanumeric characters to single hyphens,
/// and trims hyphens from both ends: "Blog Posts" → "blog-posts".
pub fn slugify(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_hyphen = false;

    for ch in label.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_hyphen = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Blog Posts"), "blog-posts");
    }

    #[test]
    fn collapses_punctuation_runs() {
        assert_eq!(slugify("FAQ — General (v2)"), "faq-general-v2");
    }

    #[test]
    fn trims_edges() {
        assert_eq!(slugify("  Team!  "), "team");
    }
}
