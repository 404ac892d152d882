// path.rs — Resolution of config-declared file references.
//
// Configs reference their content and template files relative to the config
// file's own location in the repository tree. Repository paths are plain
// '/'-separated strings; std::path is deliberately not used here because
// these are never OS paths.

/// Resolve a file reference declared in a config against the config file's
/// location.
///
/// - `./x` resolves against the config's containing directory
/// - `../x` walks up one directory per `../` segment; walking past the
///   repository root is a no-op rather than an error
/// - anything else is treated as already root-relative (a leading `./` or
///   bare `.` is normalized away)
pub fn resolve_path(config_path: &str, reference: &str) -> String {
    let dir = match config_path.rfind('/') {
        Some(idx) => &config_path[..idx],
        None => "",
    };

    let mut segments: Vec<&str> = if reference.starts_with("./") || reference.starts_with("../") {
        dir.split('/').filter(|s| !s.is_empty()).collect()
    } else {
        Vec::new()
    };

    for part in reference.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                // Clamped at root: popping an empty stack is a no-op.
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_reference() {
        assert_eq!(resolve_path("a/b/c.json", "./d.json"), "a/b/d.json");
    }

    #[test]
    fn parent_reference() {
        assert_eq!(resolve_path("a/b/c.json", "../d.json"), "a/d.json");
    }

    #[test]
    fn root_level_config_has_no_leading_slash() {
        assert_eq!(resolve_path("c.json", "./d.json"), "d.json");
    }

    #[test]
    fn walking_past_root_is_clamped() {
        assert_eq!(resolve_path("c.json", "../../d.json"), "d.json");
        assert_eq!(resolve_path("a/c.json", "../../../d.json"), "d.json");
    }

    #[test]
    fn bare_root_relative_reference_passes_through() {
        assert_eq!(resolve_path("a/b/c.json", "data/team.json"), "data/team.json");
    }

    #[test]
    fn leading_dot_slash_normalized_for_root_relative() {
        assert_eq!(resolve_path("c.json", "./sub/d.json"), "sub/d.json");
    }

    #[test]
    fn multiple_parent_segments() {
        assert_eq!(resolve_path("a/b/c/x.json", "../../d.json"), "a/d.json");
    }
}
