//! Resolution of discovery patterns into candidate plugin directories.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Expands `patterns` relative to `base_dir` into candidate directories.
///
/// `base_dir` is matched literally, so glob metacharacters in its name are
/// not pattern syntax.
///
/// Candidates are returned in pattern order, and in lexical order within a
/// pattern. Matches that are not directories are skipped. An invalid pattern
/// or an unreadable path is logged and skipped; discovery itself never fails.
///
/// A directory matched by more than one pattern appears once per match unless
/// `dedupe` is set.
pub fn discover(base_dir: &Path, patterns: &[String], dedupe: bool) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    let base = PathBuf::from(glob::Pattern::escape(&base_dir.to_string_lossy()));

    for pattern in patterns {
        let full = base.join(pattern);
        let full = full.to_string_lossy();

        let paths = match glob::glob(&full) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid plugin discovery pattern");
                continue;
            }
        };

        let mut matched: Vec<PathBuf> = paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(path = %e.path().display(), error = %e, "Unreadable discovery match");
                    None
                }
            })
            .filter(|path| path.is_dir())
            .collect();
        matched.sort();

        debug!(pattern = %pattern, count = matched.len(), "Resolved discovery pattern");

        for path in matched {
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen.insert(key) {
                if dedupe {
                    debug!(path = %path.display(), "Skipping duplicate plugin directory");
                    continue;
                }
                warn!(
                    path = %path.display(),
                    "Plugin directory matched by several patterns, it will be loaded again"
                );
            }
            candidates.push(path);
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["plugins/b", "plugins/a", "extra/c"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        std::fs::write(dir.path().join("plugins/readme.txt"), "not a plugin").unwrap();
        dir
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_pattern_order_then_lexical() {
        let dir = tree();
        let found = discover(
            dir.path(),
            &["extra/*".to_string(), "plugins/*".to_string()],
            false,
        );
        assert_eq!(names(&found), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_duplicates_kept_unless_deduped() {
        let dir = tree();
        let patterns = ["plugins/a".to_string(), "plugins/*".to_string()];

        assert_eq!(names(&discover(dir.path(), &patterns, false)), vec!["a", "a", "b"]);
        assert_eq!(names(&discover(dir.path(), &patterns, true)), vec!["a", "b"]);
    }

    #[test]
    fn test_base_dir_with_glob_characters() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("proj[1]");
        std::fs::create_dir_all(base.join("plugins/a")).unwrap();

        let found = discover(&base, &["plugins/*".to_string()], false);
        assert_eq!(found, vec![base.join("plugins/a")]);
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let dir = tree();
        let found = discover(
            dir.path(),
            &["plugins/[".to_string(), "extra/*".to_string()],
            false,
        );
        assert_eq!(names(&found), vec!["c"]);
    }
}
