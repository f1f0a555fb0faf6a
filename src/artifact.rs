//! Symbol artifact checks.
//!
//! A missing artifact is not an error: builds that do not produce debug
//! symbols simply skip the upload.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

/// What, if anything, lives at the artifact path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Missing,
    File,
    Directory,
}

/// Inspect `path`, following symlinks. Unreadable entries count as
/// missing.
pub fn validate(path: &Path) -> PathState {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => PathState::Directory,
        Ok(_) => PathState::File,
        Err(_) => PathState::Missing,
    }
}

/// Number of `.dSYM` bundles under `dir` (including `dir` itself).
///
/// Only used for log output.
pub fn count_dsym_bundles(dir: &Path) -> usize {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("dSYM"))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing() {
        let temp = TempDir::new().unwrap();
        assert_eq!(validate(&temp.path().join("nope.txt")), PathState::Missing);
    }

    #[test]
    fn test_file_and_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("mapping.txt");
        fs::write(&file, "a -> b").unwrap();

        assert_eq!(validate(&file), PathState::File);
        assert_eq!(validate(temp.path()), PathState::Directory);
    }

    #[test]
    fn test_count_dsym_bundles() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("App.app.dSYM/Contents/Resources/DWARF")).unwrap();
        fs::create_dir_all(temp.path().join("nested/Widget.appex.dSYM")).unwrap();
        fs::create_dir_all(temp.path().join("Other.framework")).unwrap();
        fs::write(temp.path().join("stray.dSYM"), b"").unwrap();

        assert_eq!(count_dsym_bundles(temp.path()), 2);
    }

    #[test]
    fn test_count_on_empty_directory() {
        let temp = TempDir::new().unwrap();
        assert_eq!(count_dsym_bundles(temp.path()), 0);
    }
}
