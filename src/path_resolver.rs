//! Collision-free destination paths.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns `path` if nothing exists there, otherwise the first free
/// `stem (n)ext` sibling, counting from 1.
///
/// The name is treated as an opaque string: a file already called
/// `report (1).pdf` resolves to `report (1) (1).pdf`, not `report (2).pdf`.
/// Nothing is reserved, so the result is only free at the moment of the check.
///
/// # Examples
///
/// ```no_run
/// use tidywatch::path_resolver::resolve_unique;
/// use std::path::Path;
///
/// // With Documents/report.pdf already present:
/// let dest = resolve_unique(Path::new("Documents/report.pdf"));
/// assert_eq!(dest, Path::new("Documents/report (1).pdf"));
/// ```
pub fn resolve_unique(path: &Path) -> PathBuf {
    resolve_unique_with(path, entry_exists)
}

/// Like [`resolve_unique`], with the caller deciding which paths are taken.
///
/// Used for planning, where destinations handed out earlier in the same plan
/// must count as taken even though nothing exists there yet.
pub fn resolve_unique_with<F>(path: &Path, is_taken: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    if !is_taken(path) {
        return path.to_path_buf();
    }

    let Some(stem) = path.file_stem() else {
        return path.to_path_buf();
    };
    let extension = path.extension();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let mut counter: u64 = 1;
    loop {
        let mut name = OsString::from(stem);
        name.push(format!(" ({})", counter));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }

        let candidate = parent.join(name);
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// True for any directory entry, including dangling symlinks.
fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_free_path_is_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.pdf");
        assert_eq!(resolve_unique(&path), path);
    }

    #[test]
    fn test_collision_appends_counter() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.pdf");
        fs::write(&path, "first").unwrap();

        assert_eq!(
            resolve_unique(&path),
            temp_dir.path().join("report (1).pdf")
        );
    }

    #[test]
    fn test_counter_increments_past_taken_slots() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("report.pdf"), "").unwrap();
        fs::write(base.join("report (1).pdf"), "").unwrap();
        fs::write(base.join("report (2).pdf"), "").unwrap();

        assert_eq!(
            resolve_unique(&base.join("report.pdf")),
            base.join("report (3).pdf")
        );
    }

    #[test]
    fn test_existing_counter_is_not_reparsed() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("report (1).pdf"), "").unwrap();

        assert_eq!(
            resolve_unique(&base.join("report (1).pdf")),
            base.join("report (1) (1).pdf")
        );
    }

    #[test]
    fn test_extensionless_and_dotfiles() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("README"), "").unwrap();
        fs::write(base.join(".bashrc"), "").unwrap();

        assert_eq!(resolve_unique(&base.join("README")), base.join("README (1)"));
        assert_eq!(
            resolve_unique(&base.join(".bashrc")),
            base.join(".bashrc (1)")
        );
    }

    #[test]
    fn test_multi_dot_name_keeps_last_extension() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("backup.tar.gz"), "").unwrap();

        assert_eq!(
            resolve_unique(&base.join("backup.tar.gz")),
            base.join("backup.tar (1).gz")
        );
    }

    #[test]
    fn test_caller_supplied_taken_paths() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("report.pdf"), "").unwrap();
        let reserved = base.join("report (1).pdf");

        let resolved = resolve_unique_with(&base.join("report.pdf"), |p| {
            entry_exists(p) || p == reserved
        });
        assert_eq!(resolved, base.join("report (2).pdf"));
    }

    #[test]
    fn test_existing_directory_counts_as_collision() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir(base.join("photos")).unwrap();

        assert_eq!(resolve_unique(&base.join("photos")), base.join("photos (1)"));
    }
}
