//! One-shot organization of a folder's current contents.

use crate::file_organizer::{
    Operation, OrganizeError, OrganizeOutcome, OrganizeResult, Organizer, PlannedMove,
};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Summary of one batch pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Files that were moved.
    pub moved: Vec<Operation>,
    /// Entries left in place (directories, ignored or vanished files).
    pub skipped: Vec<(PathBuf, String)>,
    /// Files that could not be moved.
    pub failed: Vec<(PathBuf, String)>,
}

impl ScanReport {
    /// Returns the total number of entries processed.
    pub fn total_processed(&self) -> usize {
        self.moved.len() + self.skipped.len() + self.failed.len()
    }

    /// Returns true if no file failed to move.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of moved files per category.
    pub fn category_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for op in &self.moved {
            *counts.entry(op.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    fn record(
        &mut self,
        path: &Path,
        result: OrganizeResult<OrganizeOutcome>,
    ) -> OrganizeResult<()> {
        match result {
            Ok(OrganizeOutcome::Moved(operation)) => self.moved.push(operation),
            Ok(OrganizeOutcome::Skipped { path, reason }) => {
                self.skipped.push((path, reason.to_string()));
            }
            Err(e @ OrganizeError::FileVanished { .. }) => {
                warn!(path = %path.display(), "file vanished before it could be organized");
                self.skipped.push((path.to_path_buf(), e.to_string()));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not organize file");
                self.failed.push((path.to_path_buf(), e.to_string()));
            }
        }
        Ok(())
    }
}

/// Organizes the entries present in a folder at one point in time.
#[derive(Debug, Clone)]
pub struct BatchScanner {
    organizer: Organizer,
}

impl BatchScanner {
    pub fn new(organizer: Organizer) -> Self {
        Self { organizer }
    }

    /// Lists the immediate entries of `folder`, sorted by path.
    ///
    /// The listing is taken in full before anything is moved, so category
    /// folders created during the pass are never part of it.
    pub fn snapshot(folder: &Path) -> OrganizeResult<Vec<PathBuf>> {
        let entries = fs::read_dir(folder).map_err(|source| OrganizeError::InvalidFolder {
            path: folder.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        paths.sort();
        Ok(paths)
    }

    /// Organizes every file directly inside `folder`.
    ///
    /// A single file failing never stops the pass; see [`ScanReport`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidFolder` if the folder cannot be listed, or the first
    /// fatal error (read-only or full volume) encountered.
    pub fn organize_existing(&self, folder: &Path) -> OrganizeResult<ScanReport> {
        self.organize_existing_with(folder, |_, _| {})
    }

    /// Same as [`BatchScanner::organize_existing`], calling `on_entry` after
    /// each entry has been handled.
    pub fn organize_existing_with<F>(
        &self,
        folder: &Path,
        on_entry: F,
    ) -> OrganizeResult<ScanReport>
    where
        F: FnMut(&Path, &OrganizeResult<OrganizeOutcome>),
    {
        let entries = Self::snapshot(folder)?;
        info!(folder = %folder.display(), entries = entries.len(), "organizing existing files");
        self.organize_entries_with(entries, on_entry)
    }

    /// Organizes a listing previously taken with [`BatchScanner::snapshot`].
    pub fn organize_entries_with<F>(
        &self,
        entries: Vec<PathBuf>,
        mut on_entry: F,
    ) -> OrganizeResult<ScanReport>
    where
        F: FnMut(&Path, &OrganizeResult<OrganizeOutcome>),
    {
        let mut report = ScanReport::default();
        for path in entries {
            let result = self.organizer.organize_one(&path);
            on_entry(&path, &result);
            report.record(&path, result)?;
        }

        info!(
            moved = report.moved.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "batch pass complete"
        );
        Ok(report)
    }

    /// Lists the moves a pass would make, without making them.
    ///
    /// Destinations already handed out earlier in the plan count as taken,
    /// so the plan matches what a real pass would do.
    pub fn plan_existing(&self, folder: &Path) -> OrganizeResult<Vec<PlannedMove>> {
        let mut plan = Vec::new();
        let mut taken = HashSet::new();
        for path in Self::snapshot(folder)? {
            match self.organizer.plan_one_with(&path, &taken) {
                Ok(Some(planned)) => {
                    taken.insert(planned.destination.clone());
                    plan.push(planned);
                }
                Ok(None) | Err(OrganizeError::FileVanished { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryTable, SorterConfig};
    use tempfile::TempDir;

    fn scanner() -> BatchScanner {
        let table =
            CategoryTable::from_entries([("Images", vec![".jpg"]), ("Docs", vec![".txt"])]);
        BatchScanner::new(Organizer::new(SorterConfig::with_table(table)))
    }

    #[test]
    fn test_organize_existing_moves_every_file() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("a.jpg"), "").unwrap();
        fs::write(base.join("b.txt"), "").unwrap();
        fs::write(base.join("c.unknownext"), "").unwrap();

        let report = scanner().organize_existing(base).unwrap();

        assert_eq!(report.moved.len(), 3);
        assert!(report.is_complete_success());
        assert!(base.join("Images/a.jpg").exists());
        assert!(base.join("Docs/b.txt").exists());
        assert!(base.join("Others/c.unknownext").exists());

        let counts = report.category_counts();
        assert_eq!(counts.get("Images"), Some(&1));
        assert_eq!(counts.get("Others"), Some(&1));
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("a.jpg"), "").unwrap();
        fs::write(base.join("b.txt"), "").unwrap();

        let scanner = scanner();
        scanner.organize_existing(base).unwrap();
        let second = scanner.organize_existing(base).unwrap();

        assert!(second.moved.is_empty());
        assert_eq!(second.skipped.len(), 2);
    }

    #[test]
    fn test_callback_sees_every_entry() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("a.jpg"), "").unwrap();
        fs::create_dir(base.join("keep")).unwrap();

        let mut seen = Vec::new();
        let report = scanner()
            .organize_existing_with(base, |path, _| seen.push(path.to_path_buf()))
            .unwrap();

        assert_eq!(seen.len(), 2);
        assert_eq!(report.total_processed(), 2);
    }

    #[test]
    fn test_invalid_folder() {
        let result = scanner().organize_existing(Path::new("/non/existent/folder"));
        assert!(matches!(result, Err(OrganizeError::InvalidFolder { .. })));
    }

    #[test]
    fn test_vanished_file_is_skipped_not_failed() {
        let mut report = ScanReport::default();
        let path = PathBuf::from("/tmp/gone.txt");
        report
            .record(
                &path,
                Err(OrganizeError::FileVanished { path: path.clone() }),
            )
            .unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert!(report.is_complete_success());
    }

    #[test]
    fn test_fatal_error_aborts_the_pass() {
        let mut report = ScanReport::default();
        let path = PathBuf::from("/ro/a.jpg");
        let result = report.record(
            &path,
            Err(OrganizeError::DirectoryCreationFailed {
                path: PathBuf::from("/ro/Images"),
                source: std::io::Error::from(std::io::ErrorKind::ReadOnlyFilesystem),
            }),
        );

        assert!(matches!(
            result,
            Err(OrganizeError::DirectoryCreationFailed { .. })
        ));
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_per_file_error_is_recorded() {
        let mut report = ScanReport::default();
        let path = PathBuf::from("/x/a.jpg");
        report
            .record(
                &path,
                Err(OrganizeError::DirectoryCreationFailed {
                    path: PathBuf::from("/x/Images"),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                }),
            )
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_complete_success());
    }

    #[test]
    fn test_organize_entries_uses_given_listing() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("a.jpg"), "").unwrap();
        let entries = BatchScanner::snapshot(base).unwrap();
        fs::write(base.join("late.txt"), "").unwrap();

        let report = scanner().organize_entries_with(entries, |_, _| {}).unwrap();

        assert_eq!(report.total_processed(), 1);
        assert!(base.join("Images/a.jpg").exists());
        assert!(base.join("late.txt").exists());
    }

    #[test]
    fn test_plan_existing_leaves_files_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::write(base.join("a.jpg"), "").unwrap();
        fs::write(base.join("notes"), "").unwrap();

        let plan = scanner().plan_existing(base).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].destination, base.join("Images").join("a.jpg"));
        assert_eq!(plan[1].destination, base.join("Others").join("notes"));
        assert!(base.join("a.jpg").exists());
        assert!(!base.join("Images").exists());
    }
}
