//! Moving single files into their category subfolders.
//!
//! The [`Organizer`] classifies one file, makes sure the category subfolder
//! exists next to it, picks a collision-free destination and moves the file
//! there. Moves use a rename, falling back to copy-then-delete when the
//! rename is refused (for example across volumes).

use crate::config::SorterConfig;
use crate::file_category::classify;
use crate::path_resolver::{resolve_unique, resolve_unique_with};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Represents a single completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The original path of the file before organization.
    pub original_path: PathBuf,
    /// The new path of the file after organization.
    pub new_path: PathBuf,
    /// The category the file was moved to.
    pub category: String,
}

/// Why an entry was left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Directories are never classified or moved.
    Directory,
    /// Matched an ignore rule.
    Ignored,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Directory => write!(f, "is a directory"),
            SkipReason::Ignored => write!(f, "matched an ignore rule"),
        }
    }
}

/// Result of organizing one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizeOutcome {
    Moved(Operation),
    Skipped { path: PathBuf, reason: SkipReason },
}

/// A move that would happen, computed without touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: String,
}

/// Errors that can occur while organizing files.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The folder to organize does not exist or cannot be listed.
    #[error("invalid folder {}: {source}", path.display())]
    InvalidFolder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file disappeared between detection and move.
    #[error("file vanished before it could be moved: {}", path.display())]
    FileVanished { path: PathBuf },
    /// The file exists but its metadata cannot be read.
    #[error("cannot inspect {}: {source}", path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Failed to create a category directory.
    #[error("failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Both the rename and the copy+delete fallback failed.
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The path has no file name component (e.g. `/` or `..`).
    #[error("path has no file name: {}", .0.display())]
    NoFileName(PathBuf),
}

impl OrganizeError {
    /// True for failures that will hit every other file as well, such as a
    /// read-only or full volume. Everything else concerns one file only.
    pub fn is_fatal(&self) -> bool {
        match self {
            OrganizeError::DirectoryCreationFailed { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ReadOnlyFilesystem | io::ErrorKind::StorageFull
            ),
            _ => false,
        }
    }
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// What `inspect` learned about a path.
enum Inspection<'a> {
    Organize {
        folder: &'a Path,
        file_name: &'a std::ffi::OsStr,
        category: String,
    },
    Skip(SkipReason),
}

/// Classifies and moves single files.
///
/// Cloning is cheap; clones share the same configuration, so one organizer
/// can serve the batch scanner and the watch loop at once.
#[derive(Debug, Clone, Default)]
pub struct Organizer {
    config: Arc<SorterConfig>,
}

impl Organizer {
    pub fn new(config: SorterConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    /// Organizes a single file into `{parent}/{category}/{name}`.
    ///
    /// Directories and ignored files are skipped. The category directory is
    /// created if absent, and the destination never overwrites an existing
    /// entry (`name (1).ext`, `name (2).ext`, ...).
    ///
    /// # Errors
    ///
    /// * `FileVanished` if the source no longer exists
    /// * `DirectoryCreationFailed` if the category directory cannot be created
    /// * `MoveFailed` if neither rename nor copy+delete worked
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tidywatch::config::{CategoryTable, SorterConfig};
    /// use tidywatch::file_organizer::{Organizer, OrganizeOutcome};
    /// use std::path::Path;
    ///
    /// let table = CategoryTable::from_entries([("Images", [".jpg"])]);
    /// let organizer = Organizer::new(SorterConfig::with_table(table));
    ///
    /// match organizer.organize_one(Path::new("/home/me/Downloads/cat.jpg")) {
    ///     Ok(OrganizeOutcome::Moved(op)) => println!("now at {}", op.new_path.display()),
    ///     Ok(OrganizeOutcome::Skipped { reason, .. }) => println!("skipped: {}", reason),
    ///     Err(e) => eprintln!("failed: {}", e),
    /// }
    /// ```
    pub fn organize_one(&self, file_path: &Path) -> OrganizeResult<OrganizeOutcome> {
        let (folder, file_name, category) = match self.inspect(file_path)? {
            Inspection::Organize {
                folder,
                file_name,
                category,
            } => (folder, file_name, category),
            Inspection::Skip(reason) => {
                debug!(path = %file_path.display(), %reason, "skipping entry");
                return Ok(OrganizeOutcome::Skipped {
                    path: file_path.to_path_buf(),
                    reason,
                });
            }
        };

        let category_path = folder.join(&category);
        fs::create_dir_all(&category_path).map_err(|source| {
            OrganizeError::DirectoryCreationFailed {
                path: category_path.clone(),
                source,
            }
        })?;

        let destination = resolve_unique(&category_path.join(file_name));

        move_file(file_path, &destination).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                OrganizeError::FileVanished {
                    path: file_path.to_path_buf(),
                }
            } else {
                OrganizeError::MoveFailed {
                    from: file_path.to_path_buf(),
                    to: destination.clone(),
                    source,
                }
            }
        })?;

        info!(
            path = %file_path.display(),
            destination = %destination.display(),
            category = %category,
            "moved file"
        );

        Ok(OrganizeOutcome::Moved(Operation {
            original_path: file_path.to_path_buf(),
            new_path: destination,
            category,
        }))
    }

    /// Computes where `organize_one` would put a file, without changing anything.
    ///
    /// Returns `Ok(None)` for entries that would be skipped.
    pub fn plan_one(&self, file_path: &Path) -> OrganizeResult<Option<PlannedMove>> {
        self.plan_one_with(file_path, &HashSet::new())
    }

    /// Like [`Organizer::plan_one`], treating `taken` as occupied on top of
    /// whatever already exists on disk.
    pub fn plan_one_with(
        &self,
        file_path: &Path,
        taken: &HashSet<PathBuf>,
    ) -> OrganizeResult<Option<PlannedMove>> {
        match self.inspect(file_path)? {
            Inspection::Organize {
                folder,
                file_name,
                category,
            } => {
                let destination =
                    resolve_unique_with(&folder.join(&category).join(file_name), |p| {
                        taken.contains(p) || fs::symlink_metadata(p).is_ok()
                    });
                Ok(Some(PlannedMove {
                    source: file_path.to_path_buf(),
                    destination,
                    category,
                }))
            }
            Inspection::Skip(_) => Ok(None),
        }
    }

    fn inspect<'a>(&self, file_path: &'a Path) -> OrganizeResult<Inspection<'a>> {
        let metadata = fs::symlink_metadata(file_path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                OrganizeError::FileVanished {
                    path: file_path.to_path_buf(),
                }
            } else {
                OrganizeError::Inaccessible {
                    path: file_path.to_path_buf(),
                    source,
                }
            }
        })?;

        // Links to directories count as directories; dangling links are files.
        let is_dir = if metadata.file_type().is_symlink() {
            fs::metadata(file_path).is_ok_and(|target| target.is_dir())
        } else {
            metadata.is_dir()
        };
        if is_dir {
            return Ok(Inspection::Skip(SkipReason::Directory));
        }

        let file_name = file_path
            .file_name()
            .ok_or_else(|| OrganizeError::NoFileName(file_path.to_path_buf()))?;
        let name = file_name.to_string_lossy();

        if self.config.ignore.is_ignored(&name) {
            return Ok(Inspection::Skip(SkipReason::Ignored));
        }

        let folder = file_path.parent().unwrap_or_else(|| Path::new(""));
        let category = classify(&name, &self.config.table).to_string();

        Ok(Inspection::Organize {
            folder,
            file_name,
            category,
        })
    }
}

/// Moves a file, renaming when possible and copying then deleting otherwise.
///
/// The fallback copy refuses to overwrite `to`, and the source is deleted
/// only once the copy is complete. If the source cannot be deleted the copy
/// is removed again, so the file never ends up in both places.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e) => {
            debug!(
                from = %from.display(),
                to = %to.display(),
                error = %e,
                "rename failed, falling back to copy"
            );
            copy_then_remove(from, to)
        }
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let mut source = File::open(from)?;
    let permissions = source.metadata()?.permissions();
    let mut target = OpenOptions::new().write(true).create_new(true).open(to)?;

    if let Err(e) = io::copy(&mut source, &mut target).and_then(|_| target.sync_all()) {
        drop(target);
        let _ = fs::remove_file(to);
        return Err(e);
    }
    drop(target);
    let _ = fs::set_permissions(to, permissions);

    if let Err(e) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}
