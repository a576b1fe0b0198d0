//! tidywatch - keep a folder sorted into category subfolders
//!
//! This library classifies files by extension against a configurable
//! category table, moves them into `{folder}/{category}/` without ever
//! overwriting, organizes a folder's existing contents in one pass, and
//! watches the folder to organize new files as they arrive.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod output;
pub mod path_resolver;
pub mod scanner;
pub mod watcher;

pub use config::{CategoryTable, ConfigError, IgnoreRules, SorterConfig};
pub use file_category::{FALLBACK_CATEGORY, classify};
pub use file_organizer::{OrganizeError, OrganizeOutcome, Organizer};
pub use path_resolver::resolve_unique;
pub use scanner::{BatchScanner, ScanReport};
pub use watcher::{WatchError, WatchSession, WatchStats, start_watching};
