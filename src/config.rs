//! Category table and ignore-rule configuration.
//!
//! The category table maps a category name (which is also the name of the
//! subfolder files are moved into) to the extensions it claims. Categories
//! are kept in document order: when two categories claim the same
//! extension, the first one listed wins.
//!
//! # Configuration File Format
//!
//! JSON files may use the flat shape:
//!
//! ```json
//! { "Images": [".jpg", ".png"], "Docs": [".txt", ".pdf"] }
//! ```
//!
//! or the structured shape, which TOML files always use:
//!
//! ```toml
//! [categories]
//! Images = [".jpg", ".png"]
//! Docs = [".txt", ".pdf"]
//!
//! [ignore]
//! include_hidden = true
//! filenames = ["desktop.ini"]
//! extensions = [".part", ".crdownload"]
//! patterns = ["~$*"]
//! regex = []
//! ```

use crate::file_category;
use glob::Pattern;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration file names looked up in the working directory.
pub const LOCAL_CONFIG_NAMES: [&str; 2] = [".tidywatch.toml", ".tidywatch.json"];

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// No configuration file exists at any of the searched locations.
    #[error("no configuration file found ({} locations searched)", searched.len())]
    NoneFound { searched: Vec<PathBuf> },
    /// The file could not be read.
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Invalid JSON/TOML syntax or structure.
    #[error("invalid configuration {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
    /// Invalid glob pattern in the ignore rules.
    #[error("invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern in the ignore rules.
    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
}

/// Immutable mapping from category name to the lowercase extensions it claims.
///
/// Extensions are stored with their leading dot (`".jpg"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTable {
    categories: IndexMap<String, HashSet<String>>,
}

impl CategoryTable {
    /// Creates an empty table. Every file classifies as the fallback category.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(category, extensions)` pairs, keeping their order.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidywatch::config::CategoryTable;
    ///
    /// let table = CategoryTable::from_entries([("Images", vec![".JPG", "png"])]);
    /// assert!(table.extensions("Images").unwrap().contains(".jpg"));
    /// assert!(table.extensions("Images").unwrap().contains(".png"));
    /// ```
    pub fn from_entries<I, C, E, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, E)>,
        C: Into<String>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for (category, extensions) in entries {
            table.insert(category, extensions);
        }
        table
    }

    /// Adds extensions to a category, creating it at the end of the table if new.
    pub fn insert<C, E, S>(&mut self, category: C, extensions: E)
    where
        C: Into<String>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = self.categories.entry(category.into()).or_default();
        set.extend(
            extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref())),
        );
    }

    /// Iterates categories in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<String>)> {
        self.categories
            .iter()
            .map(|(name, exts)| (name.as_str(), exts))
    }

    /// Returns the extension set of a category.
    pub fn extensions(&self, category: &str) -> Option<&HashSet<String>> {
        self.categories.get(category)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Normalizes a configured extension to lowercase with a single leading dot.
///
/// Returns `None` for blank entries.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{}", trimmed.to_lowercase()))
}

/// Rules for files that must be left where they are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreRules {
    /// Whether hidden files (starting with ".") are organized. Defaults to true.
    #[serde(default = "default_include_hidden")]
    pub include_hidden: bool,

    /// Exact filenames to leave alone (e.g., "desktop.ini").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Extensions to leave alone (e.g., ".part", ".crdownload").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns matched against the file name (e.g., "~$*").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

fn default_include_hidden() -> bool {
    true
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            include_hidden: true,
            filenames: Vec::new(),
            extensions: Vec::new(),
            patterns: Vec::new(),
            regex: Vec::new(),
        }
    }
}

impl IgnoreRules {
    /// Compiles the rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex pattern is invalid.
    pub fn compile(&self) -> Result<IgnoreMatcher, ConfigError> {
        let patterns = self
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let regexes = self
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IgnoreMatcher {
            include_hidden: self.include_hidden,
            filenames: self.filenames.iter().cloned().collect(),
            extensions: self
                .extensions
                .iter()
                .filter_map(|ext| normalize_extension(ext))
                .collect(),
            patterns,
            regexes,
        })
    }
}

/// Compiled ignore rules, matched against a bare file name.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    include_hidden: bool,
    filenames: HashSet<String>,
    extensions: HashSet<String>,
    patterns: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        Self {
            include_hidden: true,
            filenames: HashSet::new(),
            extensions: HashSet::new(),
            patterns: Vec::new(),
            regexes: Vec::new(),
        }
    }
}

impl IgnoreMatcher {
    /// Returns true if the file must not be organized.
    ///
    /// Checks run cheapest first: hidden flag, exact name, extension, glob, regex.
    pub fn is_ignored(&self, file_name: &str) -> bool {
        if !self.include_hidden && file_name.starts_with('.') {
            return true;
        }

        if self.filenames.contains(file_name) {
            return true;
        }

        if let Some(ext) = file_category::extension_of(file_name)
            && self.extensions.contains(&ext)
        {
            return true;
        }

        if self.patterns.iter().any(|p| p.matches(file_name)) {
            return true;
        }

        self.regexes.iter().any(|r| r.is_match(file_name))
    }
}

/// On-disk structured shape.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StructuredConfig {
    categories: IndexMap<String, Vec<String>>,
    #[serde(default)]
    ignore: IgnoreRules,
}

type Parsed = (IndexMap<String, Vec<String>>, IgnoreRules);

/// A document is structured when `categories` holds a table; flat category
/// values are always lists, so the two shapes never overlap.
fn parse_json(content: &str) -> Result<Parsed, String> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;

    if value.get("categories").is_some_and(serde_json::Value::is_object) {
        let config: StructuredConfig =
            serde_json::from_value(value).map_err(|e| format!("structured config: {}", e))?;
        Ok((config.categories, config.ignore))
    } else {
        let categories = serde_json::from_value(value)
            .map_err(|e| format!("expected category names mapped to extension lists: {}", e))?;
        Ok((categories, IgnoreRules::default()))
    }
}

fn parse_toml(content: &str) -> Result<Parsed, String> {
    let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;

    if table.get("categories").is_some_and(toml::Value::is_table) {
        let config: StructuredConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|e| format!("structured config: {}", e))?;
        Ok((config.categories, config.ignore))
    } else {
        let categories = toml::Value::Table(table)
            .try_into()
            .map_err(|e| format!("expected category names mapped to extension lists: {}", e))?;
        Ok((categories, IgnoreRules::default()))
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Loading failed and the empty table is in use.
    Fallback,
}

/// Complete sorter configuration: category table plus ignore rules.
#[derive(Debug, Clone, Default)]
pub struct SorterConfig {
    pub table: CategoryTable,
    pub ignore: IgnoreMatcher,
}

impl SorterConfig {
    /// Configuration with the given table and no ignore rules.
    pub fn with_table(table: CategoryTable) -> Self {
        Self {
            table,
            ignore: IgnoreMatcher::default(),
        }
    }

    /// The built-in category table, used only when asked for explicitly.
    pub fn builtin() -> Self {
        Self::with_table(file_category::builtin_table())
    }

    /// Loads configuration from a specific file.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist,
    /// `ConfigError::Io` if it cannot be read, `ConfigError::Invalid` if it
    /// does not parse, and a pattern error if an ignore rule is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            parse_json(&content)
        } else {
            parse_toml(&content)
        };
        let (categories, ignore) = parsed.map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;

        let config = Self {
            table: CategoryTable::from_entries(categories),
            ignore: ignore.compile()?,
        };
        debug!(path = %path.display(), categories = config.table.len(), "loaded configuration");
        Ok(config)
    }

    /// Finds and loads configuration.
    ///
    /// Lookup order:
    /// 1. `explicit`, if provided
    /// 2. `.tidywatch.toml` / `.tidywatch.json` in the current directory
    /// 3. `config.json` next to the executable
    /// 4. `~/.config/tidywatch/config.toml`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoneFound` if no file exists at any of these
    /// locations, or the load error of the file that was found.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        match explicit {
            Some(path) => {
                let config = Self::load(path)?;
                Ok((config, ConfigSource::File(path.to_path_buf())))
            }
            None => Self::discover_in(&Self::search_paths()),
        }
    }

    fn discover_in(candidates: &[PathBuf]) -> Result<(Self, ConfigSource), ConfigError> {
        let Some(path) = candidates.iter().find(|p| p.is_file()) else {
            return Err(ConfigError::NoneFound {
                searched: candidates.to_vec(),
            });
        };
        let config = Self::load(path)?;
        Ok((config, ConfigSource::File(path.clone())))
    }

    /// Like [`SorterConfig::discover`], but never fails: a missing or broken
    /// configuration degrades to the empty table, so every file goes to the
    /// fallback category. The error is handed back for the caller to report.
    pub fn load_or_fallback(explicit: Option<&Path>) -> (Self, ConfigSource, Option<ConfigError>) {
        Self::or_fallback(Self::discover(explicit))
    }

    fn or_fallback(
        discovered: Result<(Self, ConfigSource), ConfigError>,
    ) -> (Self, ConfigSource, Option<ConfigError>) {
        match discovered {
            Ok((config, source)) => (config, source, None),
            Err(e) => {
                warn!(error = %e, "configuration unusable, every file will go to the fallback category");
                (Self::default(), ConfigSource::Fallback, Some(e))
            }
        }
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = LOCAL_CONFIG_NAMES.iter().map(PathBuf::from).collect();

        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            paths.push(dir.join("config.json"));
        }

        if let Ok(home) = std::env::var("HOME") {
            paths.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("tidywatch")
                    .join("config.toml"),
            );
        }

        paths
    }
}
