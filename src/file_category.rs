//! File classification by extension.
//!
//! This module maps a file name to the name of the category it belongs in,
//! using a [`CategoryTable`]. Anything the table does not claim goes to the
//! fallback category, [`FALLBACK_CATEGORY`].
//!
//! # Examples
//!
//! ```
//! use tidywatch::config::CategoryTable;
//! use tidywatch::file_category::classify;
//!
//! let table = CategoryTable::from_entries([("Images", [".jpg"]), ("Docs", [".txt"])]);
//! assert_eq!(classify("a.JPG", &table), "Images");
//! assert_eq!(classify("b.txt", &table), "Docs");
//! assert_eq!(classify("c.unknownext", &table), "Others");
//! ```

use crate::config::CategoryTable;
use std::path::Path;

/// Catch-all category for unrecognized or extensionless files.
pub const FALLBACK_CATEGORY: &str = "Others";

/// Returns the lowercased extension of a file name, including the leading dot.
///
/// Dotfiles such as `.bashrc` and names ending in a bare dot have no extension.
///
/// ```
/// use tidywatch::file_category::extension_of;
///
/// assert_eq!(extension_of("Report.PDF").as_deref(), Some(".pdf"));
/// assert_eq!(extension_of("archive.tar.gz").as_deref(), Some(".gz"));
/// assert_eq!(extension_of(".bashrc"), None);
/// assert_eq!(extension_of("Makefile"), None);
/// ```
pub fn extension_of(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_string_lossy();
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// Maps a file name to its category.
///
/// Returns the first category, in table order, whose extension set contains
/// the file's extension, or [`FALLBACK_CATEGORY`] if none does. Callers are
/// responsible for not passing directories.
pub fn classify<'a>(file_name: &str, table: &'a CategoryTable) -> &'a str {
    let Some(ext) = extension_of(file_name) else {
        return FALLBACK_CATEGORY;
    };

    table
        .iter()
        .find(|(_, extensions)| extensions.contains(&ext))
        .map(|(category, _)| category)
        .unwrap_or(FALLBACK_CATEGORY)
}

/// A general-purpose table for `--builtin`; never used implicitly.
pub fn builtin_table() -> CategoryTable {
    CategoryTable::from_entries([
        (
            "Images",
            vec![
                ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".tiff", ".ico", ".heic",
            ],
        ),
        (
            "Audio",
            vec![".mp3", ".wav", ".ogg", ".flac", ".aac", ".m4a", ".wma"],
        ),
        (
            "Videos",
            vec![".mp4", ".mkv", ".avi", ".mov", ".flv", ".wmv", ".webm", ".3gp"],
        ),
        (
            "Documents",
            vec![
                ".pdf", ".txt", ".doc", ".docx", ".html", ".htm", ".md", ".rtf", ".odt",
            ],
        ),
        (
            "Archives",
            vec![".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz"],
        ),
        (
            "Code",
            vec![
                ".py", ".java", ".c", ".cpp", ".h", ".hpp", ".js", ".ts", ".rs", ".go", ".sh",
                ".bash", ".json", ".xml", ".yaml", ".yml", ".toml",
            ],
        ),
        ("Spreadsheets", vec![".csv", ".xls", ".xlsx", ".ods"]),
        ("Presentations", vec![".ppt", ".pptx", ".odp"]),
        ("Fonts", vec![".ttf", ".otf", ".woff", ".woff2"]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> CategoryTable {
        CategoryTable::from_entries([("Images", vec![".jpg", ".png"]), ("Docs", vec![".txt"])])
    }

    #[test]
    fn test_classify_registered_extension() {
        let table = sample_table();
        assert_eq!(classify("a.jpg", &table), "Images");
        assert_eq!(classify("b.txt", &table), "Docs");
    }

    #[test]
    fn test_classify_case_insensitive() {
        let table = sample_table();
        assert_eq!(classify("PHOTO.PNG", &table), "Images");
        assert_eq!(classify("Notes.Txt", &table), "Docs");
    }

    #[test]
    fn test_classify_defaults_to_others() {
        let table = sample_table();
        assert_eq!(classify("c.unknownext", &table), FALLBACK_CATEGORY);
        assert_eq!(classify("README", &table), FALLBACK_CATEGORY);
        assert_eq!(classify(".gitignore", &table), FALLBACK_CATEGORY);
        assert_eq!(classify("trailing.", &table), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_classify_empty_table() {
        let table = CategoryTable::new();
        assert_eq!(classify("a.jpg", &table), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_first_match_wins() {
        let table = CategoryTable::from_entries([
            ("Screenshots", vec![".png"]),
            ("Images", vec![".png", ".jpg"]),
        ]);
        assert_eq!(classify("shot.png", &table), "Screenshots");
        assert_eq!(classify("photo.jpg", &table), "Images");
    }

    #[test]
    fn test_classify_uses_last_extension() {
        let table = CategoryTable::from_entries([("Archives", vec![".gz"])]);
        assert_eq!(classify("backup.tar.gz", &table), "Archives");
    }

    #[test]
    fn test_builtin_table() {
        let table = builtin_table();
        assert_eq!(classify("song.mp3", &table), "Audio");
        assert_eq!(classify("main.rs", &table), "Code");
        assert_eq!(classify("slides.pptx", &table), "Presentations");
        assert_eq!(classify("mystery.xyz", &table), FALLBACK_CATEGORY);
    }
}
