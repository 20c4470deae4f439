//! Filter entries and their on-disk document form.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::book::Book;

/// Allowed filter name characters
pub const FILTER_NAME_PATTERN: &str = "^[A-Za-z0-9_-]+$";

/// File suffix of stored filter documents
pub const FILTER_FILE_EXTENSION: &str = "json";

static NAME_REGEX: OnceLock<Regex> = OnceLock::new();

/// Check a filter name against [`FILTER_NAME_PATTERN`]
pub fn is_valid_name(name: &str) -> bool {
    let regex = NAME_REGEX
        .get_or_init(|| Regex::new(FILTER_NAME_PATTERN).expect("filter name pattern is valid"));
    !name.is_empty() && regex.is_match(name)
}

/// File name a filter is stored under
pub fn file_name_for(name: &str) -> String {
    format!("{}.{}", name, FILTER_FILE_EXTENSION)
}

/// A loaded filter
#[derive(Debug, Clone)]
pub struct FilterEntry {
    /// Filter name (registry key)
    pub name: String,

    /// The template book
    pub book: Book,

    /// File the entry was read from or written to
    pub source_path: PathBuf,
}

impl FilterEntry {
    pub fn new(name: impl Into<String>, book: Book, source_path: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            book,
            source_path: source_path.as_ref().to_path_buf(),
        }
    }
}

/// One filter file on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageDocument {
    pub filter_name: String,

    /// Codec-specific encoding of the book
    pub book_content: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("welcome"));
        assert!(is_valid_name("Rules_2"));
        assert!(is_valid_name("spawn-guide"));
        assert!(is_valid_name("_"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("two words"));
        assert!(!is_valid_name("../escape"));
        assert!(!is_valid_name("dir/name"));
        assert!(!is_valid_name("dir\\name"));
        assert!(!is_valid_name("name.json"));
        assert!(!is_valid_name("trailing\n"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name_for("welcome"), "welcome.json");
    }
}
