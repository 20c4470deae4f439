//! File-backed registry of named book templates.
//!
//! Every filter lives in its own `<name>.json` document inside the filters
//! directory. The in-memory map is rebuilt from disk by [`FilterRegistry::reload`]
//! and kept in step by `create`/`remove`.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::adapters::{BookCodec, CodecError};
use crate::domain::{
    file_name_for, is_valid_name, Book, FilterEntry, StorageDocument, FILTER_FILE_EXTENSION,
};

const INTEGRATION_HINT: &str = "This is not an error with bookfilter, \
    make sure the code integrating with it is configured correctly.";

/// Errors surfaced by filter operations
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid filter name '{0}': only letters, digits, '_' and '-' are allowed. {hint}", hint = INTEGRATION_HINT)]
    InvalidName(String),

    #[error("The book is a {0}, not a written book. {hint}", hint = INTEGRATION_HINT)]
    NotTemplate(String),

    #[error("Unsupported book metadata: {0}. {hint}", hint = INTEGRATION_HINT)]
    InvalidMeta(String),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Failed to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Filters are disabled: no codec is loaded for this host version")]
    Disabled,
}

/// Outcome of a full rescan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Filters now in the registry
    pub loaded: usize,

    /// `.json` files that could not be loaded
    pub skipped: usize,
}

/// Name → filter map backed by a directory of documents
pub struct FilterRegistry {
    directory: PathBuf,
    codec: Arc<dyn BookCodec>,
    filters: HashMap<String, FilterEntry>,
}

impl FilterRegistry {
    /// Create an empty registry; call [`reload`](Self::reload) to populate it
    pub fn new(directory: impl Into<PathBuf>, codec: Arc<dyn BookCodec>) -> Self {
        Self {
            directory: directory.into(),
            codec,
            filters: HashMap::new(),
        }
    }

    /// The filters directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The active codec
    pub fn codec(&self) -> &Arc<dyn BookCodec> {
        &self.codec
    }

    /// Rebuild the registry from disk.
    ///
    /// Files are visited in lexicographic path order, so when two documents
    /// declare the same `filter_name` the later one wins on every platform.
    #[instrument(skip(self), fields(directory = %self.directory.display()))]
    pub fn reload(&mut self) -> ReloadSummary {
        info!("Loading filters...");
        self.filters.clear();

        if let Err(e) = fs::create_dir_all(&self.directory) {
            warn!("Failed to create filters directory: {}", e);
        }

        let mut summary = ReloadSummary::default();
        let walker = WalkDir::new(&self.directory)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to scan filters directory: {}", e);
                    // An unreadable root means nothing was found
                    if e.depth() == 0 {
                        self.filters.clear();
                        summary = ReloadSummary::default();
                        break;
                    }
                    continue;
                }
            };

            if !entry.file_type().is_file() || !has_json_extension(entry.path()) {
                continue;
            }

            match self.load_file(entry.path()) {
                Ok(filter) => {
                    if let Some(previous) = self.filters.get(&filter.name) {
                        warn!(
                            "Filter '{}' from {} replaces the one from {}",
                            filter.name,
                            entry.path().display(),
                            previous.source_path.display()
                        );
                    }
                    self.filters.insert(filter.name.clone(), filter);
                }
                Err(reason) => {
                    warn!("Failed to load {}: {}", entry.path().display(), reason);
                    summary.skipped += 1;
                }
            }
        }

        summary.loaded = self.filters.len();
        if summary.loaded == 0 {
            info!("No filter was loaded!");
        } else {
            info!("Loaded {} filters!", summary.loaded);
        }
        summary
    }

    /// Read and decode one document
    fn load_file(&self, path: &Path) -> Result<FilterEntry, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let document: Value = serde_json::from_str(&content).map_err(|e| e.to_string())?;

        let name = match document.get("filter_name") {
            Some(Value::String(name)) => name,
            _ => return Err("it doesn't have a filter name".to_string()),
        };
        if !is_valid_name(name) {
            return Err(format!("'{}' is not a valid filter name", name));
        }

        let book_content = document
            .get("book_content")
            .filter(|v| v.is_object())
            .ok_or_else(|| "it doesn't have a book_content object".to_string())?;
        let book = self
            .codec
            .decode(book_content)
            .map_err(|e| e.to_string())?;

        Ok(FilterEntry::new(name.clone(), book, path))
    }

    /// Whether a name may be used for a filter
    pub fn is_valid_name(name: &str) -> bool {
        is_valid_name(name)
    }

    /// The filter's book, or a blank written book if there is none
    pub fn get(&self, name: &str) -> Result<Book, FilterError> {
        validate_name(name)?;
        Ok(self
            .filters
            .get(name)
            .map(|entry| entry.book.clone())
            .unwrap_or_else(Book::empty))
    }

    /// Whether a filter with this name is loaded
    pub fn has(&self, name: &str) -> Result<bool, FilterError> {
        validate_name(name)?;
        Ok(self.filters.contains_key(name))
    }

    /// The full entry, including where it is stored
    pub fn entry(&self, name: &str) -> Option<&FilterEntry> {
        self.filters.get(name)
    }

    /// Store a book under `name`, replacing any existing filter
    pub fn create(&mut self, name: &str, mut book: Book) -> Result<(), FilterError> {
        validate_name(name)?;
        if !book.is_template() {
            return Err(FilterError::NotTemplate(book.kind.to_string()));
        }
        validate_meta(&book.meta, self.codec.reserved_keys())?;
        // Stored empty metadata reads back as null
        if book.meta.as_object().is_some_and(|m| m.is_empty()) {
            book.meta = Value::Null;
        }

        let document = StorageDocument {
            filter_name: name.to_string(),
            book_content: self.codec.encode(&book),
        };
        let path = self.directory.join(file_name_for(name));
        write_document(&self.directory, &path, &document)?;

        debug!(filter = name, path = %path.display(), "Filter saved");
        self.filters
            .insert(name.to_string(), FilterEntry::new(name, book, path));
        Ok(())
    }

    /// Forget a filter and delete its file if it is still there
    pub fn remove(&mut self, name: &str) {
        if let Some(entry) = self.filters.remove(name) {
            if let Err(e) = fs::remove_file(&entry.source_path) {
                debug!(
                    filter = name,
                    "Could not delete {}: {}",
                    entry.source_path.display(),
                    e
                );
            }
        }
    }

    /// Snapshot of loaded filter names
    pub fn list(&self) -> BTreeSet<String> {
        self.filters.keys().cloned().collect()
    }

    /// Number of loaded filters
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if no filters are loaded
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

fn validate_name(name: &str) -> Result<(), FilterError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(FilterError::InvalidName(name.to_string()))
    }
}

/// Opaque metadata must be null or an object that stays clear of codec fields
fn validate_meta(meta: &Value, reserved: &[&str]) -> Result<(), FilterError> {
    match meta {
        Value::Null => Ok(()),
        Value::Object(map) => match map.keys().find(|k| reserved.contains(&k.as_str())) {
            Some(key) => Err(FilterError::InvalidMeta(format!(
                "'{}' is a reserved key",
                key
            ))),
            None => Ok(()),
        },
        _ => Err(FilterError::InvalidMeta(
            "it must be an object or null".to_string(),
        )),
    }
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(FILTER_FILE_EXTENSION))
}

/// Write through a temp file so a failed write never clobbers the old document
fn write_document(
    directory: &Path,
    path: &Path,
    document: &StorageDocument,
) -> Result<(), FilterError> {
    let persistence = |source: std::io::Error| FilterError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(directory).map_err(persistence)?;
    let json = serde_json::to_string_pretty(document).map_err(|e| persistence(e.into()))?;

    let mut file = NamedTempFile::new_in(directory).map_err(persistence)?;
    file.write_all(json.as_bytes()).map_err(persistence)?;
    file.flush().map_err(persistence)?;
    file.persist(path).map_err(|e| persistence(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LegacyCodec;
    use serde_json::json;
    use tempfile::TempDir;

    fn registry(dir: &Path) -> FilterRegistry {
        FilterRegistry::new(dir.join("filters"), Arc::new(LegacyCodec::new("v1_12_R1")))
    }

    #[test]
    fn test_get_missing_returns_blank_book() {
        let temp = TempDir::new().unwrap();
        let registry = registry(temp.path());

        assert_eq!(registry.get("nothing").unwrap(), Book::empty());
        assert!(!registry.has("nothing").unwrap());
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry(temp.path());

        assert!(matches!(registry.get(""), Err(FilterError::InvalidName(_))));
        assert!(matches!(registry.has("a b"), Err(FilterError::InvalidName(_))));
        assert!(matches!(
            registry.create("../up", Book::empty()),
            Err(FilterError::InvalidName(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_writes_document() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry(temp.path());
        let book = Book::written(["Hello"]).with_title("Welcome");

        registry.create("welcome", book.clone()).unwrap();

        let path = registry.directory().join("welcome.json");
        let stored: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored["filter_name"], "welcome");
        assert_eq!(stored["book_content"]["meta"]["title"], "Welcome");

        assert_eq!(registry.get("welcome").unwrap(), book);
        assert_eq!(registry.entry("welcome").unwrap().source_path, path);
    }

    #[test]
    fn test_create_rejects_non_template() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry(temp.path());
        let quill = Book::written(["draft"]).with_kind(crate::domain::BookKind::WritableBook);

        let result = registry.create("draft", quill);
        assert!(matches!(result, Err(FilterError::NotTemplate(kind)) if kind == "writable_book"));
        assert!(!registry.directory().join("draft.json").exists());
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry(temp.path());
        let original = Book::written(["v1"]);
        registry.create("notice", original.clone()).unwrap();

        // A directory squatting on the target path makes the rename fail
        let path = registry.directory().join("notice.json");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let result = registry.create("notice", Book::written(["v2"]));
        assert!(matches!(result, Err(FilterError::Persistence { .. })));
        assert_eq!(registry.get("notice").unwrap(), original);
    }

    #[test]
    fn test_remove_tolerates_missing_file() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry(temp.path());
        registry.create("gone", Book::written(["x"])).unwrap();
        fs::remove_file(registry.directory().join("gone.json")).unwrap();

        registry.remove("gone");
        assert!(!registry.has("gone").unwrap());

        // Removing an unknown filter is a no-op
        registry.remove("never-existed");
    }

    #[test]
    fn test_reload_skips_bad_documents() {
        let temp = TempDir::new().unwrap();
        let mut registry = registry(temp.path());
        let dir = registry.directory().to_path_buf();
        fs::create_dir_all(&dir).unwrap();

        let good = json!({
            "filter_name": "good",
            "book_content": {"type": "WRITTEN_BOOK", "meta": {"pages": ["ok"]}}
        });
        fs::write(dir.join("good.json"), good.to_string()).unwrap();
        fs::write(dir.join("broken.json"), "{ not json").unwrap();
        fs::write(
            dir.join("wrong_codec.json"),
            json!({"filter_name": "modern", "book_content": {"id": "minecraft:written_book"}})
                .to_string(),
        )
        .unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let summary = registry.reload();
        assert_eq!(summary, ReloadSummary { loaded: 1, skipped: 2 });
        assert_eq!(registry.get("good").unwrap().pages, vec!["ok".to_string()]);
    }

    #[test]
    fn test_has_json_extension() {
        assert!(has_json_extension(Path::new("a.json")));
        assert!(has_json_extension(Path::new("a.JSON")));
        assert!(!has_json_extension(Path::new("a.json.bak")));
        assert!(!has_json_extension(Path::new("json")));
        // Whatever `create` writes, `reload` picks up
        assert!(has_json_extension(Path::new(&file_name_for("welcome"))));
    }

    #[test]
    fn test_validate_meta() {
        let reserved = &["title", "pages"];

        assert!(validate_meta(&Value::Null, reserved).is_ok());
        assert!(validate_meta(&json!({"generation": 1}), reserved).is_ok());
        assert!(matches!(
            validate_meta(&json!({"pages": []}), reserved),
            Err(FilterError::InvalidMeta(_))
        ));
        assert!(matches!(
            validate_meta(&json!([1, 2]), reserved),
            Err(FilterError::InvalidMeta(_))
        ));
    }
}
