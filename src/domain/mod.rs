//! Domain types for bookfilter.
//!
//! - Book: The abstract rich-text value
//! - FilterEntry / StorageDocument: Registry entries and their file form

pub mod book;
pub mod filter;

// Re-export commonly used types
pub use book::{Book, BookKind};
pub use filter::{
    file_name_for, is_valid_name, FilterEntry, StorageDocument, FILTER_FILE_EXTENSION,
    FILTER_NAME_PATTERN,
};
