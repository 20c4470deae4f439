//! The abstract book value managed by the registry.
//!
//! A book only becomes a filter template when it is a written (signed)
//! book; other item kinds are carried so callers can be told precisely
//! what they handed in.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Item kind tag of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookKind {
    /// Signed book, the only kind usable as a template
    WrittenBook,

    /// Book and quill (still editable)
    WritableBook,

    /// Any other item id
    #[serde(untagged)]
    Other(String),
}

impl Default for BookKind {
    fn default() -> Self {
        BookKind::WrittenBook
    }
}

impl std::fmt::Display for BookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookKind::WrittenBook => write!(f, "written_book"),
            BookKind::WritableBook => write!(f, "writable_book"),
            BookKind::Other(id) => write!(f, "{}", id),
        }
    }
}

/// A rich-text book
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Book {
    /// Item kind
    #[serde(default)]
    pub kind: BookKind,

    /// Title shown on the cover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Author line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Page texts in reading order
    #[serde(default)]
    pub pages: Vec<String>,

    /// Version-specific extras, owned by the active codec
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

impl Book {
    /// The blank template returned when a filter does not exist
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a written book with the given pages
    pub fn written(pages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the item kind
    pub fn with_kind(mut self, kind: BookKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether this book can be stored as a filter
    pub fn is_template(&self) -> bool {
        self.kind == BookKind::WrittenBook
    }
}
