//! Version-specific book codecs.
//!
//! The host platform changed its item serialization between releases, so
//! the mapping between [`Book`] and the `book_content` payload of a filter
//! file lives behind the [`BookCodec`] trait. Exactly one codec is chosen
//! at startup by [`selector::select`].

pub mod component;
pub mod legacy;
pub mod selector;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::domain::Book;

// Re-export the codec families and selection
pub use component::ComponentCodec;
pub use legacy::LegacyCodec;
pub use selector::{canonical_version, select, supported_versions, AdapterLoadError};

/// Errors raised while decoding a stored book
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Field '{field}' must be {expected}")]
    WrongShape {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Item '{0}' is not a written book")]
    NotTemplate(String),
}

/// Host-side action of showing a book to a user.
///
/// Implemented by the embedding application; the payload is whatever the
/// active codec encodes.
pub trait BookHost {
    fn open_book(&self, user: &str, payload: &Value) -> anyhow::Result<()>;
}

/// Bidirectional mapping between a [`Book`] and its stored form
pub trait BookCodec: Send + Sync {
    /// Host version identifier this codec was registered under
    fn version(&self) -> &'static str;

    /// Decode a `book_content` payload
    fn decode(&self, content: &Value) -> Result<Book, CodecError>;

    /// Encode a book into a `book_content` payload
    fn encode(&self, book: &Book) -> Value;

    /// Keys the codec writes next to the book's opaque metadata.
    ///
    /// `Book.meta` must not use them, or they would come back as real fields.
    fn reserved_keys(&self) -> &'static [&'static str];

    /// Hand a book to the host for display. Host failures are logged only.
    fn deliver(&self, host: &dyn BookHost, user: &str, book: &Book) {
        let payload = self.encode(book);
        if let Err(e) = host.open_book(user, &payload) {
            warn!(user, codec = self.version(), "Failed to open book: {:#}", e);
        }
    }
}

fn optional_string(
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, CodecError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CodecError::WrongShape {
            field,
            expected: "a string",
        }),
    }
}

/// Collect every key not in `known` into an opaque metadata value
fn collect_extras(map: &Map<String, Value>, known: &[&str]) -> Value {
    let extras: Map<String, Value> = map
        .iter()
        .filter(|(k, _)| !known.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if extras.is_empty() {
        Value::Null
    } else {
        Value::Object(extras)
    }
}

/// Start an encoded map from the book's opaque metadata.
///
/// Non-object metadata has no place in either document shape and is dropped;
/// the registry refuses to store such books.
fn extras_map(book: &Book) -> Map<String, Value> {
    match &book.meta {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    struct RecordingHost {
        opened: RefCell<Vec<(String, Value)>>,
        fail: bool,
    }

    impl BookHost for RecordingHost {
        fn open_book(&self, user: &str, payload: &Value) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("player went offline");
            }
            self.opened
                .borrow_mut()
                .push((user.to_string(), payload.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_collect_extras() {
        let map = json!({"title": "t", "generation": 1, "resolved": true});
        let extras = collect_extras(map.as_object().unwrap(), &["title"]);
        assert_eq!(extras, json!({"generation": 1, "resolved": true}));

        let extras = collect_extras(map.as_object().unwrap(), &["title", "generation", "resolved"]);
        assert!(extras.is_null());
    }

    #[test]
    fn test_deliver_sends_encoded_payload() {
        let codec = LegacyCodec::new("v1_12_R1");
        let host = RecordingHost {
            opened: RefCell::new(Vec::new()),
            fail: false,
        };
        let book = Book::written(["Welcome!"]);

        codec.deliver(&host, "alice", &book);

        let opened = host.opened.borrow();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].0, "alice");
        assert_eq!(opened[0].1, codec.encode(&book));
    }

    #[test]
    fn test_deliver_swallows_host_failure() {
        let codec = ComponentCodec::new("v1_16_R3");
        let host = RecordingHost {
            opened: RefCell::new(Vec::new()),
            fail: true,
        };

        // Must not panic or propagate
        codec.deliver(&host, "bob", &Book::empty());
        assert!(host.opened.borrow().is_empty());
    }
}
