//! Codec for hosts that serialize items Bukkit-style (up to 1.12).
//!
//! ```json
//! {
//!   "type": "WRITTEN_BOOK",
//!   "meta": {
//!     "meta-type": "BOOK_SIGNED",
//!     "title": "Rules",
//!     "author": "Server",
//!     "pages": ["First page", "Second page"]
//!   }
//! }
//! ```

use serde_json::{json, Map, Value};

use super::{collect_extras, extras_map, optional_string, BookCodec, CodecError};
use crate::domain::Book;

const ITEM_TYPE: &str = "WRITTEN_BOOK";
const META_TYPE: &str = "BOOK_SIGNED";
const KNOWN_META_KEYS: &[&str] = &["meta-type", "title", "author", "pages"];

/// Plain-string pages under a `meta` section
#[derive(Debug, Clone)]
pub struct LegacyCodec {
    version: &'static str,
}

impl LegacyCodec {
    pub fn new(version: &'static str) -> Self {
        Self { version }
    }
}

impl BookCodec for LegacyCodec {
    fn version(&self) -> &'static str {
        self.version
    }

    fn reserved_keys(&self) -> &'static [&'static str] {
        KNOWN_META_KEYS
    }

    fn decode(&self, content: &Value) -> Result<Book, CodecError> {
        let item = content.as_object().ok_or(CodecError::WrongShape {
            field: "book_content",
            expected: "an object",
        })?;

        let item_type = item
            .get("type")
            .ok_or(CodecError::MissingField("type"))?
            .as_str()
            .ok_or(CodecError::WrongShape {
                field: "type",
                expected: "a string",
            })?;
        if item_type != ITEM_TYPE {
            return Err(CodecError::NotTemplate(item_type.to_string()));
        }

        // A written book without meta is a blank one
        let empty = Map::new();
        let meta = match item.get("meta") {
            None => &empty,
            Some(value) => value.as_object().ok_or(CodecError::WrongShape {
                field: "meta",
                expected: "an object",
            })?,
        };

        let pages = match meta.get("pages") {
            None => Vec::new(),
            Some(Value::Array(pages)) => pages
                .iter()
                .map(|page| {
                    page.as_str().map(str::to_string).ok_or(CodecError::WrongShape {
                        field: "pages",
                        expected: "an array of strings",
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(CodecError::WrongShape {
                    field: "pages",
                    expected: "an array of strings",
                })
            }
        };

        Ok(Book {
            title: optional_string(meta, "title")?,
            author: optional_string(meta, "author")?,
            pages,
            meta: collect_extras(meta, KNOWN_META_KEYS),
            ..Book::empty()
        })
    }

    fn encode(&self, book: &Book) -> Value {
        let mut meta = extras_map(book);
        meta.insert("meta-type".to_string(), json!(META_TYPE));
        if let Some(title) = &book.title {
            meta.insert("title".to_string(), json!(title));
        }
        if let Some(author) = &book.author {
            meta.insert("author".to_string(), json!(author));
        }
        meta.insert("pages".to_string(), json!(book.pages));

        json!({
            "type": ITEM_TYPE,
            "meta": meta,
        })
    }
}
