//! Codec for hosts with namespaced item ids and text-component pages (1.13+).
//!
//! ```json
//! {
//!   "id": "minecraft:written_book",
//!   "tag": {
//!     "title": "Rules",
//!     "author": "Server",
//!     "pages": [{"text": "First page"}, {"text": "Second page"}],
//!     "generation": 0
//!   }
//! }
//! ```

use serde_json::{json, Map, Value};

use super::{collect_extras, extras_map, optional_string, BookCodec, CodecError};
use crate::domain::Book;

const ITEM_ID: &str = "minecraft:written_book";
const KNOWN_TAG_KEYS: &[&str] = &["title", "author", "pages"];

/// Text-component pages under a `tag` compound
#[derive(Debug, Clone)]
pub struct ComponentCodec {
    version: &'static str,
}

impl ComponentCodec {
    pub fn new(version: &'static str) -> Self {
        Self { version }
    }
}

/// Page text out of a stored component.
///
/// Rich components with formatting are kept as their JSON text.
fn page_text(page: &Value) -> Result<String, CodecError> {
    match page {
        Value::String(text) => Ok(text.clone()),
        Value::Object(component) => match component.get("text") {
            Some(Value::String(text)) if component.len() == 1 => Ok(text.clone()),
            _ => Ok(page.to_string()),
        },
        _ => Err(CodecError::WrongShape {
            field: "pages",
            expected: "an array of text components",
        }),
    }
}

impl BookCodec for ComponentCodec {
    fn version(&self) -> &'static str {
        self.version
    }

    fn reserved_keys(&self) -> &'static [&'static str] {
        KNOWN_TAG_KEYS
    }

    fn decode(&self, content: &Value) -> Result<Book, CodecError> {
        let item = content.as_object().ok_or(CodecError::WrongShape {
            field: "book_content",
            expected: "an object",
        })?;

        let id = item
            .get("id")
            .ok_or(CodecError::MissingField("id"))?
            .as_str()
            .ok_or(CodecError::WrongShape {
                field: "id",
                expected: "a string",
            })?;
        if id != ITEM_ID {
            return Err(CodecError::NotTemplate(id.to_string()));
        }

        let empty = Map::new();
        let tag = match item.get("tag") {
            None => &empty,
            Some(value) => value.as_object().ok_or(CodecError::WrongShape {
                field: "tag",
                expected: "an object",
            })?,
        };

        let pages = match tag.get("pages") {
            None => Vec::new(),
            Some(Value::Array(pages)) => pages.iter().map(page_text).collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(CodecError::WrongShape {
                    field: "pages",
                    expected: "an array of text components",
                })
            }
        };

        Ok(Book {
            title: optional_string(tag, "title")?,
            author: optional_string(tag, "author")?,
            pages,
            meta: collect_extras(tag, KNOWN_TAG_KEYS),
            ..Book::empty()
        })
    }

    fn encode(&self, book: &Book) -> Value {
        let mut tag = extras_map(book);
        if let Some(title) = &book.title {
            tag.insert("title".to_string(), json!(title));
        }
        if let Some(author) = &book.author {
            tag.insert("author".to_string(), json!(author));
        }
        let pages: Vec<Value> = book.pages.iter().map(|p| json!({ "text": p })).collect();
        tag.insert("pages".to_string(), Value::Array(pages));

        json!({
            "id": ITEM_ID,
            "tag": tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> ComponentCodec {
        ComponentCodec::new("v1_16_R3")
    }

    #[test]
    fn test_encode_wraps_pages() {
        let encoded = codec().encode(&Book::written(["Hi", "{\"text\":\"x\"}"]));

        assert_eq!(encoded["id"], "minecraft:written_book");
        assert_eq!(
            encoded["tag"]["pages"],
            json!([{"text": "Hi"}, {"text": "{\"text\":\"x\"}"}])
        );
    }

    #[test]
    fn test_round_trip() {
        let mut book = Book::written(["one", "", "three"])
            .with_title("Quest")
            .with_author("Guide");
        book.meta = json!({"generation": 2, "resolved": true});

        let decoded = codec().decode(&codec().encode(&book)).unwrap();
        assert_eq!(decoded, book);
    }

    #[test]
    fn test_decode_mixed_pages() {
        let content = json!({
            "id": "minecraft:written_book",
            "tag": {
                "pages": [
                    "bare string",
                    {"text": "plain"},
                    {"text": "bold", "bold": true}
                ]
            }
        });

        let book = codec().decode(&content).unwrap();
        assert_eq!(book.pages[0], "bare string");
        assert_eq!(book.pages[1], "plain");
        let rich: Value = serde_json::from_str(&book.pages[2]).unwrap();
        assert_eq!(rich, json!({"text": "bold", "bold": true}));
    }

    #[test]
    fn test_decode_rejects_legacy_documents() {
        let legacy = json!({"type": "WRITTEN_BOOK", "meta": {"pages": []}});
        assert_eq!(codec().decode(&legacy), Err(CodecError::MissingField("id")));

        let quill = json!({"id": "minecraft:writable_book"});
        assert_eq!(
            codec().decode(&quill),
            Err(CodecError::NotTemplate("minecraft:writable_book".to_string()))
        );
    }

    #[test]
    fn test_decode_bad_page() {
        let content = json!({"id": "minecraft:written_book", "tag": {"pages": [42]}});
        assert!(matches!(
            codec().decode(&content),
            Err(CodecError::WrongShape { field: "pages", .. })
        ));
    }
}
