//! Placeholder expansion over a book's text.
//!
//! Token substitution itself belongs to the host (see [`TextTransform`]);
//! this module only walks the title, author and pages and fills in the NPC
//! tokens when the book is opened through an NPC.

use crate::domain::Book;

/// Host-provided text substitution for a user
pub trait TextTransform {
    fn transform(&self, user: &str, text: &str) -> String;
}

/// The NPC a book was opened from
#[derive(Debug, Clone, PartialEq)]
pub struct NpcContext {
    pub name: String,
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub world: String,
}

impl NpcContext {
    fn replace_tokens(&self, text: &str) -> String {
        text.replace("%npc_name%", &self.name)
            .replace("%npc_id%", &self.id.to_string())
            .replace("%npc_loc_x%", &self.x.to_string())
            .replace("%npc_loc_y%", &self.y.to_string())
            .replace("%npc_loc_z%", &self.z.to_string())
            .replace("%npc_loc_world%", &self.world)
    }
}

/// Run every text field of `book` through the transform and NPC tokens
pub fn apply(
    book: Book,
    user: &str,
    transform: &dyn TextTransform,
    npc: Option<&NpcContext>,
) -> Book {
    let expand = |text: &str| {
        let text = transform.transform(user, text);
        match npc {
            Some(npc) => npc.replace_tokens(&text),
            None => text,
        }
    };

    Book {
        title: book.title.as_deref().map(expand),
        author: book.author.as_deref().map(expand),
        pages: book.pages.iter().map(|page| expand(page)).collect(),
        ..book
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PlayerName;

    impl TextTransform for PlayerName {
        fn transform(&self, user: &str, text: &str) -> String {
            text.replace("%player_name%", user)
        }
    }

    fn npc() -> NpcContext {
        NpcContext {
            name: "Librarian".to_string(),
            id: 7,
            x: 10.5,
            y: 64.0,
            z: -3.25,
            world: "world".to_string(),
        }
    }

    #[test]
    fn test_transform_without_npc() {
        let book = Book::written(["Hi %player_name%", "%npc_name% stays"])
            .with_title("For %player_name%");

        let expanded = apply(book, "alice", &PlayerName, None);

        assert_eq!(expanded.title.as_deref(), Some("For alice"));
        assert_eq!(expanded.pages[0], "Hi alice");
        assert_eq!(expanded.pages[1], "%npc_name% stays");
        assert!(expanded.author.is_none());
    }

    #[test]
    fn test_npc_tokens() {
        let book = Book::written(["%npc_name% (#%npc_id%) at %npc_loc_x%,%npc_loc_y%,%npc_loc_z% in %npc_loc_world%"])
            .with_author("%npc_name%");

        let expanded = apply(book, "bob", &PlayerName, Some(&npc()));

        assert_eq!(expanded.author.as_deref(), Some("Librarian"));
        assert_eq!(expanded.pages[0], "Librarian (#7) at 10.5,64,-3.25 in world");
    }
}
