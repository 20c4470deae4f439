//! bookfilter - Named book templates for a game server host
//!
//! Keeps a directory of "filters": reusable written books stored one JSON
//! document per file and addressable by name.
//!
//! # Architecture
//!
//! - The host's item format changed between releases, so books are
//!   translated through a codec chosen once at startup from the host
//!   version
//! - The registry is rebuilt from disk on reload; one bad file never
//!   aborts a scan
//! - Permission checks consult an optional backend and fall back to the
//!   host's own check
//!
//! # Modules
//!
//! - `adapters`: Version-specific book codecs and their selection
//! - `core`: Registry, permissions, placeholders and the Plugin context
//! - `domain`: Data structures (Book, FilterEntry, StorageDocument)
//! - `config`: Configuration discovery and bootstrap
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Store a book as a filter
//! bookfilter create welcome --input welcome.json
//!
//! # List and inspect filters
//! bookfilter list
//! bookfilter show welcome
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{AdapterLoadError, BookCodec, BookHost, CodecError};
pub use crate::core::{Caller, FilterError, FilterRegistry, PermissionResolver, Plugin, ReloadSummary};
pub use domain::{Book, BookKind, FilterEntry};
