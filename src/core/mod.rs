//! Core filter logic.
//!
//! This module contains:
//! - FilterRegistry: Named book templates backed by a directory
//! - PermissionResolver: Operator bypass, optional backends, native fallback
//! - Placeholders: Text-transform hook over a book's text
//! - Plugin: Context object wiring codec selection to the above

pub mod permissions;
pub mod placeholders;
pub mod plugin;
pub mod registry;

// Re-export commonly used types
pub use permissions::{
    Backend, BasicBackend, Caller, ContextualBackend, GrantTable, PermissionBackendError,
    PermissionResolver, PermissionSnapshot, StaticCaller, StepOutcome, Tristate,
};
pub use placeholders::{NpcContext, TextTransform};
pub use plugin::Plugin;
pub use registry::{FilterError, FilterRegistry, ReloadSummary};
