//! Permission checks across optional authorization backends.
//!
//! Resolution order for [`PermissionResolver::check`]:
//! 1. Operators are always allowed
//! 2. A contextual backend, if configured, may grant the node
//! 3. Otherwise a basic backend, if configured, may grant the node
//! 4. The caller's own permission flag decides the rest
//!
//! A backend that errors counts as a "no" for its step and never aborts the
//! check.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Whoever is asking for a permission
pub trait Caller {
    /// Name used to look the caller up in backends
    fn name(&self) -> &str;

    /// Unrestricted operator status
    fn is_operator(&self) -> bool;

    /// The host platform's own permission check
    fn has_native_permission(&self, permission: &str) -> bool;
}

/// Failure while consulting a backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PermissionBackendError {
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Permission backend unavailable: {0}")]
    Unavailable(String),
}

/// Three-valued permission lookup result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tristate {
    True,
    False,
    Undefined,
}

impl Tristate {
    pub fn as_bool(self) -> bool {
        self == Tristate::True
    }
}

/// A caller's resolved permission nodes in their current context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSnapshot {
    nodes: HashMap<String, bool>,
}

impl PermissionSnapshot {
    pub fn new(nodes: HashMap<String, bool>) -> Self {
        Self { nodes }
    }

    /// Look up a node, falling back to the nearest wildcard parent
    /// (`a.b.c` → `a.b.*` → `a.*` → `*`).
    pub fn check(&self, permission: &str) -> Tristate {
        if let Some(&value) = self.nodes.get(permission) {
            return Tristate::from(value);
        }

        let mut prefix = permission;
        while let Some(idx) = prefix.rfind('.') {
            prefix = &prefix[..idx];
            if let Some(&value) = self.nodes.get(&format!("{}.*", prefix)) {
                return Tristate::from(value);
            }
        }

        self.nodes
            .get("*")
            .map(|&value| Tristate::from(value))
            .unwrap_or(Tristate::Undefined)
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::True
        } else {
            Tristate::False
        }
    }
}

/// Backend that resolves a per-user, context-aware permission state
pub trait ContextualBackend: Send + Sync {
    fn name(&self) -> &str;

    fn resolve(&self, user: &str) -> Result<PermissionSnapshot, PermissionBackendError>;
}

/// Backend that answers yes/no for a user and node
pub trait BasicBackend: Send + Sync {
    fn name(&self) -> &str;

    fn has(&self, user: &str, permission: &str) -> Result<bool, PermissionBackendError>;
}

/// The optional backend slot
#[derive(Clone, Default)]
pub enum Backend {
    #[default]
    None,
    Contextual(Arc<dyn ContextualBackend>),
    Basic(Arc<dyn BasicBackend>),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::None => write!(f, "None"),
            Backend::Contextual(b) => write!(f, "Contextual({})", b.name()),
            Backend::Basic(b) => write!(f, "Basic({})", b.name()),
        }
    }
}

/// Result of one step in the resolution chain
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Granted,
    Denied,
    Failed(PermissionBackendError),
    Absent,
}

impl StepOutcome {
    fn from_result(result: Result<bool, PermissionBackendError>) -> Self {
        match result {
            Ok(true) => StepOutcome::Granted,
            Ok(false) => StepOutcome::Denied,
            Err(e) => StepOutcome::Failed(e),
        }
    }
}

/// Resolves permission checks for callers
#[derive(Debug, Clone, Default)]
pub struct PermissionResolver {
    backend: Backend,
}

impl PermissionResolver {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Resolver that only knows operator status and native permissions
    pub fn native_only() -> Self {
        Self::default()
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Outcome of the configured backend for this caller
    pub fn backend_outcome(&self, caller: &dyn Caller, permission: &str) -> StepOutcome {
        match &self.backend {
            Backend::None => StepOutcome::Absent,
            Backend::Contextual(backend) => StepOutcome::from_result(
                backend
                    .resolve(caller.name())
                    .map(|snapshot| snapshot.check(permission).as_bool()),
            ),
            Backend::Basic(backend) => {
                StepOutcome::from_result(backend.has(caller.name(), permission))
            }
        }
    }

    /// Whether the caller holds `permission`
    pub fn check(&self, caller: &dyn Caller, permission: &str) -> bool {
        if caller.is_operator() {
            return true;
        }

        match self.backend_outcome(caller, permission) {
            StepOutcome::Granted => return true,
            StepOutcome::Failed(e) => {
                debug!(
                    user = caller.name(),
                    permission,
                    backend = ?self.backend,
                    "Permission backend failed, treating as denied: {}",
                    e
                );
            }
            StepOutcome::Denied | StepOutcome::Absent => {}
        }

        caller.has_native_permission(permission)
    }
}

/// Per-user permission nodes, usable in either backend slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantTable {
    users: HashMap<String, PermissionSnapshot>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a node for a user
    pub fn with_grant(mut self, user: impl Into<String>, node: impl Into<String>, value: bool) -> Self {
        self.users
            .entry(user.into())
            .or_default()
            .nodes
            .insert(node.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl ContextualBackend for GrantTable {
    fn name(&self) -> &str {
        "grants"
    }

    fn resolve(&self, user: &str) -> Result<PermissionSnapshot, PermissionBackendError> {
        self.users
            .get(user)
            .cloned()
            .ok_or_else(|| PermissionBackendError::UnknownUser(user.to_string()))
    }
}

impl BasicBackend for GrantTable {
    fn name(&self) -> &str {
        "grants"
    }

    fn has(&self, user: &str, permission: &str) -> Result<bool, PermissionBackendError> {
        Ok(self
            .users
            .get(user)
            .map(|snapshot| snapshot.check(permission).as_bool())
            .unwrap_or(false))
    }
}

/// A caller described by plain values
#[derive(Debug, Clone, Default)]
pub struct StaticCaller {
    pub name: String,
    pub operator: bool,
    pub native: HashSet<String>,
}

impl StaticCaller {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn operator(mut self, operator: bool) -> Self {
        self.operator = operator;
        self
    }

    pub fn with_native(mut self, permission: impl Into<String>) -> Self {
        self.native.insert(permission.into());
        self
    }
}

impl Caller for StaticCaller {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_operator(&self) -> bool {
        self.operator
    }

    fn has_native_permission(&self, permission: &str) -> bool {
        self.native.contains(permission)
    }
}
