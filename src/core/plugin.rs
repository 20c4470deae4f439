//! The context object tying codec selection, the registry and permissions together.
//!
//! Built once at startup from a [`ResolvedConfig`]. Filter operations stay
//! disabled until [`Plugin::load_codec`] has found a codec for the host.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::adapters::{self, BookCodec, BookHost};
use crate::config::{PermissionBackendKind, ResolvedConfig};
use crate::domain::Book;

use super::permissions::{Backend, Caller, PermissionResolver};
use super::placeholders::{self, NpcContext, TextTransform};
use super::registry::{FilterError, FilterRegistry, ReloadSummary};

/// Running instance of the filter feature
pub struct Plugin {
    config: ResolvedConfig,
    permissions: PermissionResolver,
    filters: Option<FilterRegistry>,
}

impl Plugin {
    /// Create the plugin; the permission backend comes from configuration
    pub fn new(config: ResolvedConfig) -> Self {
        let grants = Arc::new(config.permissions.grants.clone());
        let backend = match config.permissions.backend {
            PermissionBackendKind::None => Backend::None,
            PermissionBackendKind::Basic => Backend::Basic(grants),
            PermissionBackendKind::Contextual => Backend::Contextual(grants),
        };
        Self::with_permissions(config, PermissionResolver::new(backend))
    }

    /// Create the plugin with an externally supplied permission resolver
    pub fn with_permissions(config: ResolvedConfig, permissions: PermissionResolver) -> Self {
        Self {
            config,
            permissions,
            filters: None,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Select the codec for the configured host version.
    ///
    /// Runs at most once successfully; on failure filters stay disabled and
    /// the unsupported version is reported.
    pub fn load_codec(&mut self) -> bool {
        if let Some(registry) = &self.filters {
            warn!(
                codec = registry.codec().version(),
                "Codec already loaded, ignoring reselection"
            );
            return true;
        }

        match adapters::select(&self.config.host_version) {
            Ok(codec) => {
                self.filters = Some(FilterRegistry::new(self.config.filters_dir.clone(), codec));
                true
            }
            Err(e) => {
                error!(
                    version = e.version(),
                    "This build is incompatible with your host version {}: {}",
                    e.version(),
                    e
                );
                error!(
                    "Supported versions: {}",
                    adapters::supported_versions().join(", ")
                );
                false
            }
        }
    }

    /// The active codec, if one was selected
    pub fn codec(&self) -> Option<&Arc<dyn BookCodec>> {
        self.filters.as_ref().map(|r| r.codec())
    }

    /// The registry, if filters are enabled
    pub fn registry(&self) -> Result<&FilterRegistry, FilterError> {
        self.filters.as_ref().ok_or(FilterError::Disabled)
    }

    fn registry_mut(&mut self) -> Result<&mut FilterRegistry, FilterError> {
        self.filters.as_mut().ok_or(FilterError::Disabled)
    }

    /// Rebuild the registry from the filters directory
    pub fn reload(&mut self) -> Result<ReloadSummary, FilterError> {
        Ok(self.registry_mut()?.reload())
    }

    pub fn is_valid_name(&self, name: &str) -> bool {
        FilterRegistry::is_valid_name(name)
    }

    /// The filter's book; a blank written book if it does not exist
    pub fn get_filter(&self, name: &str) -> Result<Book, FilterError> {
        self.registry()?.get(name)
    }

    pub fn has_filter(&self, name: &str) -> Result<bool, FilterError> {
        self.registry()?.has(name)
    }

    pub fn create_filter(&mut self, name: &str, book: Book) -> Result<(), FilterError> {
        self.registry_mut()?.create(name, book)?;
        info!(filter = name, "Filter created");
        Ok(())
    }

    pub fn remove_filter(&mut self, name: &str) -> Result<(), FilterError> {
        self.registry_mut()?.remove(name);
        Ok(())
    }

    pub fn list_filters(&self) -> Result<BTreeSet<String>, FilterError> {
        Ok(self.registry()?.list())
    }

    /// Whether the caller holds `permission`
    pub fn check_permission(&self, caller: &dyn Caller, permission: &str) -> bool {
        self.permissions.check(caller, permission)
    }

    /// Show a book to a user through the host
    pub fn open_book(&self, host: &dyn BookHost, user: &str, book: &Book) -> Result<(), FilterError> {
        if !book.is_template() {
            return Err(FilterError::NotTemplate(book.kind.to_string()));
        }
        self.registry()?.codec().deliver(host, user, book);
        Ok(())
    }

    /// Expand placeholders in a book for a user, if enabled
    pub fn apply_placeholders(
        &self,
        transform: &dyn TextTransform,
        user: &str,
        book: Book,
        npc: Option<&NpcContext>,
    ) -> Result<Book, FilterError> {
        if !book.is_template() {
            return Err(FilterError::NotTemplate(book.kind.to_string()));
        }
        if !self.config.placeholders_enabled {
            return Ok(book);
        }
        Ok(placeholders::apply(book, user, transform, npc))
    }
}
