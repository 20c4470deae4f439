//! Configuration for bookfilter.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (BOOKFILTER_HOME, BOOKFILTER_FILTERS, BOOKFILTER_HOST_VERSION)
//! 2. Config file (.bookfilter/config.yaml)
//! 3. Defaults (~/.bookfilter)
//!
//! Config file discovery:
//! - Searches current directory and parents for .bookfilter/config.yaml
//! - Falls back to config.yaml inside the home directory
//! - Paths in the config file are relative to the config file's directory

pub mod paths;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::permissions::GrantTable;

/// Config schema version written by this build
pub const CONFIG_VERSION: u32 = 1;

/// Host version assumed when none is configured
pub const DEFAULT_HOST_VERSION: &str = "v1_16_R3";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    #[serde(default)]
    pub host_version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub placeholders: PlaceholdersConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            host_version: Some(DEFAULT_HOST_VERSION.to_string()),
            paths: PathsConfig::default(),
            placeholders: PlaceholdersConfig::default(),
            permissions: PermissionsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Filters directory (relative to the config file)
    pub filters: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholdersConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PlaceholdersConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

/// Which slot the configured grant table is plugged into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionBackendKind {
    #[default]
    None,
    Basic,
    Contextual,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub backend: PermissionBackendKind,
    /// user -> node -> granted
    #[serde(default)]
    pub grants: GrantTable,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// bookfilter home directory
    pub home: PathBuf,
    /// Directory holding one JSON document per filter
    pub filters_dir: PathBuf,
    /// Host version string used for codec selection
    pub host_version: String,
    pub placeholders_enabled: bool,
    pub permissions: PermissionsConfig,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Defaults rooted at `home`, ignoring files and environment
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            filters_dir: paths::filters_dir(&home),
            home,
            host_version: DEFAULT_HOST_VERSION.to_string(),
            placeholders_enabled: true,
            permissions: PermissionsConfig::default(),
            config_file: None,
        }
    }
}

/// Values taken from the environment
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<PathBuf>,
    pub filters: Option<PathBuf>,
    pub host_version: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            home: std::env::var("BOOKFILTER_HOME").ok().map(PathBuf::from),
            filters: std::env::var("BOOKFILTER_FILTERS").ok().map(PathBuf::from),
            host_version: std::env::var("BOOKFILTER_HOST_VERSION").ok(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".bookfilter").join(paths::CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Merge a parsed config file (if any) with environment overrides
pub fn resolve(
    config_file: Option<(&Path, ConfigFile)>,
    default_home: PathBuf,
    env: &EnvOverrides,
) -> ResolvedConfig {
    let Some((config_path, file)) = config_file else {
        let home = env.home.clone().unwrap_or(default_home);
        let mut resolved = ResolvedConfig::with_home(&home);
        if let Some(filters) = &env.filters {
            resolved.filters_dir = filters.clone();
        }
        if let Some(version) = &env.host_version {
            resolved.host_version = version.clone();
        }
        return resolved;
    };

    let config_dir = config_path.parent().unwrap_or(Path::new("."));

    let home = env
        .home
        .clone()
        .unwrap_or_else(|| config_dir.to_path_buf());

    let filters_dir = if let Some(filters) = &env.filters {
        filters.clone()
    } else if let Some(filters) = &file.paths.filters {
        resolve_path(config_dir, filters)
    } else {
        paths::filters_dir(&home)
    };

    let host_version = env
        .host_version
        .clone()
        .or(file.host_version)
        .unwrap_or_else(|| DEFAULT_HOST_VERSION.to_string());

    ResolvedConfig {
        home,
        filters_dir,
        host_version,
        placeholders_enabled: file.placeholders.enabled,
        permissions: file.permissions,
        config_file: Some(config_path.to_path_buf()),
    }
}

/// Load configuration from all sources
pub fn load() -> Result<ResolvedConfig> {
    let env = EnvOverrides::from_env();
    let default_home = match &env.home {
        Some(home) => home.clone(),
        None => paths::default_home()?,
    };

    let config_path = find_config_file().or_else(|| {
        let candidate = paths::config_file(&default_home);
        candidate.exists().then_some(candidate)
    });

    match config_path {
        Some(path) => {
            let file = load_config_file(&path)?;
            Ok(resolve(Some((path.as_path(), file)), default_home, &env))
        }
        None => Ok(resolve(None, default_home, &env)),
    }
}

/// Make sure `home` holds a config file of the current version.
///
/// A missing file is created with defaults. A file declaring another
/// version is moved aside to `config_<millis>.yaml` and regenerated.
pub fn ensure_config_file(home: &Path) -> Result<PathBuf> {
    let path = paths::config_file(home);

    if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let raw: serde_yaml::Value = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        match raw.get("version").and_then(|v| v.as_u64()) {
            Some(version) if version != CONFIG_VERSION as u64 => {
                let backup = paths::backup_config_file(home, Utc::now().timestamp_millis());
                std::fs::rename(&path, &backup).with_context(|| {
                    format!("Failed to back up config file to {}", backup.display())
                })?;
                info!(
                    "Config version {} is outdated, moved it to {}",
                    version,
                    backup.display()
                );
            }
            _ => return Ok(path),
        }
    }

    std::fs::create_dir_all(home)
        .with_context(|| format!("Failed to create {}", home.display()))?;
    let content = serde_yaml::to_string(&ConfigFile::default())?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    info!("A new {} was created!", paths::CONFIG_FILE_NAME);

    Ok(path)
}
