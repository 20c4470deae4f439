//! Canonical paths for bookfilter.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! ```text
//! ~/.bookfilter/
//! ├── config.yaml
//! ├── config_<millis>.yaml     # outdated configs moved aside
//! └── filters/
//!     └── <filter_name>.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Name of the config file inside the home directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the filters directory inside the home directory
pub const FILTERS_DIR_NAME: &str = "filters";

/// Get the default home directory (~/.bookfilter)
pub fn default_home() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home.join(".bookfilter"))
}

/// Get the config file path ($HOME/config.yaml)
pub fn config_file(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE_NAME)
}

/// Where an outdated config is moved before a new one is written
pub fn backup_config_file(home: &Path, timestamp_millis: i64) -> PathBuf {
    home.join(format!("config_{}.yaml", timestamp_millis))
}

/// Get the default filters directory ($HOME/filters)
pub fn filters_dir(home: &Path) -> PathBuf {
    home.join(FILTERS_DIR_NAME)
}
