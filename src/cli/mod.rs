//! Command-line interface for bookfilter.
//!
//! Provides commands for managing filters in the local filters directory,
//! inspecting codec support and trying out permission checks.

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters;
use crate::config::{self, ResolvedConfig};
use crate::core::{Plugin, StaticCaller};
use crate::domain::Book;

/// bookfilter - Named book templates
#[derive(Parser, Debug)]
#[command(name = "bookfilter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Host version to select the codec for (overrides config)
    #[arg(long, global = true)]
    pub host_version: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the config file and filters directory
    Init,

    /// Rescan the filters directory and report what loaded
    Reload,

    /// List filter names
    List,

    /// Show a filter's book
    Show {
        /// Filter name
        name: String,

        /// Print the book as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create or replace a filter from a book JSON file
    Create {
        /// Filter name
        name: String,

        /// Book JSON file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Remove a filter
    Remove {
        /// Filter name
        name: String,
    },

    /// Check whether a user holds a permission
    Check {
        /// User name
        user: String,

        /// Permission node
        permission: String,

        /// Treat the user as an operator
        #[arg(long)]
        op: bool,

        /// Native permissions the user holds (repeatable)
        #[arg(long = "native")]
        native: Vec<String>,
    },

    /// List supported host versions
    Codecs,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let mut config = config::load()?;
        if let Some(version) = self.host_version {
            config.host_version = version;
        }

        match self.command {
            Commands::Init => init(&config),
            Commands::Reload => reload(config),
            Commands::List => list_filters(config),
            Commands::Show { name, json } => show_filter(config, &name, json),
            Commands::Create { name, input } => create_filter(config, &name, input),
            Commands::Remove { name } => remove_filter(config, &name),
            Commands::Check {
                user,
                permission,
                op,
                native,
            } => check_permission(config, user, &permission, op, native),
            Commands::Codecs => list_codecs(&config),
            Commands::Config => show_config(&config),
        }
    }
}

/// Build the plugin, select the codec and load the filters
fn open_plugin(config: ResolvedConfig) -> Result<Plugin> {
    let mut plugin = Plugin::new(config);
    if !plugin.load_codec() {
        anyhow::bail!(
            "Host version '{}' is not supported. Supported versions: {}",
            adapters::canonical_version(&plugin.config().host_version),
            adapters::supported_versions().join(", ")
        );
    }
    plugin.reload()?;
    Ok(plugin)
}

fn init(config: &ResolvedConfig) -> Result<()> {
    let path = config::ensure_config_file(&config.home)?;
    std::fs::create_dir_all(&config.filters_dir).with_context(|| {
        format!(
            "Failed to create filters directory: {}",
            config.filters_dir.display()
        )
    })?;

    println!("Config: {}", path.display());
    println!("Filters: {}", config.filters_dir.display());
    Ok(())
}

fn reload(config: ResolvedConfig) -> Result<()> {
    let mut plugin = Plugin::new(config);
    if !plugin.load_codec() {
        anyhow::bail!(
            "Host version '{}' is not supported",
            plugin.config().host_version
        );
    }
    let summary = plugin.reload()?;

    if summary.loaded == 0 {
        println!("No filter was loaded");
    } else {
        println!("Loaded {} filters", summary.loaded);
    }
    if summary.skipped > 0 {
        println!("Skipped {} files (see log for details)", summary.skipped);
    }
    Ok(())
}

fn list_filters(config: ResolvedConfig) -> Result<()> {
    let plugin = open_plugin(config)?;
    let names = plugin.list_filters()?;

    if names.is_empty() {
        println!("No filters found");
        return Ok(());
    }

    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn show_filter(config: ResolvedConfig, name: &str, json: bool) -> Result<()> {
    let plugin = open_plugin(config)?;
    if !plugin.has_filter(name)? {
        eprintln!("Filter '{}' not found, showing a blank book", name);
    }
    let book = plugin.get_filter(name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&book)?);
        return Ok(());
    }

    println!("Title: {}", book.title.as_deref().unwrap_or("-"));
    println!("Author: {}", book.author.as_deref().unwrap_or("-"));
    println!("Pages: {}", book.pages.len());
    for (i, page) in book.pages.iter().enumerate() {
        println!("\n--- Page {} ---", i + 1);
        println!("{}", page);
    }
    Ok(())
}

fn create_filter(config: ResolvedConfig, name: &str, input: Option<PathBuf>) -> Result<()> {
    let content = if let Some(path) = input {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    };

    let book: Book = serde_json::from_str(&content).context("Failed to parse book JSON")?;

    let mut plugin = open_plugin(config)?;
    plugin.create_filter(name, book)?;
    println!("Filter '{}' saved", name);
    Ok(())
}

fn remove_filter(config: ResolvedConfig, name: &str) -> Result<()> {
    let mut plugin = open_plugin(config)?;
    if !plugin.has_filter(name)? {
        println!("Filter '{}' does not exist", name);
        return Ok(());
    }

    plugin.remove_filter(name)?;
    println!("Filter '{}' removed", name);
    Ok(())
}

fn check_permission(
    config: ResolvedConfig,
    user: String,
    permission: &str,
    op: bool,
    native: Vec<String>,
) -> Result<()> {
    // Permissions do not depend on the codec
    let plugin = Plugin::new(config);
    let caller = native
        .into_iter()
        .fold(StaticCaller::new(user).operator(op), |caller, node| {
            caller.with_native(node)
        });

    let allowed = plugin.check_permission(&caller, permission);
    println!(
        "{} {} {}",
        caller.name,
        if allowed { "has" } else { "lacks" },
        permission
    );
    if !allowed {
        std::process::exit(1);
    }
    Ok(())
}

fn list_codecs(config: &ResolvedConfig) -> Result<()> {
    let current = adapters::canonical_version(&config.host_version);
    for version in adapters::supported_versions() {
        let marker = if version == current { "*" } else { " " };
        println!("{} {}", marker, version);
    }
    Ok(())
}

fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("Home: {}", config.home.display());
    println!("Filters: {}", config.filters_dir.display());
    println!("Host version: {}", config.host_version);
    println!("Placeholders: {}", if config.placeholders_enabled { "enabled" } else { "disabled" });
    println!("Permission backend: {:?}", config.permissions.backend);
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from([
            "bookfilter",
            "--host-version",
            "v1_12_R1",
            "check",
            "alice",
            "bookfilter.open",
            "--native",
            "a.b",
            "--native",
            "c.d",
        ])
        .unwrap();

        assert_eq!(cli.host_version.as_deref(), Some("v1_12_R1"));
        match cli.command {
            Commands::Check { user, native, op, .. } => {
                assert_eq!(user, "alice");
                assert_eq!(native, vec!["a.b".to_string(), "c.d".to_string()]);
                assert!(!op);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
