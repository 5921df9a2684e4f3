//! # Tilegraph CLI Module
//!
//! This module implements the CLI interface for tilegraph.
//!
//! ## Available Commands
//!
//! - `run` - Build the adjacency graph and score every edge
//! - `fingerprint` - Print the fingerprint of the current inputs
//! - `inspect` - Show the cached bundle and whether it is still valid
//! - `clear` - Delete the cached bundle
//! - `init` - Write a default configuration file

mod commands;

use crate::config::{AppConfig, DEFAULT_CONFIG_FILE, Overrides};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tilegraph_core::TileGraphError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Tilegraph - tile adjacency graph builder
///
/// Finds which buffered tiles overlap and scores every adjacent pair by how
/// well one linear model explains the parcel values in both tiles.
#[derive(Parser, Debug)]
#[command(name = "tilegraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: tilegraph.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Tiles GeoJSON, overriding the configuration file
    #[arg(long, global = true)]
    pub tiles: Option<PathBuf>,

    /// Parcels Parquet, overriding the configuration file
    #[arg(long, global = true)]
    pub parcels: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Build the graph and scores, reusing the cache when valid
    Run {
        /// Ignore the cache for this run (neither read nor written)
        #[arg(long)]
        no_cache: bool,

        /// Worker threads (0 = one per CPU)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Print the fingerprint of the current inputs as JSON
    Fingerprint,

    /// Show the cached bundle and whether it matches the current inputs
    Inspect,

    /// Delete the cached bundle
    Clear,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Configuration file path to write to.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Command-line overrides for the configuration.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        let (workers, no_cache) = match &self.command {
            Some(Commands::Run { no_cache, workers }) => (*workers, *no_cache),
            _ => (None, false),
        };
        Overrides {
            tiles: self.tiles.clone(),
            parcels: self.parcels.clone(),
            workers,
            no_cache,
        }
    }

    /// The configuration file with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<AppConfig, TileGraphError> {
        let mut config = AppConfig::resolve(self.config.as_deref())?;
        config.apply(self.overrides());
        Ok(config)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), TileGraphError> {
    let json_mode = cli.json_mode;

    match &cli.command {
        Some(Commands::Init { force }) => cmd_init(&cli.config_path(), *force),
        Some(Commands::Run { .. }) => cmd_run(&cli.resolve_config()?, json_mode),
        Some(Commands::Fingerprint) => cmd_fingerprint(&cli.resolve_config()?),
        Some(Commands::Clear) => cmd_clear(&cli.resolve_config()?, json_mode),
        Some(Commands::Inspect) => cmd_inspect(&cli.resolve_config()?, json_mode),
        None => {
            // No subcommand - inspect by default
            cmd_inspect(&cli.resolve_config()?, json_mode)
        }
    }
}
