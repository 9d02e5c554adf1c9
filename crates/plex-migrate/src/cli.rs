//! CLI argument parsing for plex-migrate.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Plex Migrate
///
/// Migrates every user's plex namespace into a per-user search index.
#[derive(Parser, Debug)]
#[command(name = "plex-migrate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/plex-migrate/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Endpoint profile to use (prod, dev, dev2 or one defined in config)
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate every user and verify the result
    Run {
        /// Keep existing indices instead of deleting them first
        #[arg(long)]
        keep_indices: bool,

        /// Documents in flight per collection
        #[arg(long)]
        document_concurrency: Option<usize>,

        /// Users migrated at once
        #[arg(long)]
        user_concurrency: Option<usize>,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index cluster health
    Health,

    /// List directory users without migrating
    Users,
}
