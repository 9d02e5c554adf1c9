//! Plex Migrate
//!
//! One-shot batch migration of every directory user's plex namespace into a
//! per-user search index.
//!
//! # Usage
//!
//! ```bash
//! plex-migrate [--env prod|dev|dev2] run [--keep-indices] [--json]
//! plex-migrate health
//! plex-migrate users
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults and environment profiles
//! 2. Config file (~/.config/plex-migrate/config.toml)
//! 3. `--config` file
//! 4. Environment variables (PLEX_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use plex_migrate::{list_users, run_migration, show_health, Cli, Commands, GlobalOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = GlobalOptions {
        config: cli.config,
        log_level: cli.log_level,
        env: cli.env,
    };

    match cli.command {
        Commands::Run {
            keep_indices,
            document_concurrency,
            user_concurrency,
            json,
        } => {
            run_migration(
                &options,
                keep_indices,
                document_concurrency,
                user_concurrency,
                json,
            )
            .await?;
        }
        Commands::Health => {
            show_health(&options).await?;
        }
        Commands::Users => {
            list_users(&options).await?;
        }
    }

    Ok(())
}
