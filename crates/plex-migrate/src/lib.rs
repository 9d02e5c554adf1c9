//! Plex migrate library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (run, health, users)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{list_users, run_migration, show_health, GlobalOptions};
