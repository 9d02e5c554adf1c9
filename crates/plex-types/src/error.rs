//! Error types shared across the plex crates.

use thiserror::Error;

/// Unified error type for configuration and model validation.
#[derive(Debug, Error)]
pub enum PlexError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
