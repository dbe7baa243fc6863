//! Crate error type.
//!
//! The reconciliation stages themselves are total and never fail; errors only
//! come from loading configuration and from the storage adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Safety check failed: {0}")]
    Unsafe(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn unsafe_output(msg: impl Into<String>) -> Self {
        Self::Unsafe(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
