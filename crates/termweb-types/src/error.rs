//! Error types for termweb.

use std::io;

/// Errors produced by the termweb crates.
///
/// Malformed markup is never an error; the parser always recovers.
/// `InvalidOperation` marks a caller bug (bad index, wrong parent).
#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl BrowseError {
    /// Shorthand for an [`BrowseError::InvalidOperation`] with a message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BrowseError>;
