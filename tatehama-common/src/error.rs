//! Common error types for the console services

use thiserror::Error;

/// Common result type for console operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared across console crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML configuration
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or command parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
