//! Error types for PWICE
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for PWICE operations
///
/// Covers configuration and credential problems, catalog lookups,
/// remote model transport failures and the usual I/O and parsing errors.
#[derive(Error, Debug)]
pub enum PwiceError {
    /// Configuration-related errors (invalid file, invalid values,
    /// malformed credential)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing credential for the remote model
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// A character or archive id was not found in the catalog
    #[error("{kind} not found: {id}")]
    Lookup {
        /// What was looked up ("Character", "Archive")
        kind: &'static str,
        /// The id that did not match
        id: String,
    },

    /// Failure while sending a message or reading its streamed reply
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote model rejected the credential
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl PwiceError {
    /// Whether this error means the chat cannot start until configuration
    /// is fixed (as opposed to a per-message transport failure).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::MissingCredentials(_))
    }
}

/// Result type alias for PWICE operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
