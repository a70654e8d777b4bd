//! Error types for the contentvault application.
//!
//! The store itself recovers from environmental failures locally and only
//! logs them, so most of these variants surface from input validation or
//! from the command-line front-end.

use std::io;

use thiserror::Error;

/// The main error type for the contentvault application.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Item was not found when performing an operation.
    #[error("Item not found: {id}")]
    ItemNotFound { id: String },

    /// The save candidate violates the item contract (e.g. a link without a URL).
    #[error("Invalid item: {message}")]
    InvalidItem { message: String },

    /// A date filter could not be parsed.
    #[error("Invalid date: {value} (expected YYYY-MM-DD or an RFC 3339 timestamp)")]
    InvalidDate { value: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// The external editor could not be launched or exited with an error.
    #[error("{message}")]
    EditorError { message: String },
}
