//! Error types for Relaycast
//!
//! Expected delivery failures never surface here: handlers fail closed and the
//! router encodes failure in its result maps. These variants cover the cases
//! that are genuine errors: bad configuration, malformed notifications, and
//! collaborator failures in the orchestrator.

use thiserror::Error;

/// The primary error type for Relaycast operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration-related errors (invalid config, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A notification failed validation at construction time.
    #[error("Invalid notification: {0}")]
    InvalidNotification(String),

    /// Message store errors (record missing, write rejected, etc.)
    #[error("Store error: {0}")]
    Store(String),

    /// Reply generation or speech synthesis failures
    #[error("Generation error: {0}")]
    Generation(String),

    /// Resource not found (messages, channels)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for Relaycast operations.
pub type Result<T> = std::result::Result<T, RelayError>;
