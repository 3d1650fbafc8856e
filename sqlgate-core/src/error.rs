//! Error types for SQL Gate driver operations.

use std::io;
use thiserror::Error;

/// The main error type for SQL Gate driver operations.
#[derive(Debug, Error)]
pub enum SqlGateError {
    /// Connection-related errors (session establishment, disconnections).
    #[error("connection error: {0}")]
    Connection(String),

    /// Protocol-related errors (malformed replies, unexpected responses).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An operation was attempted in a state that does not permit it.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// An XA error reported by the server's transaction coordinator.
    #[error("xa error {code}: {message}")]
    Xa {
        /// The X/Open XA error code (`XAER_*` or `XA_HEUR*`).
        code: i32,
        /// Human-readable detail from the coordinator.
        message: String,
    },

    /// Configuration errors (invalid or missing settings).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Operation timeout errors.
    #[error("timeout error: {0}")]
    Timeout(String),

    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SqlGateError {
    /// Returns the coordinator-reported XA code, if this is an XA error.
    pub fn xa_code(&self) -> Option<i32> {
        match self {
            SqlGateError::Xa { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A specialized `Result` type for SQL Gate driver operations.
pub type Result<T> = std::result::Result<T, SqlGateError>;
