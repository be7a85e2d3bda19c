//! Error types for Wordbank
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::entry::Entry;

/// Result type alias using WordbankError
pub type Result<T> = std::result::Result<T, WordbankError>;

/// Unified error type for Wordbank operations
#[derive(Debug, Error)]
pub enum WordbankError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("The following entry already exists in the database: {0}")]
    EntryAlreadyExists(Entry),

    #[error("The following entry does not exist in the database: {0}")]
    EntryDoesNotExist(Entry),

    #[error("The following entry has already been updated by another user: {0}")]
    StaleEntry(Entry),

    #[error("Invalid regular expression pattern: {0}")]
    InvalidRegexPattern(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Worker pool is shut down")]
    PoolShutdown,
}

impl WordbankError {
    /// Whether this is an expected, typed outcome of a store operation
    /// (as opposed to an I/O, protocol or programmer error).
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            WordbankError::EntryAlreadyExists(_)
                | WordbankError::EntryDoesNotExist(_)
                | WordbankError::StaleEntry(_)
                | WordbankError::InvalidRegexPattern(_)
        )
    }

    /// Whether the underlying connection is gone (peer closed, reset, timed out)
    pub(crate) fn is_disconnect(&self) -> bool {
        use std::io::ErrorKind;

        match self {
            WordbankError::Io(e) => matches!(
                e.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

impl From<bincode::Error> for WordbankError {
    fn from(e: bincode::Error) -> Self {
        WordbankError::Serialization(e.to_string())
    }
}
