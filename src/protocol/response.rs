//! Response definitions
//!
//! Represents responses to clients.

use std::io;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::error::{Result, WordbankError};

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// The request succeeded and has no payload
    Done,

    /// Entries for GET and FIND, ordered by key
    Entries(Vec<Entry>),

    /// Answer to PING
    Pong,

    /// The request failed
    Failed(Failure),
}

/// A typed failure as it travels over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    EntryAlreadyExists(Entry),
    EntryDoesNotExist(Entry),
    StaleEntry(Entry),
    InvalidRegexPattern(String),
    InvalidArgument(String),
    Io(String),
    Protocol(String),
    Internal(String),
}

impl Response {
    /// Expect `Done`
    pub fn into_done(self) -> Result<()> {
        match self {
            Response::Done => Ok(()),
            other => Err(other.unexpected("DONE")),
        }
    }

    /// Expect `Entries`
    pub fn into_entries(self) -> Result<Vec<Entry>> {
        match self {
            Response::Entries(entries) => Ok(entries),
            other => Err(other.unexpected("ENTRIES")),
        }
    }

    /// Expect `Pong`
    pub fn into_pong(self) -> Result<()> {
        match self {
            Response::Pong => Ok(()),
            other => Err(other.unexpected("PONG")),
        }
    }

    fn unexpected(self, wanted: &str) -> WordbankError {
        match self {
            Response::Failed(failure) => failure.into(),
            other => WordbankError::Protocol(format!(
                "expected {} response, got {:?}",
                wanted, other
            )),
        }
    }
}

impl From<&WordbankError> for Failure {
    fn from(e: &WordbankError) -> Self {
        match e {
            WordbankError::EntryAlreadyExists(entry) => Failure::EntryAlreadyExists(entry.clone()),
            WordbankError::EntryDoesNotExist(entry) => Failure::EntryDoesNotExist(entry.clone()),
            WordbankError::StaleEntry(entry) => Failure::StaleEntry(entry.clone()),
            WordbankError::InvalidRegexPattern(msg) => Failure::InvalidRegexPattern(msg.clone()),
            WordbankError::InvalidArgument(msg) => Failure::InvalidArgument(msg.clone()),
            WordbankError::Io(err) => Failure::Io(err.to_string()),
            WordbankError::Protocol(msg) => Failure::Protocol(msg.clone()),
            other => Failure::Internal(other.to_string()),
        }
    }
}

impl From<Failure> for WordbankError {
    fn from(f: Failure) -> Self {
        match f {
            Failure::EntryAlreadyExists(entry) => WordbankError::EntryAlreadyExists(entry),
            Failure::EntryDoesNotExist(entry) => WordbankError::EntryDoesNotExist(entry),
            Failure::StaleEntry(entry) => WordbankError::StaleEntry(entry),
            Failure::InvalidRegexPattern(msg) => WordbankError::InvalidRegexPattern(msg),
            Failure::InvalidArgument(msg) => WordbankError::InvalidArgument(msg),
            Failure::Io(msg) => WordbankError::Io(io::Error::new(io::ErrorKind::Other, msg)),
            Failure::Protocol(msg) => WordbankError::Protocol(msg),
            Failure::Internal(msg) => {
                WordbankError::Protocol(format!("server error: {}", msg))
            }
        }
    }
}
