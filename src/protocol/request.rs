//! Request definitions
//!
//! Represents operations issued by clients.

use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// A client-issued operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Add an entry
    Add { entry: Entry },

    /// Remove the entry stored under `entry.key()`
    Remove { entry: Entry },

    /// Replace `old_entry` with `new_entry`, if `old_entry` is still current
    Update { new_entry: Entry, old_entry: Entry },

    /// Search all fields with a regular expression
    Find { pattern: String },

    /// Fetch every entry
    Get,

    /// Persist the store to its backing file
    Save,

    /// Health check
    Ping,

    /// End the session
    Quit,
}

impl Request {
    /// Command name, as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Request::Add { .. } => "ADD",
            Request::Remove { .. } => "REMOVE",
            Request::Update { .. } => "UPDATE",
            Request::Find { .. } => "FIND",
            Request::Get => "GET",
            Request::Save => "SAVE",
            Request::Ping => "PING",
            Request::Quit => "QUIT",
        }
    }

    /// Whether sending this request twice has the same effect as sending it once
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Request::Find { .. } | Request::Get | Request::Ping)
    }
}
