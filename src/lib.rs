//! # Wordbank
//!
//! A concurrent vocabulary record store with:
//! - An in-memory keyed store of three-field entries (word, reading, meaning)
//! - Persistence to a delimited text file
//! - Regex search across all fields
//! - A TCP request/response protocol served by a bounded worker pool
//! - A client proxy exposing the same API as the local store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐                      ┌─────────────────────────────┐
//! │    Client    │── framed requests ──▶│   Server (acceptor thread)  │
//! │   (proxy)    │◀── framed responses ─│   + WorkerPool              │
//! └──────────────┘                      └──────────────┬──────────────┘
//!                                                      │ one Connection per job
//!                                                      ▼
//!                                       ┌─────────────────────────────┐
//!                                       │        RecordStore          │
//!                                       │  (RwLock<BTreeMap>)         │
//!                                       └──────────────┬──────────────┘
//!                                                      │ load / save
//!                                                      ▼
//!                                       ┌─────────────────────────────┐
//!                                       │   Database file (key;r;m)   │
//!                                       └─────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod entry;
pub mod persistence;
pub mod store;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{WordbankError, Result};
pub use config::{Config, DuplicateKeyPolicy};
pub use entry::Entry;
pub use store::{EntryStore, RecordStore};
pub use network::{Client, Server};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Wordbank
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
