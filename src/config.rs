//! Configuration for Wordbank
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, WordbankError};

/// Main configuration for a Wordbank store, server or client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Backing database file (one record per line)
    pub db_path: PathBuf,

    /// Single-character field separator used in the database file
    pub delimiter: char,

    /// What `add` does when the key is already present
    pub duplicate_key_policy: DuplicateKeyPolicy,

    // -------------------------------------------------------------------------
    // Server Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Number of worker threads serving connections
    pub worker_threads: usize,

    /// How often the acceptor checks for the stop signal (milliseconds)
    pub accept_poll_ms: u64,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Client Configuration
    // -------------------------------------------------------------------------
    /// Client connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Client read timeout while waiting for a response (milliseconds, 0 = none)
    pub client_read_timeout_ms: u64,
}

/// Behaviour of `add` when an entry with the same key is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKeyPolicy {
    /// Identical content fails with `EntryAlreadyExists`; differing content replaces
    /// the stored entry
    Overwrite,

    /// Any key collision fails with `EntryAlreadyExists`
    Reject,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./wordbank.db"),
            delimiter: ';',
            duplicate_key_policy: DuplicateKeyPolicy::Overwrite,
            listen_addr: "127.0.0.1:7777".to_string(),
            worker_threads: 25,
            accept_poll_ms: 50,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            connect_timeout_ms: 5000,
            client_read_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the rest of the crate cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.delimiter == '\n' || self.delimiter == '\r' {
            return Err(WordbankError::Config(
                "delimiter cannot be a line break".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(WordbankError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.accept_poll_ms == 0 {
            return Err(WordbankError::Config(
                "accept_poll_ms must be at least 1".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(WordbankError::Config(
                "connect_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms)
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the database file path
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    /// Set the field delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    /// Set the duplicate key policy
    pub fn duplicate_key_policy(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.config.duplicate_key_policy = policy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the acceptor poll interval (in milliseconds)
    pub fn accept_poll_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the client connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the client read timeout (in milliseconds)
    pub fn client_read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.client_read_timeout_ms = ms;
        self
    }

    /// Validate and return the config
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
