//! Store Module
//!
//! The in-memory record store and the API it shares with the client proxy.
//!
//! ## Responsibilities
//! - Keep one entry per key, ordered by key
//! - Enforce the add/remove/update rules
//! - Regex search across all fields
//! - Load from and save to the backing file

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::{Mutex, RwLock};
use regex::Regex;

use crate::config::{Config, DuplicateKeyPolicy};
use crate::entry::Entry;
use crate::error::{Result, WordbankError};
use crate::persistence::{render_lines, DbReader, DbWriter, LoadReport};
use crate::protocol::{Request, Response};

/// Operations every record store front end offers
///
/// Implemented by [`RecordStore`] for in-process callers and by
/// [`Client`](crate::network::Client) for callers going through a server.
pub trait EntryStore {
    /// Add an entry
    fn add(&self, entry: Entry) -> Result<()>;

    /// Remove the entry stored under `entry.key()`
    fn remove(&self, entry: &Entry) -> Result<()>;

    /// Replace `old_entry` with `new_entry` if the store still holds `old_entry`
    fn update(&self, new_entry: Entry, old_entry: &Entry) -> Result<()>;

    /// Entries where `pattern` matches somewhere in any field, ordered by key
    fn find(&self, pattern: &str) -> Result<Vec<Entry>>;

    /// Every entry, ordered by key
    fn get_all(&self) -> Result<Vec<Entry>>;

    /// Persist the store to its backing file
    fn save(&self) -> Result<()>;
}

/// The concurrent keyed record store
///
/// ## Concurrency Model
///
/// - **Mutations** (add/remove/update): exclusive `entries` write lock, held
///   for a single map operation only
/// - **Reads** (find/get_all): shared read lock while results are copied out
/// - **Save**: `file_lock` is taken first, then the snapshot is copied out
///   under the read lock and written with only `file_lock` held, so mutations
///   are never blocked by file I/O. A save reflects the store as of its
///   snapshot, and concurrent saves write in snapshot order.
pub struct RecordStore {
    /// Store configuration (path, delimiter, duplicate policy)
    config: Config,

    /// key → entry
    entries: RwLock<BTreeMap<String, Entry>>,

    /// Serializes writers of the backing file
    file_lock: Mutex<()>,

    /// What happened when the backing file was loaded
    load_report: LoadReport,
}

impl RecordStore {
    /// Open a store from an existing database file
    ///
    /// A missing or unreadable file is an error; malformed lines are skipped.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let (loaded, mut report) = DbReader::read(&config.db_path, config.delimiter)?;

        let mut store = Self::with_report(config, LoadReport::default());
        for entry in loaded {
            match store.add(entry) {
                Ok(()) => report.entries_loaded += 1,
                Err(WordbankError::EntryAlreadyExists(entry)) => {
                    tracing::info!("Ignoring duplicate entry during load: {}", entry);
                    report.duplicates += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping entry during load: {}", e);
                    report.lines_skipped += 1;
                }
            }
        }

        tracing::info!(
            "Loaded {} entries from {} ({} lines read, {} skipped, {} duplicates)",
            store.len(),
            store.config.db_path.display(),
            report.lines_read,
            report.lines_skipped,
            report.duplicates
        );

        store.load_report = report;
        Ok(store)
    }

    /// Create an empty store; the backing file is written on the first save
    pub fn create(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_report(config, LoadReport::default()))
    }

    /// Open the database file if it exists, otherwise start empty
    pub fn open_or_create(config: Config) -> Result<Self> {
        if config.db_path.exists() {
            Self::open(config)
        } else {
            tracing::info!(
                "{} does not exist, starting with an empty store",
                config.db_path.display()
            );
            Self::create(config)
        }
    }

    fn with_report(config: Config, load_report: LoadReport) -> Self {
        Self {
            config,
            entries: RwLock::new(BTreeMap::new()),
            file_lock: Mutex::new(()),
            load_report,
        }
    }

    /// Run a request against the store
    ///
    /// `Quit` is a connection-level command and is answered with `Done`.
    pub fn execute(&self, request: Request) -> Result<Response> {
        match request {
            Request::Add { entry } => {
                self.add(entry)?;
                Ok(Response::Done)
            }
            Request::Remove { entry } => {
                self.remove(&entry)?;
                Ok(Response::Done)
            }
            Request::Update { new_entry, old_entry } => {
                self.update(new_entry, &old_entry)?;
                Ok(Response::Done)
            }
            Request::Find { pattern } => Ok(Response::Entries(self.find(&pattern)?)),
            Request::Get => Ok(Response::Entries(self.get_all())),
            Request::Save => {
                self.save()?;
                Ok(Response::Done)
            }
            Request::Ping => Ok(Response::Pong),
            Request::Quit => Ok(Response::Done),
        }
    }

    /// Add an entry
    ///
    /// Fails with `EntryAlreadyExists` when the identical entry is stored. A
    /// different entry under the same key is replaced, unless the policy is
    /// [`DuplicateKeyPolicy::Reject`].
    pub fn add(&self, entry: Entry) -> Result<()> {
        self.check_entry(&entry)?;

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(entry.key()) {
            if *existing == entry || self.config.duplicate_key_policy == DuplicateKeyPolicy::Reject
            {
                return Err(WordbankError::EntryAlreadyExists(entry));
            }
            tracing::debug!("Replacing {} with {}", existing, entry);
        }
        entries.insert(entry.key().to_string(), entry);
        Ok(())
    }

    /// Remove the entry stored under `entry.key()`
    ///
    /// Only the key is compared; the stored content may differ from `entry`.
    pub fn remove(&self, entry: &Entry) -> Result<()> {
        match self.entries.write().remove(entry.key()) {
            Some(_) => Ok(()),
            None => Err(WordbankError::EntryDoesNotExist(entry.clone())),
        }
    }

    /// Replace `old_entry` with `new_entry`
    ///
    /// Fails with `EntryDoesNotExist` if nothing is stored under
    /// `old_entry.key()` and with `StaleEntry` if the stored entry is no longer
    /// `old_entry`. The store is unchanged on failure.
    pub fn update(&self, new_entry: Entry, old_entry: &Entry) -> Result<()> {
        self.check_entry(&new_entry)?;

        let mut entries = self.entries.write();
        match entries.get(old_entry.key()) {
            None => return Err(WordbankError::EntryDoesNotExist(old_entry.clone())),
            Some(current) if current != old_entry => {
                return Err(WordbankError::StaleEntry(old_entry.clone()))
            }
            Some(_) => {}
        }

        if new_entry.key() != old_entry.key()
            && self.config.duplicate_key_policy == DuplicateKeyPolicy::Reject
            && entries.contains_key(new_entry.key())
        {
            return Err(WordbankError::EntryAlreadyExists(new_entry));
        }

        entries.remove(old_entry.key());
        entries.insert(new_entry.key().to_string(), new_entry);
        Ok(())
    }

    /// Entries where `pattern` matches anywhere in the key, reading or meaning
    pub fn find(&self, pattern: &str) -> Result<Vec<Entry>> {
        if pattern.is_empty() {
            return Err(WordbankError::InvalidRegexPattern(
                "Empty regular expression pattern.".to_string(),
            ));
        }
        let regex = Regex::new(pattern)
            .map_err(|e| WordbankError::InvalidRegexPattern(e.to_string()))?;

        let entries = self.entries.read();
        Ok(entries
            .values()
            .filter(|entry| entry.fields().iter().any(|field| regex.is_match(field)))
            .cloned()
            .collect())
    }

    /// Snapshot of every entry, ordered by key
    pub fn get_all(&self) -> Vec<Entry> {
        self.entries.read().values().cloned().collect()
    }

    /// Write the store to its backing file
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.config.db_path)
    }

    /// Write the store to `path` in the database format
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Snapshot under the file lock, so the last save to finish writes
        // the newest snapshot
        let _file_guard = self.file_lock.lock();
        let snapshot = self.get_all();
        let lines = render_lines(&snapshot, self.config.delimiter);

        DbWriter::write(path, &lines)?;

        tracing::info!("Saved {} entries to {}", lines.len(), path.display());
        Ok(())
    }

    /// Reject entries the file format cannot represent
    fn check_entry(&self, entry: &Entry) -> Result<()> {
        let delimiter = self.config.delimiter;
        for field in entry.fields() {
            if field.contains(delimiter) || field.contains(['\n', '\r']) {
                return Err(WordbankError::InvalidArgument(format!(
                    "field {:?} contains the delimiter {:?} or a line break",
                    field, delimiter
                )));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether the stored entry for `entry.key()` is exactly `entry`
    pub fn contains(&self, entry: &Entry) -> bool {
        self.entries.read().get(entry.key()) == Some(entry)
    }

    /// Statistics from loading the backing file
    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl EntryStore for RecordStore {
    fn add(&self, entry: Entry) -> Result<()> {
        RecordStore::add(self, entry)
    }

    fn remove(&self, entry: &Entry) -> Result<()> {
        RecordStore::remove(self, entry)
    }

    fn update(&self, new_entry: Entry, old_entry: &Entry) -> Result<()> {
        RecordStore::update(self, new_entry, old_entry)
    }

    fn find(&self, pattern: &str) -> Result<Vec<Entry>> {
        RecordStore::find(self, pattern)
    }

    fn get_all(&self) -> Result<Vec<Entry>> {
        Ok(RecordStore::get_all(self))
    }

    fn save(&self) -> Result<()> {
        RecordStore::save(self)
    }
}
