//! Database Reader
//!
//! Lenient line-by-line loader for the database file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::entry::Entry;
use crate::error::Result;

use super::parse_line;

/// Outcome of loading a database file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Lines read from the file (including skipped ones)
    pub lines_read: u64,

    /// Entries that made it into the store
    pub entries_loaded: u64,

    /// Malformed lines that were skipped
    pub lines_skipped: u64,

    /// Well-formed lines the store refused as duplicates
    pub duplicates: u64,
}

/// Reads entries from a database file
pub struct DbReader;

impl DbReader {
    /// Read every well-formed entry from `path`
    ///
    /// A missing or unreadable file is an error. Malformed lines (wrong field
    /// count, blank field, invalid UTF-8) are skipped and logged.
    pub fn read(path: &Path, delimiter: char) -> Result<(Vec<Entry>, LoadReport)> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut entries = Vec::new();
        let mut report = LoadReport::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            report.lines_read += 1;
            let line_no = report.lines_read;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim_end_matches(['\n', '\r']),
                Err(e) => {
                    tracing::warn!("{}:{}: skipping line, invalid UTF-8: {}", path.display(), line_no, e);
                    report.lines_skipped += 1;
                    continue;
                }
            };

            if line.is_empty() {
                tracing::debug!("{}:{}: skipping empty line", path.display(), line_no);
                report.lines_skipped += 1;
                continue;
            }

            match parse_line(line, delimiter) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("{}:{}: skipping malformed line ({}): {:?}", path.display(), line_no, e, line);
                    report.lines_skipped += 1;
                }
            }
        }

        Ok((entries, report))
    }
}
