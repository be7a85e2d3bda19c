//! Persistence Module
//!
//! Reads and writes the delimited text database file.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ key <d> reading <d> meaning \n               │
//! │ key <d> reading <d> meaning \n               │
//! │ ...                                          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! - UTF-8, one record per line, `<d>` is a single configurable character
//! - Exactly three non-blank fields per line; anything else is skipped on load
//! - Saves rewrite the whole file, lines sorted by their rendered text

mod reader;
mod writer;

pub use reader::{DbReader, LoadReport};
pub use writer::{export_csv, DbWriter};

use std::fmt;

use crate::entry::Entry;

/// Why a database line could not be turned into an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// Line did not split into exactly three fields
    FieldCount(usize),

    /// One of the fields is empty or whitespace only (zero-based index)
    BlankField(usize),
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::FieldCount(n) => write!(f, "expected 3 fields, found {}", n),
            LineError::BlankField(i) => write!(f, "field {} is blank", i + 1),
        }
    }
}

/// Parse one database line
pub fn parse_line(line: &str, delimiter: char) -> Result<Entry, LineError> {
    let fields: Vec<&str> = line.split(delimiter).collect();
    if fields.len() != 3 {
        return Err(LineError::FieldCount(fields.len()));
    }
    if let Some(i) = fields.iter().position(|f| f.trim().is_empty()) {
        return Err(LineError::BlankField(i));
    }
    Ok(Entry::new(fields[0], fields[1], fields[2]))
}

/// Render entries as database lines, sorted lexicographically by the full line
pub fn render_lines<'a, I>(entries: I, delimiter: char) -> Vec<String>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut lines: Vec<String> = entries.into_iter().map(|e| e.render(delimiter)).collect();
    lines.sort_unstable();
    lines
}
