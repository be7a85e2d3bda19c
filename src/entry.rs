//! Entry
//!
//! The immutable three-field record managed by the store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One vocabulary record: a word (the primary key), its reading, and its meaning.
///
/// Equality and hashing cover all three fields. Empty strings are allowed here;
/// the file loader is what filters them out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    key: String,
    reading: String,
    meaning: String,
}

impl Entry {
    /// Create a new entry
    pub fn new(
        key: impl Into<String>,
        reading: impl Into<String>,
        meaning: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            reading: reading.into(),
            meaning: meaning.into(),
        }
    }

    /// The primary key (the word itself)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The reading / annotation
    pub fn reading(&self) -> &str {
        &self.reading
    }

    /// The meaning
    pub fn meaning(&self) -> &str {
        &self.meaning
    }

    /// All three fields in file order
    pub fn fields(&self) -> [&str; 3] {
        [&self.key, &self.reading, &self.meaning]
    }

    /// Render as `key<d>reading<d>meaning`
    pub fn render(&self, delimiter: char) -> String {
        let mut line =
            String::with_capacity(self.key.len() + self.reading.len() + self.meaning.len() + 2);
        line.push_str(&self.key);
        line.push(delimiter);
        line.push_str(&self.reading);
        line.push(delimiter);
        line.push_str(&self.meaning);
        line
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.key, self.reading, self.meaning)
    }
}
