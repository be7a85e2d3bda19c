//! Database Writer
//!
//! Rewrites the database file and exports entries as CSV.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::entry::Entry;
use crate::error::{Result, WordbankError};

/// Writes the database file
pub struct DbWriter;

impl DbWriter {
    /// Replace the contents of `path` with `lines`
    ///
    /// Lines go to a sibling temp file which is synced and then renamed over
    /// `path`, so readers never observe a half-written database.
    pub fn write(path: &Path, lines: &[String]) -> Result<()> {
        let tmp_path = temp_path(path)?;

        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            for line in lines {
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::debug!("Wrote {} lines to {}", lines.len(), path.display());
        Ok(())
    }
}

/// Write `entries` to `path` as comma-separated values, in the order given
pub fn export_csv(entries: &[Entry], path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in entries {
        let [key, reading, meaning] = entry.fields();
        writeln!(
            writer,
            "{},{},{}",
            csv_field(key),
            csv_field(reading),
            csv_field(meaning)
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_field(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        WordbankError::InvalidArgument(format!("not a file path: {}", path.display()))
    })?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}
