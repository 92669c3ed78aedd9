//! The output CSV doubles as the progress record.
//!
//! Any source text present in the `context` column is done; anything absent is
//! pending. Rows are only ever appended, one durable open/write/sync/close per
//! row, so a crash loses at most the row in flight.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fixed output header: source text, row identifier, translated text
pub const OUTPUT_HEADER: [&str; 3] = ["context", "id", "context_my"];

/// Column read back on startup to find completed rows
const KEY_COLUMN: &str = "context";

/// One completed translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedRow {
    pub source_text: String,
    pub id: String,
    pub translated_text: String,
}

/// Append-only access to the output CSV
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    /// Open or create the output file and return the set of completed source texts.
    ///
    /// A missing or zero-length file is (re)created with the header. An existing
    /// file whose content cannot be read is logged and treated as having no
    /// progress. A path that cannot be created or opened for append is an error,
    /// so nothing is translated without somewhere to put it.
    pub fn bootstrap(path: impl Into<PathBuf>) -> Result<(Self, HashSet<String>)> {
        let path = path.into();
        let store = Self { path };

        // Only a missing or zero-length file gets a fresh header; any other
        // stat failure must not reach File::create, which would truncate.
        let needs_header = match std::fs::metadata(&store.path) {
            Ok(metadata) => metadata.len() == 0,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                warn!(
                    "Could not stat existing output file {}: {}",
                    store.path.display(),
                    e
                );
                false
            }
        };

        if needs_header {
            store.create_with_header()?;
            info!("Created new output file: {}", store.path.display());
            return Ok((store, HashSet::new()));
        }

        store.check_appendable()?;

        let completed = match read_completed(&store.path) {
            Ok(completed) => {
                info!(
                    "Found existing output file with {} translated rows",
                    completed.len()
                );
                if let Err(e) = ensure_trailing_newline(&store.path) {
                    warn!(
                        "Could not terminate last line of {}: {:#}",
                        store.path.display(),
                        e
                    );
                }
                completed
            }
            Err(e) => {
                warn!(
                    "Error reading existing output file {}: {:#}. Continuing without prior progress",
                    store.path.display(),
                    e
                );
                HashSet::new()
            }
        };

        Ok((store, completed))
    }

    /// Append one row and sync it to disk before returning.
    pub fn append(&self, row: &TranslatedRow) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {} for append", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record([
            row.source_text.as_str(),
            row.id.as_str(),
            row.translated_text.as_str(),
        ])?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_appendable(&self) -> Result<()> {
        OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| {
                format!("Output file {} is not writable", self.path.display())
            })?;
        Ok(())
    }

    fn create_with_header(&self) -> Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("Error creating output file {}", self.path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(OUTPUT_HEADER)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}

/// Distinct values of the key column
fn read_completed(path: &Path) -> Result<HashSet<String>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let key_idx = reader
        .headers()?
        .iter()
        .position(|h| h == KEY_COLUMN)
        .with_context(|| format!("no '{}' column", KEY_COLUMN))?;

    let mut completed = HashSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(key) = record.get(key_idx) {
            completed.insert(key.to_string());
        }
    }
    Ok(completed)
}

/// A hand-edited file may lack the final newline; the next append would
/// otherwise be glued onto the last record.
fn ensure_trailing_newline(path: &Path) -> Result<()> {
    let mut file = OpenOptions::new().read(true).append(true).open(path)?;
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    Ok(())
}
