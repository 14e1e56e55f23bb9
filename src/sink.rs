use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;

use crate::record::{ListingRecord, COLUMNS};
use crate::{Error, Result};

/// Append-only CSV file with a fixed column order.
/// The header is written once, when the file is created.
/// Every failure comes back as [`Error::Sink`].
#[derive(Debug, Clone)]
pub struct RecordSink {
    path: PathBuf,
}

impl RecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with a header row unless it already exists.
    /// Returns whether the file was created.
    pub fn ensure_initialized(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.sink_error(e.into()))?;
            }
        }

        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .map_err(|e| self.sink_error(e))?;
        wtr.write_record(COLUMNS).map_err(|e| self.sink_error(e))?;
        wtr.flush().map_err(|e| self.sink_error(e.into()))?;
        Ok(true)
    }

    /// Appends the batch after whatever the file already holds and returns the row count.
    pub fn append(&self, records: &[ListingRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.sink_error(e.into()))?;
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
        for record in records {
            wtr.serialize(record).map_err(|e| self.sink_error(e))?;
        }
        wtr.flush().map_err(|e| self.sink_error(e.into()))?;
        Ok(records.len())
    }

    fn sink_error(&self, source: csv::Error) -> Error {
        Error::Sink {
            path: self.path.display().to_string(),
            source,
        }
    }
}
