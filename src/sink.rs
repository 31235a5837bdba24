//! Append-only CSV log of observation records.
//!
//! The file is opened and closed on every call; no handle is held across
//! capture cycles. A single writer process is assumed.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{IngestError, SinkCause};
use crate::record::{ObservationRecord, COLUMNS};

pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with the header row if it does not exist yet.
    ///
    /// Creation uses `create_new`, so the existence check and the create
    /// are one atomic step. An existing file is left untouched, whatever
    /// its header says. Returns `true` when the file was created.
    pub fn ensure_header(&self) -> Result<bool, IngestError> {
        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(self.fault(e)),
        };

        let mut wtr = csv::Writer::from_writer(file);
        wtr.write_record(COLUMNS).map_err(|e| self.fault(e))?;
        wtr.flush().map_err(|e| self.fault(e))?;
        log::info!("Created {} with header row", self.path.display());
        Ok(true)
    }

    /// Append one row per record, in order, with a single write. Returns
    /// the number of rows written.
    pub fn append(&self, records: &[ObservationRecord]) -> Result<usize, IngestError> {
        self.append_rows(records)
    }

    fn append_rows<T: Serialize>(&self, records: &[T]) -> Result<usize, IngestError> {
        self.ensure_header()?;

        // The whole batch is encoded before the file is touched, so a
        // failing record leaves no partial rows behind.
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        for record in records {
            wtr.serialize(record).map_err(|e| self.fault(e))?;
        }
        let rows = wtr.into_inner().map_err(|e| self.fault(e.into_error()))?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.fault(e))?;
        file.write_all(&rows).map_err(|e| self.fault(e))?;
        file.flush().map_err(|e| self.fault(e))?;

        log::debug!("Appended {} rows to {}", records.len(), self.path.display());
        Ok(records.len())
    }

    /// Read every row back with the fixed schema. Empty fields come back
    /// as `None`.
    #[allow(dead_code)]
    pub fn read_all(&self) -> Result<Vec<ObservationRecord>, IngestError> {
        let mut rdr = csv::Reader::from_path(&self.path).map_err(|e| self.fault(e))?;
        rdr.deserialize()
            .collect::<Result<Vec<ObservationRecord>, csv::Error>>()
            .map_err(|e| self.fault(e))
    }

    fn fault(&self, cause: impl Into<SinkCause>) -> IngestError {
        IngestError::sink(self.path.clone(), cause)
    }
}
