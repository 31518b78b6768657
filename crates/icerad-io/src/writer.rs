//! Event-file writer.

use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use icerad_core::{NeutrinoEvent, SimEvent};

use crate::error::IoError;
use crate::format::{self, FileHeader, RECORD_COUNT_OFFSET};

/// Streaming writer for event files.
///
/// Records are appended one at a time; [`EventFileWriter::finish`]
/// patches the record count into the preamble. A writer that is dropped
/// without `finish` leaves a file with a zero record count, which
/// readers treat as empty — half-written files never parse as complete.
#[derive(Debug)]
pub struct EventFileWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    header: FileHeader,
    n_records: u64,
}

impl EventFileWriter {
    /// Creates a file and writes the preamble.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Io`] on filesystem failures.
    pub fn create(path: &Path, header: FileHeader) -> Result<Self, IoError> {
        let file = File::create(path).map_err(|e| IoError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        format::write_preamble(&mut writer, &header).map_err(|e| IoError::io(path, e))?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            header,
            n_records: 0,
        })
    }

    /// The header this file was created with.
    #[must_use]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Records appended so far.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.n_records
    }

    /// Whether no record has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_records == 0
    }

    /// Appends a bare neutrino record (event-list files).
    ///
    /// # Errors
    ///
    /// Returns [`IoError`] on serialization or filesystem failures.
    pub fn append_neutrino(&mut self, neutrino: &NeutrinoEvent) -> Result<(), IoError> {
        let body = format::encode_neutrino(neutrino)?;
        self.append_raw_record(&body)
    }

    /// Appends a simulated event record.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`] on serialization or filesystem failures.
    pub fn append_event(&mut self, event: &SimEvent) -> Result<(), IoError> {
        let body = format::encode_sim_event(event)?;
        self.append_raw_record(&body)
    }

    /// Appends an already-encoded record body. The body must follow the
    /// container record layout; the merge utility uses this to pass
    /// records through without decoding them.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Io`] on filesystem failures.
    pub fn append_raw_record(&mut self, body: &[u8]) -> Result<(), IoError> {
        self.writer
            .write_u32::<LittleEndian>(body.len() as u32)
            .and_then(|()| self.writer.write_all(body))
            .map_err(|e| IoError::io(&self.path, e))?;
        self.n_records += 1;
        Ok(())
    }

    /// Patches the record count and flushes the file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Io`] on filesystem failures.
    pub fn finish(mut self) -> Result<u64, IoError> {
        self.writer
            .seek(SeekFrom::Start(RECORD_COUNT_OFFSET))
            .and_then(|_| self.writer.write_u64::<LittleEndian>(self.n_records))
            .and_then(|()| self.writer.flush())
            .map_err(|e| IoError::io(&self.path, e))?;
        Ok(self.n_records)
    }
}

/// Writes a complete event-list file in one call.
///
/// # Errors
///
/// Returns [`IoError`] on serialization or filesystem failures.
pub fn write_event_list(
    path: &Path,
    header: FileHeader,
    events: &[NeutrinoEvent],
) -> Result<u64, IoError> {
    let mut writer = EventFileWriter::create(path, header)?;
    for event in events {
        writer.append_neutrino(event)?;
    }
    writer.finish()
}

/// Writes a complete simulation-output file in one call.
///
/// # Errors
///
/// Returns [`IoError`] on serialization or filesystem failures.
pub fn write_sim_output(
    path: &Path,
    header: FileHeader,
    events: &[SimEvent],
) -> Result<u64, IoError> {
    let mut writer = EventFileWriter::create(path, header)?;
    for event in events {
        writer.append_event(event)?;
    }
    writer.finish()
}
