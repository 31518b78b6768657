//! Event-file reader.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use icerad_core::{NeutrinoEvent, SimEvent};

use crate::error::IoError;
use crate::format::{self, EventRecord, FileHeader, FileKind, FORMAT_VERSION, MAGIC};

/// Streaming reader for event files.
#[derive(Debug)]
pub struct EventFileReader {
    reader: BufReader<File>,
    path: PathBuf,
    header: FileHeader,
    n_records: u64,
    records_read: u64,
    offset: u64,
}

impl EventFileReader {
    /// Opens a file and validates the preamble.
    ///
    /// # Errors
    ///
    /// - [`IoError::Io`] on filesystem failures.
    /// - [`IoError::InvalidMagic`] when the file is not an event file.
    /// - [`IoError::UnsupportedVersion`] for containers from a newer
    ///   build.
    /// - [`IoError::Metadata`] for an unreadable header block.
    pub fn open(path: &Path) -> Result<Self, IoError> {
        let file = File::open(path).map_err(|e| IoError::io(path, e))?;
        let mut reader = BufReader::new(file);

        let mut magic = [0_u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| IoError::io(path, e))?;
        if magic != MAGIC {
            return Err(IoError::InvalidMagic { got: magic });
        }

        let version = reader
            .read_u16::<LittleEndian>()
            .map_err(|e| IoError::io(path, e))?;
        if version > FORMAT_VERSION {
            return Err(IoError::UnsupportedVersion {
                version,
                supported: FORMAT_VERSION,
            });
        }
        let _flags = reader
            .read_u16::<LittleEndian>()
            .map_err(|e| IoError::io(path, e))?;
        let n_records = reader
            .read_u64::<LittleEndian>()
            .map_err(|e| IoError::io(path, e))?;

        let header_len = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| IoError::io(path, e))? as usize;
        let mut header_json = vec![0_u8; header_len];
        reader
            .read_exact(&mut header_json)
            .map_err(|e| IoError::io(path, e))?;
        let header: FileHeader =
            serde_json::from_slice(&header_json).map_err(IoError::metadata)?;

        Ok(Self {
            reader,
            path: path.to_path_buf(),
            header,
            n_records,
            records_read: 0,
            offset: 20 + header_len as u64,
        })
    }

    /// The file header.
    #[must_use]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Number of records the file declares.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.n_records
    }

    /// Whether the file declares no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_records == 0
    }

    /// Reads the next raw record body, without decoding it. `None` after
    /// the declared record count.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Truncated`] when the file ends inside a
    /// record.
    pub fn next_raw_record(&mut self) -> Option<Result<Vec<u8>, IoError>> {
        if self.records_read >= self.n_records {
            return None;
        }
        let record_offset = self.offset;
        let len = match self.reader.read_u32::<LittleEndian>() {
            Ok(len) => len as usize,
            Err(_) => {
                return Some(Err(IoError::Truncated {
                    offset: record_offset,
                }))
            }
        };
        let mut body = vec![0_u8; len];
        if self.reader.read_exact(&mut body).is_err() {
            return Some(Err(IoError::Truncated {
                offset: record_offset,
            }));
        }
        self.records_read += 1;
        self.offset += 4 + len as u64;
        Some(Ok(body))
    }

    /// Reads and decodes the next record. `None` after the declared
    /// record count.
    pub fn next_record(&mut self) -> Option<Result<EventRecord, IoError>> {
        let record_offset = self.offset;
        match self.next_raw_record()? {
            Ok(body) => Some(format::decode_record(&body, record_offset)),
            Err(e) => Some(Err(e)),
        }
    }

    /// Reads a whole event-list file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WrongKind`] when the file holds simulation
    /// output, and decoding errors from the records.
    pub fn read_event_list(&mut self) -> Result<Vec<NeutrinoEvent>, IoError> {
        if self.header.kind != FileKind::EventList {
            return Err(IoError::WrongKind {
                expected: FileKind::EventList,
                got: self.header.kind,
            });
        }
        let mut events = Vec::with_capacity(self.n_records as usize);
        while let Some(record) = self.next_record() {
            match record? {
                EventRecord::Neutrino(n) => events.push(n),
                EventRecord::Sim(_) => {
                    return Err(IoError::CorruptRecord {
                        offset: self.offset,
                        message: "simulated event inside an event-list file".into(),
                    })
                }
            }
        }
        Ok(events)
    }

    /// Reads a whole simulation-output file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WrongKind`] when the file holds an event list,
    /// and decoding errors from the records.
    pub fn read_sim_output(&mut self) -> Result<Vec<SimEvent>, IoError> {
        if self.header.kind != FileKind::SimOutput {
            return Err(IoError::WrongKind {
                expected: FileKind::SimOutput,
                got: self.header.kind,
            });
        }
        let mut events = Vec::with_capacity(self.n_records as usize);
        while let Some(record) = self.next_record() {
            match record? {
                EventRecord::Sim(e) => events.push(e),
                EventRecord::Neutrino(_) => {
                    return Err(IoError::CorruptRecord {
                        offset: self.offset,
                        message: "bare neutrino inside a simulation-output file".into(),
                    })
                }
            }
        }
        Ok(events)
    }

    /// Path this reader was opened on.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
