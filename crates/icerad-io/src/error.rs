//! Error types for event-file IO.

use std::path::PathBuf;
use thiserror::Error;

use icerad_core::TraceError;

use crate::format::FileKind;

/// A specialized `Result` type for IO operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors from reading, writing, or merging event files.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IoError {
    /// Filesystem-level failure
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Path the operation ran against
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File does not start with the container magic
    #[error("Not an event file: bad magic {got:02x?}")]
    InvalidMagic {
        /// The bytes found instead
        got: [u8; 4],
    },

    /// Container version not understood by this build
    #[error("Unsupported event-file version {version} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the file
        version: u16,
        /// Highest version this build reads
        supported: u16,
    },

    /// JSON metadata block failed to (de)serialize
    #[error("Metadata error: {source}")]
    Metadata {
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// File ends inside a record
    #[error("Event file truncated inside a record at byte {offset}")]
    Truncated {
        /// Offset of the broken record
        offset: u64,
    },

    /// Operation expects a different file kind
    #[error("Wrong file kind: expected {expected:?}, got {got:?}")]
    WrongKind {
        /// Kind the operation needs
        expected: FileKind,
        /// Kind found in the header
        got: FileKind,
    },

    /// Record tag byte not known to this build
    #[error("Unknown record tag {tag} at byte {offset}")]
    UnknownRecordTag {
        /// The tag byte
        tag: u8,
        /// Offset of the record
        offset: u64,
    },

    /// Record decoded but its content is inconsistent
    #[error("Corrupt record at byte {offset}: {message}")]
    CorruptRecord {
        /// Offset of the record
        offset: u64,
        /// What was inconsistent
        message: String,
    },

    /// Merge inputs disagree on kind or detector
    #[error("Incompatible merge inputs: {message}")]
    Incompatible {
        /// What disagreed
        message: String,
    },

    /// Merge needs at least one input
    #[error("No input files to merge")]
    NoInputs,

    /// Trace reconstruction failed while decoding a record
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),
}

impl IoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn metadata(source: serde_json::Error) -> Self {
        Self::Metadata { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_error_displays_bytes() {
        let err = IoError::InvalidMagic { got: *b"HDF5" };
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn wrong_kind_names_both_kinds() {
        let err = IoError::WrongKind {
            expected: FileKind::EventList,
            got: FileKind::SimOutput,
        };
        let msg = err.to_string();
        assert!(msg.contains("EventList"));
        assert!(msg.contains("SimOutput"));
    }
}
