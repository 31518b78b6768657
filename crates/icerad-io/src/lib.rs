//! # icerad IO
//!
//! The event-file container of the icerad suite and its tooling:
//!
//! - [`format`] — the `IRF1` hierarchical binary container: JSON
//!   attribute blocks for self-description, little-endian f64 datasets
//!   for the traces.
//! - [`writer`] / [`reader`] — streaming record IO with a patched
//!   record count, so half-written files never parse as complete.
//! - [`merge`] — combining output files, sequentially or with one
//!   bounded reader thread per file under a memory budget.

#![forbid(unsafe_code)]

pub mod error;
pub mod format;
pub mod merge;
pub mod reader;
pub mod writer;

pub use error::{IoError, IoResult};
pub use format::{EventRecord, FileHeader, FileKind, FORMAT_VERSION, MAGIC};
pub use merge::{merge_files, MergeConfig, MergeReport};
pub use reader::EventFileReader;
pub use writer::{write_event_list, write_sim_output, EventFileWriter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
