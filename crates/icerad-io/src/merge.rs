//! Merging event files.
//!
//! Inputs must agree on file kind and detector fingerprint. Records pass
//! through as raw bodies — no decode, no re-encode — and land in the
//! output in input-file order. With more than one thread, each input
//! file gets a reader thread feeding a bounded channel; the channel
//! capacities are derived from the memory budget, so the writer applies
//! backpressure instead of buffering whole files.

use crossbeam_channel::bounded;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::IoError;
use crate::format::FileHeader;
use crate::reader::EventFileReader;
use crate::writer::EventFileWriter;

/// Configuration of a merge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeConfig {
    /// Concurrent reader threads; 1 selects the sequential path
    pub threads: usize,
    /// Upper bound on bytes buffered across all reader channels
    pub memory_limit_bytes: u64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            memory_limit_bytes: 4 * 1024 * 1024 * 1024,
        }
    }
}

impl MergeConfig {
    fn validate(&self) -> Result<(), IoError> {
        if self.threads == 0 {
            return Err(IoError::Incompatible {
                message: "threads must be >= 1".into(),
            });
        }
        if self.memory_limit_bytes < 1024 * 1024 {
            return Err(IoError::Incompatible {
                message: format!(
                    "memory limit {} bytes is below the 1 MiB minimum",
                    self.memory_limit_bytes
                ),
            });
        }
        Ok(())
    }
}

/// Summary of a finished merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Input files merged
    pub n_inputs: usize,
    /// Records written to the output
    pub n_records: u64,
    /// The output path
    pub output: PathBuf,
}

struct InputInfo {
    path: PathBuf,
    n_records: u64,
    file_size: u64,
}

/// Checks headers for compatibility and returns the header the output
/// inherits plus per-file bookkeeping.
fn inspect_inputs(inputs: &[PathBuf]) -> Result<(FileHeader, Vec<InputInfo>), IoError> {
    let mut infos = Vec::with_capacity(inputs.len());
    let mut merged_header: Option<FileHeader> = None;

    for path in inputs {
        let reader = EventFileReader::open(path)?;
        let header = reader.header();

        match &merged_header {
            None => merged_header = Some(header.clone()),
            Some(first) => {
                if first.kind != header.kind {
                    return Err(IoError::Incompatible {
                        message: format!(
                            "'{}' holds {:?} records, the first input holds {:?}",
                            path.display(),
                            header.kind,
                            first.kind
                        ),
                    });
                }
                if first.detector_fingerprint != header.detector_fingerprint {
                    return Err(IoError::Incompatible {
                        message: format!(
                            "'{}' was simulated against a different detector",
                            path.display()
                        ),
                    });
                }
            }
        }

        let file_size = std::fs::metadata(path)
            .map_err(|e| IoError::io(path, e))?
            .len();
        infos.push(InputInfo {
            path: path.clone(),
            n_records: reader.len(),
            file_size,
        });
    }

    let mut header = merged_header.expect("at least one input");
    header.created_at = chrono::Utc::now();
    Ok((header, infos))
}

/// Channel capacity for one reader so that `threads` concurrent readers
/// stay inside the memory budget.
fn channel_capacity(info: &InputInfo, config: &MergeConfig) -> usize {
    if info.n_records == 0 {
        return 1;
    }
    let avg_record = (info.file_size / info.n_records).max(1);
    let per_reader = config.memory_limit_bytes / config.threads as u64;
    (per_reader / avg_record).clamp(1, 4096) as usize
}

/// Merges `inputs` into `output`.
///
/// # Errors
///
/// - [`IoError::NoInputs`] for an empty input list.
/// - [`IoError::Incompatible`] when inputs disagree on kind or detector,
///   or the configuration is inconsistent.
/// - Reader/writer errors from the underlying files.
pub fn merge_files(
    inputs: &[PathBuf],
    output: &Path,
    config: &MergeConfig,
) -> Result<MergeReport, IoError> {
    config.validate()?;
    if inputs.is_empty() {
        return Err(IoError::NoInputs);
    }

    let (header, infos) = inspect_inputs(inputs)?;
    let expected: u64 = infos.iter().map(|i| i.n_records).sum();
    info!(
        n_inputs = inputs.len(),
        expected_records = expected,
        threads = config.threads,
        "merging event files"
    );

    let mut writer = EventFileWriter::create(output, header)?;

    if config.threads <= 1 {
        for info in &infos {
            let mut reader = EventFileReader::open(&info.path)?;
            while let Some(record) = reader.next_raw_record() {
                writer.append_raw_record(&record?)?;
            }
        }
    } else {
        // waves of at most `threads` files; records drain in file order
        std::thread::scope(|scope| -> Result<(), IoError> {
            for wave in infos.chunks(config.threads) {
                let mut receivers = Vec::with_capacity(wave.len());
                for info in wave {
                    let (tx, rx) = bounded::<Result<Vec<u8>, IoError>>(
                        channel_capacity(info, config),
                    );
                    receivers.push(rx);
                    let path = info.path.clone();
                    scope.spawn(move || {
                        let mut reader = match EventFileReader::open(&path) {
                            Ok(reader) => reader,
                            Err(e) => {
                                let _ = tx.send(Err(e));
                                return;
                            }
                        };
                        while let Some(record) = reader.next_raw_record() {
                            let failed = record.is_err();
                            if tx.send(record).is_err() || failed {
                                // writer gone or the file broke mid-read
                                return;
                            }
                        }
                    });
                }
                for rx in receivers {
                    for record in rx {
                        writer.append_raw_record(&record?)?;
                    }
                }
            }
            Ok(())
        })?;
    }

    let n_records = writer.finish()?;
    info!(n_records, output = %output.display(), "merge finished");
    Ok(MergeReport {
        n_inputs: inputs.len(),
        n_records,
        output: output.to_path_buf(),
    })
}
