//! The event-file container format.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic "IRF1"
//! 4       2     Format version
//! 6       2     Reserved flags (zero)
//! 8       8     Record count (patched on finish)
//! 16      4     Header JSON length H
//! 20      H     Header JSON (FileHeader)
//! ...           Records
//! ```
//!
//! Each record is one length-prefixed block:
//!
//! ```text
//! 0       4     Record length L (bytes after this field)
//! 4       1     Tag: 0 = neutrino, 1 = simulated event
//! 5       4     Metadata JSON length M
//! 9       M     Metadata JSON
//! ```
//!
//! For tag 1 the metadata is followed by the trace datasets:
//!
//! ```text
//! 0       4     Trace count T
//! per trace:
//! 0       4     Station id
//! 4       4     Channel id
//! 8       8     Sampling rate (f64, GHz)
//! 16      8     Start time (f64, ns)
//! 24      4     Sample count S
//! 28      8*S   Samples (f64, V)
//! ```
//!
//! The JSON blocks keep the format self-describing; the sample arrays
//! stay binary. Readers must be able to seek to the next record from the
//! length prefix alone, so unknown tags are skippable.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Cursor, Read, Write};

use icerad_core::{
    ChannelId, NeutrinoEvent, RunId, SimChannel, SimEvent, SimStation, StationId, Trace,
    TriggerRecord,
};

use crate::error::IoError;

/// Container magic.
pub const MAGIC: [u8; 4] = *b"IRF1";

/// Highest container version this build reads and the version it writes.
pub const FORMAT_VERSION: u16 = 2;

/// Record tag for a bare neutrino (event-list files).
pub(crate) const TAG_NEUTRINO: u8 = 0;

/// Record tag for a simulated event with traces.
pub(crate) const TAG_SIM_EVENT: u8 = 1;

/// What a file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Generated neutrino kinematics, input to the simulation
    EventList,
    /// Simulated events with detector responses
    SimOutput,
}

/// File-level attributes, stored as the header JSON block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    /// What the records are
    pub kind: FileKind,
    /// Run that produced the file, when applicable
    #[serde(default)]
    pub run_id: Option<RunId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Fingerprint of the detector description the file was simulated
    /// against; `None` for event lists
    #[serde(default)]
    pub detector_fingerprint: Option<String>,
    /// Freeform producer metadata (generator configuration, pipeline
    /// settings, tool version)
    #[serde(default)]
    pub metadata: Value,
}

impl FileHeader {
    /// Header for an event-list file.
    #[must_use]
    pub fn event_list(metadata: Value) -> Self {
        Self {
            kind: FileKind::EventList,
            run_id: None,
            created_at: Utc::now(),
            detector_fingerprint: None,
            metadata,
        }
    }

    /// Header for a simulation-output file.
    #[must_use]
    pub fn sim_output(run_id: RunId, detector_fingerprint: String, metadata: Value) -> Self {
        Self {
            kind: FileKind::SimOutput,
            run_id: Some(run_id),
            created_at: Utc::now(),
            detector_fingerprint: Some(detector_fingerprint),
            metadata,
        }
    }
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq)]
pub enum EventRecord {
    /// A bare neutrino from an event list
    Neutrino(NeutrinoEvent),
    /// A simulated event
    Sim(SimEvent),
}

/// JSON side of a simulated-event record; traces live in the binary
/// datasets that follow.
#[derive(Debug, Serialize, Deserialize)]
struct SimEventMeta {
    run_id: RunId,
    neutrino: NeutrinoEvent,
    created_at: DateTime<Utc>,
    stations: Vec<StationMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StationMeta {
    id: StationId,
    triggers: Vec<TriggerRecord>,
}

/// Encodes a neutrino record body (everything after the length prefix).
pub(crate) fn encode_neutrino(neutrino: &NeutrinoEvent) -> Result<Vec<u8>, IoError> {
    let json = serde_json::to_vec(neutrino).map_err(IoError::metadata)?;
    let mut body = Vec::with_capacity(json.len() + 5);
    body.push(TAG_NEUTRINO);
    body.extend_from_slice(&(json.len() as u32).to_le_bytes());
    body.extend_from_slice(&json);
    Ok(body)
}

/// Encodes a simulated-event record body.
pub(crate) fn encode_sim_event(event: &SimEvent) -> Result<Vec<u8>, IoError> {
    let meta = SimEventMeta {
        run_id: event.run_id,
        neutrino: event.neutrino.clone(),
        created_at: event.created_at,
        stations: event
            .stations
            .iter()
            .map(|s| StationMeta {
                id: s.id,
                triggers: s.triggers.clone(),
            })
            .collect(),
    };
    let json = serde_json::to_vec(&meta).map_err(IoError::metadata)?;

    let n_traces: usize = event.stations.iter().map(|s| s.channels.len()).sum();
    let mut body = Vec::with_capacity(json.len() + 64 * n_traces + 9);
    body.push(TAG_SIM_EVENT);
    body.extend_from_slice(&(json.len() as u32).to_le_bytes());
    body.extend_from_slice(&json);

    body.extend_from_slice(&(n_traces as u32).to_le_bytes());
    for station in &event.stations {
        for channel in &station.channels {
            body.extend_from_slice(&station.id.0.to_le_bytes());
            body.extend_from_slice(&channel.id.0.to_le_bytes());
            body.extend_from_slice(&channel.trace.sampling_rate().to_le_bytes());
            body.extend_from_slice(&channel.trace.start_time().to_le_bytes());
            body.extend_from_slice(&(channel.trace.len() as u32).to_le_bytes());
            for &sample in channel.trace.samples() {
                body.extend_from_slice(&sample.to_le_bytes());
            }
        }
    }
    Ok(body)
}

/// Decodes a record body produced by the encoders above. `offset` is the
/// file position of the record, for error reporting.
pub(crate) fn decode_record(body: &[u8], offset: u64) -> Result<EventRecord, IoError> {
    let mut cursor = Cursor::new(body);
    let tag = cursor
        .read_u8()
        .map_err(|_| IoError::Truncated { offset })?;
    let json_len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| IoError::Truncated { offset })? as usize;

    let mut json = vec![0_u8; json_len];
    cursor
        .read_exact(&mut json)
        .map_err(|_| IoError::Truncated { offset })?;

    match tag {
        TAG_NEUTRINO => {
            let neutrino: NeutrinoEvent =
                serde_json::from_slice(&json).map_err(IoError::metadata)?;
            Ok(EventRecord::Neutrino(neutrino))
        }
        TAG_SIM_EVENT => {
            let meta: SimEventMeta =
                serde_json::from_slice(&json).map_err(IoError::metadata)?;

            let n_traces = cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| IoError::Truncated { offset })?;

            let mut stations: Vec<SimStation> = meta
                .stations
                .iter()
                .map(|m| SimStation {
                    id: m.id,
                    channels: Vec::new(),
                    triggers: m.triggers.clone(),
                })
                .collect();

            for _ in 0..n_traces {
                let station_id = StationId(
                    cursor
                        .read_u32::<LittleEndian>()
                        .map_err(|_| IoError::Truncated { offset })?,
                );
                let channel_id = ChannelId(
                    cursor
                        .read_u32::<LittleEndian>()
                        .map_err(|_| IoError::Truncated { offset })?,
                );
                let sampling_rate = cursor
                    .read_f64::<LittleEndian>()
                    .map_err(|_| IoError::Truncated { offset })?;
                let start_time = cursor
                    .read_f64::<LittleEndian>()
                    .map_err(|_| IoError::Truncated { offset })?;
                let n_samples = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|_| IoError::Truncated { offset })?
                    as usize;
                let mut samples = vec![0.0_f64; n_samples];
                for sample in &mut samples {
                    *sample = cursor
                        .read_f64::<LittleEndian>()
                        .map_err(|_| IoError::Truncated { offset })?;
                }
                let trace = Trace::new(samples, sampling_rate, start_time)?;

                let station = stations
                    .iter_mut()
                    .find(|s| s.id == station_id)
                    .ok_or_else(|| IoError::CorruptRecord {
                        offset,
                        message: format!("trace references unknown station {station_id}"),
                    })?;
                station.channels.push(SimChannel {
                    id: channel_id,
                    trace,
                });
            }

            Ok(EventRecord::Sim(SimEvent {
                run_id: meta.run_id,
                neutrino: meta.neutrino,
                stations,
                created_at: meta.created_at,
            }))
        }
        tag => Err(IoError::UnknownRecordTag { tag, offset }),
    }
}

/// Writes the fixed-size preamble; returns nothing, the caller tracks
/// offsets from the documented layout.
pub(crate) fn write_preamble<W: Write>(
    writer: &mut W,
    header: &FileHeader,
) -> Result<(), std::io::Error> {
    writer.write_all(&MAGIC)?;
    writer.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    writer.write_u16::<LittleEndian>(0)?; // flags
    writer.write_u64::<LittleEndian>(0)?; // record count placeholder
    let header_json =
        serde_json::to_vec(header).expect("file header serializes to JSON");
    writer.write_u32::<LittleEndian>(header_json.len() as u32)?;
    writer.write_all(&header_json)?;
    Ok(())
}

/// Byte offset of the record-count field.
pub(crate) const RECORD_COUNT_OFFSET: u64 = 8;

#[cfg(test)]
mod tests {
    use super::*;
    use icerad_core::{Current, Direction, EventId, Flavor, Position};

    fn neutrino() -> NeutrinoEvent {
        NeutrinoEvent {
            id: EventId(7),
            vertex: Position::new(1.0, 2.0, -3.0),
            direction: Direction::new(1.2, 3.4).unwrap(),
            energy: 2.5e18,
            flavor: Flavor::Tau,
            current: Current::Neutral,
            inelasticity: 0.4,
        }
    }

    fn sim_event() -> SimEvent {
        let mut event = SimEvent::new(RunId::new(), neutrino());
        let mut station = SimStation::new(StationId(3));
        station.channels.push(SimChannel {
            id: ChannelId(0),
            trace: Trace::new(vec![0.0, 1.0, -1.0, 0.5], 2.0, 10.0).unwrap(),
        });
        station.channels.push(SimChannel {
            id: ChannelId(1),
            trace: Trace::new(vec![0.25; 8], 2.0, 10.0).unwrap(),
        });
        station.triggers.push(TriggerRecord {
            name: "t".into(),
            triggered: true,
            trigger_time: Some(11.0),
            channels: vec![ChannelId(0)],
        });
        event.stations.push(station);
        event
    }

    #[test]
    fn neutrino_record_round_trip() {
        let body = encode_neutrino(&neutrino()).unwrap();
        match decode_record(&body, 0).unwrap() {
            EventRecord::Neutrino(decoded) => assert_eq!(decoded, neutrino()),
            other => panic!("wrong record {other:?}"),
        }
    }

    #[test]
    fn sim_event_record_round_trip() {
        let original = sim_event();
        let body = encode_sim_event(&original).unwrap();
        match decode_record(&body, 0).unwrap() {
            EventRecord::Sim(decoded) => {
                assert_eq!(decoded.neutrino, original.neutrino);
                assert_eq!(decoded.stations.len(), 1);
                assert_eq!(decoded.stations[0].triggers, original.stations[0].triggers);
                assert_eq!(
                    decoded.stations[0].channels[0].trace,
                    original.stations[0].channels[0].trace
                );
                assert_eq!(
                    decoded.stations[0].channels[1].trace,
                    original.stations[0].channels[1].trace
                );
            }
            other => panic!("wrong record {other:?}"),
        }
    }

    #[test]
    fn truncated_record_is_detected() {
        let body = encode_sim_event(&sim_event()).unwrap();
        let cut = &body[..body.len() - 12];
        assert!(matches!(
            decode_record(cut, 99),
            Err(IoError::Truncated { offset: 99 })
        ));
    }

    #[test]
    fn unknown_tag_is_reported() {
        let mut body = encode_neutrino(&neutrino()).unwrap();
        body[0] = 200;
        assert!(matches!(
            decode_record(&body, 0),
            Err(IoError::UnknownRecordTag { tag: 200, .. })
        ));
    }
}
