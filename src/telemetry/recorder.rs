use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
    time::{SystemTime, UNIX_EPOCH},
};

use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_jsonlines::JsonLinesWriter;

use crate::errors::ConsoleError;

use super::{DetectionBox, TelemetryMessage};

/// One line of a telemetry recording. Frames are not stored, only their size.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub received_at_ms: u128,
    pub frame_bytes: Option<usize>,
    pub detections: Vec<DetectionBox>,
    pub ultrasonic_distance_cm: Option<f64>,
}

impl TelemetryRecord {
    pub fn new(message: &TelemetryMessage, received_at_ms: u128) -> Self {
        Self {
            received_at_ms,
            frame_bytes: message.frame.as_ref().map(|frame| frame.len()),
            detections: message.detections.clone(),
            ultrasonic_distance_cm: message.ultrasonic_distance_cm,
        }
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

/// Writes every message received on `telemetry_receiver` to `file` as JSON
/// lines until the sending side hangs up. Returns the number of records.
pub fn record_telemetry(
    file: &Path,
    telemetry_receiver: Receiver<TelemetryMessage>,
) -> Result<usize, ConsoleError> {
    let telemetry_file = File::create(file).map_err(|e| ConsoleError::RecorderError { source: e })?;
    write_records(JsonLinesWriter::new(BufWriter::new(telemetry_file)), telemetry_receiver)
}

fn write_records(
    mut writer: JsonLinesWriter<BufWriter<File>>,
    telemetry_receiver: Receiver<TelemetryMessage>,
) -> Result<usize, ConsoleError> {
    let mut records = 0;
    for message in &telemetry_receiver {
        writer
            .write(&TelemetryRecord::new(&message, now_ms()))
            .map_err(|e| ConsoleError::RecorderError { source: e })?;
        records += 1;
    }
    writer
        .flush()
        .map_err(|e| ConsoleError::RecorderError { source: e })?;
    Ok(records)
}

/// Starts [`record_telemetry`] on its own thread. The file is created before
/// returning so a bad path is reported to the caller.
pub fn spawn_recorder(
    file: PathBuf,
) -> Result<(Sender<TelemetryMessage>, JoinHandle<()>), ConsoleError> {
    let telemetry_file =
        File::create(&file).map_err(|e| ConsoleError::RecorderError { source: e })?;
    let (sender, receiver) = mpsc::channel::<TelemetryMessage>();

    let handle = thread::Builder::new()
        .name("telemetry-recorder".into())
        .spawn(move || {
            let writer = JsonLinesWriter::new(BufWriter::new(telemetry_file));
            match write_records(writer, receiver) {
                Ok(records) => info!("Recorded {} telemetry messages to {:?}", records, file),
                Err(e) => error!("Telemetry recording to {:?} stopped: {}", file, e),
            }
        })
        .map_err(|e| ConsoleError::RecorderError { source: e })?;

    Ok((sender, handle))
}
