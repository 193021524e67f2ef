// Error types for the robot console

use std::{fmt, io};

use snafu::Snafu;

/// Local state that made an operation impossible before anything was sent
/// to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionKind {
    MissingEndpoints,
    DegenerateSelection,
    NothingToStop,
    CommandInFlight,
    NavigationActive,
}

impl fmt::Display for PreconditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingEndpoints => "missing endpoints",
            Self::DegenerateSelection => "degenerate selection",
            Self::NothingToStop => "nothing to stop",
            Self::CommandInFlight => "command in flight",
            Self::NavigationActive => "navigation already active",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConsoleError {
    // Operations rejected by the local session state
    #[snafu(display("Precondition failed: {kind}"))]
    Precondition { kind: PreconditionKind },

    // Navigation backend errors, message is already operator-facing
    #[snafu(display("{message}"))]
    Transport { message: String },
    #[snafu(display("Navigation worker is not running"))]
    WorkerUnavailable,
    #[snafu(display("Could not start navigation worker"))]
    WorkerSpawn { source: io::Error },
    #[snafu(display("Could not build HTTP client: {source}"))]
    HttpClient { source: reqwest::Error },

    // Telemetry stream errors
    #[snafu(display("Could not decode telemetry message: {source}"))]
    Decode { source: serde_json::Error },
    #[snafu(display("Telemetry frame is not valid base64: {source}"))]
    InvalidFrame { source: base64::DecodeError },
    #[snafu(display("Telemetry channel error: {reason}"))]
    Channel { reason: String },

    // Telemetry recorder errors
    #[snafu(display("Error writing telemetry recording"))]
    RecorderError { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
    #[snafu(display("Invalid grid in config file: {reason}"))]
    InvalidGrid { reason: String },

    // Window errors
    #[snafu(display("Could not open console window: {reason}"))]
    Gui { reason: String },

    // User input validation errors
    #[snafu(display("Invalid cell '{value}', expected ROW,COL"))]
    InvalidCellArgument { value: String },
}

impl ConsoleError {
    pub fn precondition(kind: PreconditionKind) -> Self {
        Self::Precondition { kind }
    }

    /// The precondition that rejected the operation, if that is what happened.
    pub fn precondition_kind(&self) -> Option<PreconditionKind> {
        match self {
            Self::Precondition { kind } => Some(*kind),
            _ => None,
        }
    }
}
