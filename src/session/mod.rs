pub mod controller;
pub mod selection;

use crate::grid::Cell;
use crate::telemetry::TelemetrySnapshot;

pub use controller::SessionController;
pub use selection::{ClickOutcome, Selection, SelectionStateMachine};

/// What the console believes the robot is doing. This is never confirmed by
/// the robot itself, only by the backend's answers to our own commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationStatus {
    #[default]
    Idle,
    Requesting,
    Running,
    Stopping,
}

impl NavigationStatus {
    /// A start or stop command is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Requesting | Self::Stopping)
    }
}

/// Last path received from the backend, in travel order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathStore {
    cells: Vec<Cell>,
}

impl PathStore {
    pub fn replace(&mut self, cells: Vec<Cell>) {
        self.cells = cells;
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// State of the telemetry stream as last reported by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChannelStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closed {
        reason: Option<String>,
    },
    Failed {
        reason: String,
    },
}

impl ChannelStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

/// All mutable session state, owned by [`SessionController`]. Everything
/// outside the controller gets read-only access.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub(crate) selection: SelectionStateMachine,
    pub(crate) navigation: NavigationStatus,
    pub(crate) path: PathStore,
    pub(crate) telemetry: TelemetrySnapshot,
    pub(crate) channel: ChannelStatus,
    pub(crate) message: String,
    pub(crate) unconfirmed_motion: bool,
}

impl SessionState {
    pub fn selection(&self) -> Selection {
        self.selection.state()
    }

    pub fn navigation(&self) -> NavigationStatus {
        self.navigation
    }

    pub fn path(&self) -> &PathStore {
        &self.path
    }

    pub fn telemetry(&self) -> &TelemetrySnapshot {
        &self.telemetry
    }

    pub fn channel(&self) -> &ChannelStatus {
        &self.channel
    }

    /// The single operator-facing status line.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The display was reset while the robot was believed to be moving, and
    /// no stop has been confirmed since.
    pub fn unconfirmed_motion(&self) -> bool {
        self.unconfirmed_motion
    }
}
