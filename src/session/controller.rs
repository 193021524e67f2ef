use std::{sync::mpsc::TryRecvError, time::Duration};

use log::{debug, info, warn};

use crate::errors::{ConsoleError, PreconditionKind};
use crate::grid::{Cell, GridModel};
use crate::navigation::{NavigationClient, NavigationCommand, NavigationOutcome, NavigationRequest};
use crate::render::{MapFrame, MapRenderer};
use crate::telemetry::{TelemetryEvent, TelemetryLink};

use super::{ChannelStatus, ClickOutcome, NavigationStatus, SessionState};

const MSG_MISSING_ENDPOINTS: &str = "Please select a start and an end point!";
const MSG_DEGENERATE_SELECTION: &str = "Start and end points must be different!";
const MSG_START_SENT: &str = "Sending navigation request...";
const MSG_STARTED: &str = "Robot started moving!";
const MSG_STOP_SENT: &str = "Sending stop request...";
const MSG_STOPPED: &str = "Robot stopped!";
const MSG_NOTHING_TO_STOP: &str = "Nothing to stop: the robot is not running.";
const MSG_COMMAND_IN_FLIGHT: &str = "Still waiting for the backend, please wait.";
const MSG_NAVIGATION_ACTIVE: &str = "The robot is already navigating. Stop it first.";
const MSG_RESET: &str = "Grid reset. Select a start and an end point again.";
const MSG_RESET_UNCONFIRMED: &str =
    "Grid reset. The robot was not told to stop, press Stop if it is still moving.";
const MSG_LATE_START: &str =
    "A navigation request finished after the reset, the robot may be moving.";

/// A command sent to the backend whose outcome has not been applied yet.
#[derive(Debug, Clone, Copy)]
struct PendingCommand {
    ticket: u64,
    prior: NavigationStatus,
}

/// Owns the session state and is the only thing that mutates it.
///
/// Every mutation happens in reaction to one of three events: an operator
/// action (click, start, stop, reset), a navigation outcome, or a telemetry
/// event. Outcomes and telemetry are queued by their worker threads and
/// applied in [`SessionController::pump`], on the same thread as the
/// operator actions, so no state is ever touched concurrently.
///
/// After every change to the selection or the path the map is re-rendered
/// and [`SessionController::map_revision`] moves; applied telemetry moves
/// [`SessionController::telemetry_revision`] once per batch.
pub struct SessionController {
    grid: GridModel,
    state: SessionState,
    renderer: MapRenderer,
    map_frame: MapFrame,
    map_revision: u64,
    telemetry_revision: u64,
    navigation: NavigationClient,
    telemetry: Option<TelemetryLink>,
    pending: Option<PendingCommand>,
    next_ticket: u64,
}

impl SessionController {
    pub fn new(grid: GridModel, navigation: NavigationClient) -> Self {
        let renderer = MapRenderer::default();
        let state = SessionState::default();
        let map_frame = renderer.render(&grid, state.path(), &state.selection());
        Self {
            grid,
            state,
            renderer,
            map_frame,
            map_revision: 0,
            telemetry_revision: 0,
            navigation,
            telemetry: None,
            pending: None,
            next_ticket: 1,
        }
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn map_frame(&self) -> &MapFrame {
        &self.map_frame
    }

    pub fn map_revision(&self) -> u64 {
        self.map_revision
    }

    pub fn telemetry_revision(&self) -> u64 {
        self.telemetry_revision
    }

    /// Start is offered only while idle; the selection is checked on press.
    pub fn can_start(&self) -> bool {
        self.state.navigation == NavigationStatus::Idle
    }

    pub fn can_stop(&self) -> bool {
        match self.state.navigation {
            NavigationStatus::Running => true,
            NavigationStatus::Idle => self.state.unconfirmed_motion,
            NavigationStatus::Requesting | NavigationStatus::Stopping => false,
        }
    }

    /// Routes a pointer position on the map surface to a cell click.
    pub fn click_at(&mut self, x: f32, y: f32) -> ClickOutcome {
        match self.grid.cell_at(x, y) {
            Some(cell) => self.click(cell),
            None => ClickOutcome::Ignored,
        }
    }

    pub fn click(&mut self, cell: Cell) -> ClickOutcome {
        let outcome = self.state.selection.click(&self.grid, cell);
        match outcome {
            ClickOutcome::StartChosen(start) => {
                self.state.message = format!("Start point selected: {start}");
                self.publish_map();
            }
            ClickOutcome::EndChosen(end) => {
                self.state.message = format!("End point selected: {end}");
                self.publish_map();
            }
            ClickOutcome::Ignored => debug!("Ignoring click on {}", cell),
        }
        outcome
    }

    /// Sends a start command for the selected endpoints. Nothing is sent
    /// unless the robot is idle and both endpoints are chosen and distinct.
    pub fn request_navigation_start(&mut self) -> Result<(), ConsoleError> {
        match self.state.navigation {
            NavigationStatus::Idle => {}
            NavigationStatus::Running => {
                return Err(self.reject(PreconditionKind::NavigationActive));
            }
            NavigationStatus::Requesting | NavigationStatus::Stopping => {
                return Err(self.reject(PreconditionKind::CommandInFlight));
            }
        }

        let (origin, destination) = match self.state.selection.navigation_endpoints() {
            Ok(endpoints) => endpoints,
            Err(e) => {
                if let Some(kind) = e.precondition_kind() {
                    self.state.message = precondition_message(kind).to_string();
                }
                return Err(e);
            }
        };

        self.dispatch(NavigationCommand::Start {
            origin,
            destination,
        })?;
        self.state.navigation = NavigationStatus::Requesting;
        self.state.message = MSG_START_SENT.to_string();
        Ok(())
    }

    /// Sends a stop command. Allowed while running, or while idle after a
    /// reset that left the robot possibly moving.
    pub fn request_navigation_stop(&mut self) -> Result<(), ConsoleError> {
        match self.state.navigation {
            NavigationStatus::Requesting | NavigationStatus::Stopping => {
                return Err(self.reject(PreconditionKind::CommandInFlight));
            }
            NavigationStatus::Idle if !self.state.unconfirmed_motion => {
                return Err(self.reject(PreconditionKind::NothingToStop));
            }
            NavigationStatus::Idle | NavigationStatus::Running => {}
        }

        self.dispatch(NavigationCommand::Stop)?;
        self.state.navigation = NavigationStatus::Stopping;
        self.state.message = MSG_STOP_SENT.to_string();
        Ok(())
    }

    /// Clears selection, path and navigation status. This is not a stop
    /// command: if the robot was believed to be moving, that is remembered
    /// as unconfirmed motion until a stop succeeds.
    pub fn reset(&mut self) {
        let was_moving =
            self.state.navigation != NavigationStatus::Idle || self.state.unconfirmed_motion;
        if let Some(pending) = self.pending.take() {
            debug!("Reset discards outcome of ticket {}", pending.ticket);
        }

        self.state.selection.reset();
        self.state.path.clear();
        self.state.navigation = NavigationStatus::Idle;
        self.state.unconfirmed_motion = was_moving;
        let message = if was_moving {
            warn!("Session reset while the robot may still be moving");
            MSG_RESET_UNCONFIRMED
        } else {
            MSG_RESET
        };
        self.state.message = message.to_string();
        self.publish_map();
    }

    /// Swaps in a new telemetry stream. The previous one, if any, is closed.
    /// The last snapshot stays on screen until the new stream delivers.
    pub fn attach_telemetry(&mut self, link: TelemetryLink) {
        self.telemetry = Some(link);
        self.state.channel = ChannelStatus::Connecting;
    }

    /// Closes the telemetry stream, if one is attached.
    pub fn detach_telemetry(&mut self) {
        if self.telemetry.take().is_some() {
            self.state.channel = ChannelStatus::Disconnected;
        }
    }

    /// Applies everything the workers have queued since the last call.
    /// Returns true when any state changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Some(outcome) = self.navigation.poll() {
            self.apply_navigation_outcome(outcome);
            changed = true;
        }
        changed | self.drain_telemetry()
    }

    /// Blocks up to `timeout` for the next navigation outcome and applies it.
    /// Returns false if nothing arrived in time.
    pub fn wait_for_navigation(&mut self, timeout: Duration) -> bool {
        match self.navigation.wait(timeout) {
            Some(outcome) => {
                self.apply_navigation_outcome(outcome);
                true
            }
            None => false,
        }
    }

    fn reject(&mut self, kind: PreconditionKind) -> ConsoleError {
        debug!("Rejected locally: {}", kind);
        self.state.message = precondition_message(kind).to_string();
        ConsoleError::precondition(kind)
    }

    fn dispatch(&mut self, command: NavigationCommand) -> Result<(), ConsoleError> {
        let ticket = self.next_ticket;
        if let Err(e) = self.navigation.submit(NavigationRequest { ticket, command }) {
            self.state.message = e.to_string();
            return Err(e);
        }
        self.next_ticket += 1;
        self.pending = Some(PendingCommand {
            ticket,
            prior: self.state.navigation,
        });
        Ok(())
    }

    fn apply_navigation_outcome(&mut self, outcome: NavigationOutcome) {
        let pending = match self.pending {
            Some(pending) if pending.ticket == outcome.ticket() => pending,
            _ => {
                self.apply_stale_outcome(outcome);
                return;
            }
        };
        self.pending = None;

        match outcome {
            NavigationOutcome::Started {
                result: Ok(path), ..
            } => {
                info!("Navigation started with a {} cell path", path.len());
                self.state.path.replace(path);
                self.state.navigation = NavigationStatus::Running;
                self.state.unconfirmed_motion = false;
                self.state.message = MSG_STARTED.to_string();
                self.publish_map();
            }
            NavigationOutcome::Stopped { result: Ok(()), .. } => {
                info!("Navigation stopped");
                self.state.navigation = NavigationStatus::Idle;
                self.state.unconfirmed_motion = false;
                self.state.message = MSG_STOPPED.to_string();
            }
            NavigationOutcome::Started { result: Err(e), .. }
            | NavigationOutcome::Stopped { result: Err(e), .. } => {
                warn!("Navigation command failed: {}", e);
                self.state.navigation = pending.prior;
                self.state.message = e.to_string();
            }
        }
    }

    fn apply_stale_outcome(&mut self, outcome: NavigationOutcome) {
        match outcome {
            NavigationOutcome::Started {
                ticket,
                result: Ok(_),
            } => {
                warn!("Start (ticket {}) succeeded after reset", ticket);
                self.state.unconfirmed_motion = true;
                self.state.message = MSG_LATE_START.to_string();
            }
            NavigationOutcome::Stopped {
                ticket,
                result: Ok(()),
            } => {
                info!("Stop (ticket {}) confirmed after reset", ticket);
                self.state.unconfirmed_motion = false;
            }
            NavigationOutcome::Started {
                ticket,
                result: Err(e),
            }
            | NavigationOutcome::Stopped {
                ticket,
                result: Err(e),
            } => debug!("Discarding failed outcome of ticket {}: {}", ticket, e),
        }
    }

    fn drain_telemetry(&mut self) -> bool {
        let Some(link) = &self.telemetry else {
            return false;
        };

        let mut status_changed = false;
        let mut worker_gone = false;
        loop {
            match link.events().try_recv() {
                Ok(TelemetryEvent::Connected) => {
                    self.state.channel = ChannelStatus::Connected;
                    status_changed = true;
                }
                Ok(TelemetryEvent::Closed { reason }) => {
                    self.state.channel = ChannelStatus::Closed { reason };
                    status_changed = true;
                }
                Ok(TelemetryEvent::Failed { reason }) => {
                    self.state.channel = ChannelStatus::Failed { reason };
                    status_changed = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    worker_gone = true;
                    break;
                }
            }
        }

        // only the newest message is ever applied
        let applied = match link.take_latest() {
            Some((message, received)) => {
                if received > 1 {
                    debug!("Applying newest of {} telemetry messages", received);
                }
                self.state.telemetry.apply_latest(message, received);
                self.telemetry_revision += 1;
                true
            }
            None => false,
        };

        if worker_gone {
            self.telemetry = None;
            if self.state.channel.is_live() {
                self.state.channel = ChannelStatus::Closed { reason: None };
                status_changed = true;
            }
        }
        status_changed || applied
    }

    fn publish_map(&mut self) {
        self.map_frame =
            self.renderer
                .render(&self.grid, self.state.path(), &self.state.selection());
        self.map_revision += 1;
    }
}

fn precondition_message(kind: PreconditionKind) -> &'static str {
    match kind {
        PreconditionKind::MissingEndpoints => MSG_MISSING_ENDPOINTS,
        PreconditionKind::DegenerateSelection => MSG_DEGENERATE_SELECTION,
        PreconditionKind::NothingToStop => MSG_NOTHING_TO_STOP,
        PreconditionKind::CommandInFlight => MSG_COMMAND_IN_FLIGHT,
        PreconditionKind::NavigationActive => MSG_NAVIGATION_ACTIVE,
    }
}
