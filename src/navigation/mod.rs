pub mod http;

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
    thread,
    time::Duration,
};

use log::{debug, info, warn};

use crate::errors::ConsoleError;
use crate::grid::Cell;

pub use http::HttpNavigationBackend;

/// A backend that can start and stop the robot along a planned path.
///
/// The backend owns path planning and motion control; the console only
/// asks for a route between two cells and reads back the ordered cells of
/// the route it chose. Implementations block until the backend answers and
/// are driven from the [`NavigationClient`] worker thread, never from the UI
/// thread.
///
/// Errors returned from either call must be [`ConsoleError::Transport`]
/// carrying a message that can be shown to the operator as-is.
pub trait NavigationBackend: Send + 'static {
    /// Starts the robot on a route from `origin` to `destination` and returns
    /// the route. The path is trusted to avoid obstacles.
    fn start_navigation(
        &mut self,
        origin: Cell,
        destination: Cell,
    ) -> Result<Vec<Cell>, ConsoleError>;

    /// Stops the robot.
    fn stop_navigation(&mut self) -> Result<(), ConsoleError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationCommand {
    Start { origin: Cell, destination: Cell },
    Stop,
}

/// A command tagged with the ticket its outcome will carry back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationRequest {
    pub ticket: u64,
    pub command: NavigationCommand,
}

#[derive(Debug)]
pub enum NavigationOutcome {
    Started {
        ticket: u64,
        result: Result<Vec<Cell>, ConsoleError>,
    },
    Stopped {
        ticket: u64,
        result: Result<(), ConsoleError>,
    },
}

impl NavigationOutcome {
    pub fn ticket(&self) -> u64 {
        match self {
            Self::Started { ticket, .. } | Self::Stopped { ticket, .. } => *ticket,
        }
    }
}

/// Runs a [`NavigationBackend`] on a worker thread so backend calls never
/// block the console. Requests are executed in submission order; outcomes
/// are collected with [`NavigationClient::poll`] or [`NavigationClient::wait`].
///
/// The worker exits once the client is dropped and its current call returns.
/// With a repaint handle, every finished outcome also wakes the UI.
pub struct NavigationClient {
    request_sender: Sender<NavigationRequest>,
    outcome_receiver: Receiver<NavigationOutcome>,
}

impl NavigationClient {
    pub fn spawn(
        backend: impl NavigationBackend,
        repaint: Option<egui::Context>,
    ) -> Result<Self, ConsoleError> {
        let (request_sender, request_receiver) = mpsc::channel::<NavigationRequest>();
        let (outcome_sender, outcome_receiver) = mpsc::channel::<NavigationOutcome>();

        thread::Builder::new()
            .name("navigation-client".into())
            .spawn(move || run_worker(backend, request_receiver, outcome_sender, repaint))
            .map_err(|e| ConsoleError::WorkerSpawn { source: e })?;

        Ok(Self {
            request_sender,
            outcome_receiver,
        })
    }

    pub fn submit(&self, request: NavigationRequest) -> Result<(), ConsoleError> {
        self.request_sender
            .send(request)
            .map_err(|_| ConsoleError::WorkerUnavailable)
    }

    /// Next finished outcome, without blocking.
    pub fn poll(&self) -> Option<NavigationOutcome> {
        match self.outcome_receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("Navigation worker has exited");
                None
            }
        }
    }

    /// Next finished outcome, waiting up to `timeout` for one.
    pub fn wait(&self, timeout: Duration) -> Option<NavigationOutcome> {
        match self.outcome_receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Navigation worker has exited");
                None
            }
        }
    }
}

fn run_worker(
    mut backend: impl NavigationBackend,
    requests: Receiver<NavigationRequest>,
    outcomes: Sender<NavigationOutcome>,
    repaint: Option<egui::Context>,
) {
    for NavigationRequest { ticket, command } in requests {
        let outcome = match command {
            NavigationCommand::Start {
                origin,
                destination,
            } => {
                info!(
                    "Requesting navigation from {} to {} (ticket {})",
                    origin, destination, ticket
                );
                NavigationOutcome::Started {
                    ticket,
                    result: backend.start_navigation(origin, destination),
                }
            }
            NavigationCommand::Stop => {
                info!("Requesting navigation stop (ticket {})", ticket);
                NavigationOutcome::Stopped {
                    ticket,
                    result: backend.stop_navigation(),
                }
            }
        };

        if outcomes.send(outcome).is_err() {
            break;
        }
        if let Some(ctx) = &repaint {
            ctx.request_repaint();
        }
    }
    debug!("Navigation worker exiting");
}
