// Shared fixtures for the session integration tests.
#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        mpsc::{self, Receiver, Sender},
    },
    time::Duration,
};

use robot_console::{
    Cell, ConsoleError, NavigationBackend, NavigationClient, SessionController, TelemetryLink,
    config::GridConfig, telemetry::TelemetryFeed,
};

pub const OUTCOME_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Start { origin: Cell, destination: Cell },
    Stop,
}

/// What the scripted backend answers, consumed in order. An empty script
/// answers start with `[origin, destination]` and stop with success.
pub enum Reply {
    Path(Vec<Cell>),
    Stopped,
    Fail(&'static str),
}

#[derive(Clone, Default)]
pub struct BackendLog {
    calls: Arc<Mutex<Vec<BackendCall>>>,
}

impl BackendLog {
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub struct ScriptedBackend {
    log: BackendLog,
    replies: VecDeque<Reply>,
    gate: Option<Receiver<()>>,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> (Self, BackendLog) {
        let log = BackendLog::default();
        (
            Self {
                log: log.clone(),
                replies: replies.into_iter().collect(),
                gate: None,
            },
            log,
        )
    }

    pub fn echo() -> (Self, BackendLog) {
        Self::new(Vec::new())
    }

    /// Makes every call block until the returned sender releases it.
    pub fn gated(mut self) -> (Self, Sender<()>) {
        let (release, gate) = mpsc::channel();
        self.gate = Some(gate);
        (self, release)
    }

    fn wait_for_release(&self) {
        if let Some(gate) = &self.gate {
            let _ = gate.recv_timeout(OUTCOME_TIMEOUT);
        }
    }
}

impl NavigationBackend for ScriptedBackend {
    fn start_navigation(
        &mut self,
        origin: Cell,
        destination: Cell,
    ) -> Result<Vec<Cell>, ConsoleError> {
        self.log.calls.lock().unwrap().push(BackendCall::Start {
            origin,
            destination,
        });
        self.wait_for_release();
        match self.replies.pop_front() {
            Some(Reply::Path(path)) => Ok(path),
            Some(Reply::Fail(message)) => Err(ConsoleError::Transport {
                message: message.to_string(),
            }),
            Some(Reply::Stopped) | None => Ok(vec![origin, destination]),
        }
    }

    fn stop_navigation(&mut self) -> Result<(), ConsoleError> {
        self.log.calls.lock().unwrap().push(BackendCall::Stop);
        self.wait_for_release();
        match self.replies.pop_front() {
            Some(Reply::Fail(message)) => Err(ConsoleError::Transport {
                message: message.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// A controller over the default 5x7 grid.
pub fn controller_with(backend: ScriptedBackend) -> SessionController {
    let client = NavigationClient::spawn(backend, None).unwrap();
    SessionController::new(GridConfig::default().build(), client)
}

/// Attaches a telemetry link fed through the returned feed instead of a socket.
pub fn attach_fake_telemetry(controller: &mut SessionController) -> TelemetryFeed {
    let (link, feed) = TelemetryLink::detached(None);
    controller.attach_telemetry(link);
    feed
}

/// Selects (2,2) -> (2,5) and starts navigation, waiting for the outcome.
pub fn start_running(controller: &mut SessionController) {
    controller.click(Cell::new(2, 2));
    controller.click(Cell::new(2, 5));
    controller.request_navigation_start().unwrap();
    assert!(controller.wait_for_navigation(OUTCOME_TIMEOUT));
}
