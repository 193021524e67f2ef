use std::{
    mem,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::errors::ConsoleError;

use super::{TelemetryEvent, TelemetryMessage};

#[derive(Debug, Default)]
struct Pending {
    message: Option<TelemetryMessage>,
    received: u64,
}

/// Holds the newest telemetry message not yet applied by the session.
///
/// A message put into the slot replaces any message still waiting, so a
/// consumer that falls behind finds one message, never a backlog. A frame
/// carried by a replaced message survives when its replacement has none.
#[derive(Clone, Debug, Default)]
pub struct TelemetrySlot {
    pending: Arc<Mutex<Pending>>,
}

impl TelemetrySlot {
    pub fn put(&self, mut message: TelemetryMessage) {
        let mut pending = self.lock();
        if message.frame.is_none()
            && let Some(previous) = pending.message.take()
        {
            message.frame = previous.frame;
        }
        pending.message = Some(message);
        pending.received += 1;
    }

    /// The waiting message and how many messages were folded into it.
    pub fn take(&self) -> Option<(TelemetryMessage, u64)> {
        let mut pending = self.lock();
        let message = pending.message.take()?;
        Some((message, mem::take(&mut pending.received)))
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        // a panic while holding the lock cannot leave `Pending` half written
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer end of a [`TelemetryLink`]: connection events go on a queue,
/// messages into the link's [`TelemetrySlot`]. Every delivery wakes the UI
/// when a repaint handle was given.
#[derive(Clone)]
pub struct TelemetryFeed {
    events: Sender<TelemetryEvent>,
    latest: TelemetrySlot,
    repaint: Option<egui::Context>,
}

impl TelemetryFeed {
    /// Reports a connection state change. Returns false once the session
    /// end of the link is gone.
    pub fn report(&self, event: TelemetryEvent) -> bool {
        let delivered = self.events.send(event).is_ok();
        self.wake();
        delivered
    }

    pub fn publish(&self, message: TelemetryMessage) {
        self.latest.put(message);
        self.wake();
    }

    fn wake(&self) {
        if let Some(ctx) = &self.repaint {
            ctx.request_repaint();
        }
    }
}

/// Handle on the streaming connection to the robot. The connection lives on
/// its own thread and is closed when the handle is dropped.
pub struct TelemetryChannel {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl TelemetryChannel {
    /// Opens the stream at `url` and delivers into `feed`. When `tap` is set
    /// every decoded message is also copied to it.
    pub fn open(
        url: &str,
        feed: TelemetryFeed,
        tap: Option<Sender<TelemetryMessage>>,
    ) -> Result<Self, ConsoleError> {
        let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();

        let worker_url = url.to_string();
        let worker = thread::Builder::new()
            .name("telemetry-channel".into())
            .spawn(move || run_channel(worker_url, feed, tap, shutdown_receiver))
            .map_err(|e| ConsoleError::Channel {
                reason: format!("could not start telemetry thread: {e}"),
            })?;

        Ok(Self {
            url: url.to_string(),
            shutdown: Some(shutdown_sender),
            worker: Some(worker),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Closes the connection and waits for the worker thread to exit.
    pub fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // the worker may already be gone after a remote close
            let _ = shutdown.send(());
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!("Telemetry channel thread panicked");
        }
    }
}

impl Drop for TelemetryChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// The session's end of a telemetry stream: connection events, the latest
/// message slot and, for a live connection, the channel that feeds them.
/// Dropping the link closes the connection.
pub struct TelemetryLink {
    events: Receiver<TelemetryEvent>,
    latest: TelemetrySlot,
    channel: Option<TelemetryChannel>,
}

impl TelemetryLink {
    pub fn open(
        url: &str,
        tap: Option<Sender<TelemetryMessage>>,
        repaint: Option<egui::Context>,
    ) -> Result<Self, ConsoleError> {
        let (mut link, feed) = Self::detached(repaint);
        link.channel = Some(TelemetryChannel::open(url, feed, tap)?);
        Ok(link)
    }

    /// A link fed through the returned [`TelemetryFeed`] rather than by a
    /// network connection.
    pub fn detached(repaint: Option<egui::Context>) -> (Self, TelemetryFeed) {
        let (events, receiver) = mpsc::channel::<TelemetryEvent>();
        let latest = TelemetrySlot::default();
        (
            Self {
                events: receiver,
                latest: latest.clone(),
                channel: None,
            },
            TelemetryFeed {
                events,
                latest,
                repaint,
            },
        )
    }

    pub fn events(&self) -> &Receiver<TelemetryEvent> {
        &self.events
    }

    pub fn take_latest(&self) -> Option<(TelemetryMessage, u64)> {
        self.latest.take()
    }

    pub fn url(&self) -> Option<&str> {
        self.channel.as_ref().map(TelemetryChannel::url)
    }
}

fn run_channel(
    url: String,
    feed: TelemetryFeed,
    tap: Option<Sender<TelemetryMessage>>,
    shutdown: oneshot::Receiver<()>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Could not build telemetry runtime: {}", e);
            feed.report(TelemetryEvent::Failed {
                reason: e.to_string(),
            });
            return;
        }
    };
    runtime.block_on(stream_telemetry(url, feed, tap, shutdown));
}

async fn stream_telemetry(
    url: String,
    feed: TelemetryFeed,
    mut tap: Option<Sender<TelemetryMessage>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let connect = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = &mut shutdown => {
            debug!("Telemetry channel closed before connecting to {}", url);
            return;
        }
    };

    let mut stream = match connect {
        Ok((stream, _)) => stream,
        Err(e) => {
            error!("Could not connect telemetry channel to {}: {}", url, e);
            feed.report(TelemetryEvent::Failed {
                reason: e.to_string(),
            });
            return;
        }
    };
    info!("Telemetry channel connected to {}", url);
    if !feed.report(TelemetryEvent::Connected) {
        let _ = stream.close(None).await;
        return;
    }

    loop {
        let decoded = tokio::select! {
            _ = &mut shutdown => {
                debug!("Closing telemetry channel to {}", url);
                let _ = stream.close(None).await;
                return;
            }
            next = stream.next() => match next {
                Some(Ok(Message::Text(text))) => TelemetryMessage::decode(text.as_str()),
                Some(Ok(Message::Binary(data))) => TelemetryMessage::decode_slice(&data),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|frame| {
                        let reason: &str = &frame.reason;
                        reason.to_string()
                    });
                    info!("Telemetry channel closed by server: {:?}", reason);
                    feed.report(TelemetryEvent::Closed { reason });
                    return;
                }
                // ping/pong frames are answered by the websocket layer
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    error!("Telemetry channel error: {}", e);
                    feed.report(TelemetryEvent::Failed {
                        reason: e.to_string(),
                    });
                    return;
                }
                None => {
                    info!("Telemetry channel to {} ended", url);
                    feed.report(TelemetryEvent::Closed { reason: None });
                    return;
                }
            }
        };

        let message = match decoded {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping telemetry message: {}", e);
                continue;
            }
        };

        if let Some(sender) = &tap
            && sender.send(message.clone()).is_err()
        {
            warn!("Telemetry recorder stopped, no longer recording");
            tap = None;
        }
        feed.publish(message);
    }
}
