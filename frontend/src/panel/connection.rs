// frontend/src/panel/connection.rs
//
// Duplex channel supervisor.
//  - connect() spawns ONE supervisor task; calling it again while the task
//    is alive does nothing.
//  - The supervisor loops connect -> read -> (close|error) -> backoff sleep.
//  - close() flips the shutdown watch, which cancels a pending handshake,
//    an in-progress read or a backoff sleep, then waits for the task.
//  - Text frames are forwarded untouched; the manager never looks inside.

use std::fmt;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, trace, warn};
use url::Url;

use super::config::{Backoff, ReconnectPolicy, channel_url};
use super::observable::Observable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "CONNECTING",
            ConnectionStatus::Open => "OPEN",
            ConnectionStatus::Closed => "CLOSED",
            ConnectionStatus::Error => "ERROR",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionStatus::Open)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid channel url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub auto_reconnect: bool,
    pub reconnect: ReconnectPolicy,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Sending half of the raw frame queue (FIFO, unbounded).
pub type FrameSender = mpsc::UnboundedSender<String>;
pub type FrameReceiver = mpsc::UnboundedReceiver<String>;

pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    mpsc::unbounded_channel()
}

struct Supervisor {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct ConnectionManager {
    url: Url,
    options: ConnectOptions,
    status: Observable<ConnectionStatus>,
    frames: FrameSender,
    supervisor: Option<Supervisor>,
}

impl ConnectionManager {
    pub fn new(
        base_url: &str,
        options: ConnectOptions,
        frames: FrameSender,
    ) -> Result<Self, ConnectionError> {
        Ok(Self {
            url: channel_url(base_url)?,
            options,
            status: Observable::new(ConnectionStatus::Closed),
            frames,
            supervisor: None,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> Observable<ConnectionStatus> {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.supervisor
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }

    /// Starts the supervisor unless one is already running.
    /// Must be called from inside a tokio runtime.
    pub fn connect(&mut self) {
        if self.is_running() {
            trace!("connect() ignored, supervisor already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(supervise(
            self.url.clone(),
            self.options,
            self.status.clone(),
            self.frames.clone(),
            shutdown_rx,
        ));
        self.supervisor = Some(Supervisor {
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Tears the channel down. No reconnect is scheduled afterwards.
    pub async fn close(&mut self) {
        let Some(supervisor) = self.supervisor.take() else {
            return;
        };
        let _ = supervisor.shutdown.send(true);
        if let Err(e) = supervisor.task.await
            && e.is_panic()
        {
            warn!("[WS] supervisor panicked: {e}");
        }
        self.status.set(ConnectionStatus::Closed);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            let _ = supervisor.shutdown.send(true);
            supervisor.task.abort();
        }
    }
}

enum SessionEnd {
    RemoteClosed,
    Shutdown,
}

async fn supervise(
    url: Url,
    options: ConnectOptions,
    status: Observable<ConnectionStatus>,
    frames: FrameSender,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = Backoff::new(options.reconnect);

    loop {
        if *shutdown.borrow() {
            break;
        }

        status.set(ConnectionStatus::Connecting);
        info!("[WS] connecting to {url}");

        match run_session(&url, &status, &frames, &mut shutdown, &mut backoff).await {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::RemoteClosed) => {
                info!("[WS] closed by peer");
                status.set(ConnectionStatus::Closed);
            }
            Err(e) => {
                warn!("[WS] {e}");
                status.set(ConnectionStatus::Error);
            }
        }

        if !options.auto_reconnect {
            break;
        }
        let Some(delay) = backoff.next_delay() else {
            warn!("[WS] giving up after reaching the reconnect attempt limit");
            break;
        };
        debug!("[WS] reconnecting in {delay:?}");

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    debug!("[WS] supervisor stopped");
}

async fn run_session(
    url: &Url,
    status: &Observable<ConnectionStatus>,
    frames: &FrameSender,
    shutdown: &mut watch::Receiver<bool>,
    backoff: &mut Backoff,
) -> Result<SessionEnd, ConnectionError> {
    let (ws_stream, _) = tokio::select! {
        res = tokio_tungstenite::connect_async(url.as_str()) => res?,
        _ = shutdown.changed() => return Ok(SessionEnd::Shutdown),
    };

    status.set(ConnectionStatus::Open);
    backoff.reset();
    info!("[WS] open");

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(SessionEnd::Shutdown);
            }
            item = read.next() => {
                let msg = match item {
                    None => return Ok(SessionEnd::RemoteClosed),
                    Some(Ok(m)) => m,
                    Some(Err(e)) => return Err(e.into()),
                };

                match msg {
                    Message::Text(text) => {
                        if frames.send(text.as_str().to_owned()).is_err() {
                            // Nobody is dispatching any more; the view is gone.
                            let _ = write.send(Message::Close(None)).await;
                            return Ok(SessionEnd::Shutdown);
                        }
                    }
                    Message::Close(frame) => {
                        debug!("[WS] close frame: {frame:?}");
                        return Ok(SessionEnd::RemoteClosed);
                    }
                    Message::Binary(bytes) => {
                        trace!("[WS] ignoring {} byte binary frame", bytes.len())
                    }
                    _ => {}
                }
            }
        }
    }
}
