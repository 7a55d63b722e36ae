use tokio::sync::{broadcast, mpsc, watch};

use crate::device::{DeviceStatus, Event};

#[derive(Clone)]
pub struct AppState {
    /// Triggers from HTTP handlers (and the sensor) → device loop
    pub events_tx: mpsc::Sender<Event>,

    /// Frames → every WebSocket session
    pub ws_tx: broadcast::Sender<String>,

    /// Latest device snapshot
    pub status_rx: watch::Receiver<DeviceStatus>,

    /// Set to true to make every open session close
    pub closing_tx: watch::Sender<bool>,
}

impl AppState {
    pub fn status(&self) -> DeviceStatus {
        *self.status_rx.borrow()
    }

    /// Ends all WebSocket sessions, e.g. ahead of a graceful shutdown.
    pub fn close_sessions(&self) {
        self.closing_tx.send_replace(true);
    }
}
