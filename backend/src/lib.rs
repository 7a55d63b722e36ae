pub mod config;
pub mod device;
pub mod ring_buffer;
pub mod sensor;
pub mod servo;
pub mod state;
pub mod web;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

pub use config::DeviceConfig;
pub use device::{Device, DeviceStatus, Event};
pub use sensor::SimulatedHall;
pub use state::AppState;
pub use web::router;

/// Running device loop plus its optional simulated sensor. Dropping it stops
/// both tasks.
pub struct DeviceTasks {
    device: JoinHandle<()>,
    sensor: Option<JoinHandle<()>>,
}

impl DeviceTasks {
    pub fn abort(&self) {
        self.device.abort();
        if let Some(sensor) = &self.sensor {
            sensor.abort();
        }
    }
}

impl Drop for DeviceTasks {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Starts the device loop and, for a positive `hall.rpm`, the simulated hall
/// sensor. Must be called from inside a tokio runtime.
pub fn spawn_device(hall: SimulatedHall) -> (Arc<AppState>, DeviceTasks) {
    let (events_tx, events_rx) = mpsc::channel(64);
    let (ws_tx, _ws_rx) = broadcast::channel(512);
    let (status_tx, status_rx) = watch::channel(DeviceStatus::default());

    let device = tokio::spawn(Device::new(ws_tx.clone(), status_tx).run(events_rx));
    let sensor = hall
        .period()
        .map(|_| tokio::spawn(hall.run(events_tx.clone())));

    let state = Arc::new(AppState {
        events_tx,
        ws_tx,
        status_rx,
        closing_tx: watch::channel(false).0,
    });
    (state, DeviceTasks { device, sensor })
}
