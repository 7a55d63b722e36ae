// frontend/src/panel/mod.rs

pub mod angle_input;
pub mod chart;
pub mod commands;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod observable;
pub mod telemetry_window;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use angle_input::ClampedFormattedValue;
use commands::CommandClient;
use config::PanelConfig;
use connection::{
    ConnectOptions, ConnectionError, ConnectionManager, ConnectionStatus, FrameReceiver,
    frame_channel,
};
use dispatch::MessageDispatcher;
use observable::Observable;
use telemetry_window::{TelemetrySample, TelemetryWindow, WindowRenderer};

// ============================================================================
// Panel: the view that owns the pipeline.
// - mount(): window + dispatcher + channel + dispatch loop, then connect().
// - unmount(): close channel (no more reconnects), let the dispatch loop drain
//   and stop, drop the window (renderer destroy).
// ============================================================================
pub struct Panel {
    connection: ConnectionManager,
    dispatcher: Arc<Mutex<MessageDispatcher>>,
    dispatch_task: Option<JoinHandle<()>>,
    status: Observable<ConnectionStatus>,
    initiated: Observable<bool>,
    commands: CommandClient,
    angle: ClampedFormattedValue,
}

impl Panel {
    /// Must be called from inside a tokio runtime.
    pub fn mount(
        config: &PanelConfig,
        renderer: Option<Box<dyn WindowRenderer>>,
    ) -> Result<Self, ConnectionError> {
        let (frames_tx, frames_rx) = frame_channel();
        let mut connection = ConnectionManager::new(
            &config.base_url,
            ConnectOptions {
                auto_reconnect: config.auto_reconnect,
                reconnect: config.reconnect,
            },
            frames_tx,
        )?;

        let commands = CommandClient::new(&config.base_url)?;

        let mut window = TelemetryWindow::new(config.window_capacity, config.ceiling_floor);
        if let Some(renderer) = renderer {
            window.attach_renderer(renderer);
        }
        let dispatcher = MessageDispatcher::new(window);
        let initiated = dispatcher.initiated();
        let dispatcher = Arc::new(Mutex::new(dispatcher));

        let dispatch_task = tokio::spawn(dispatch_loop(frames_rx, dispatcher.clone()));

        let status = connection.status();
        info!("mounting panel for {}", connection.url());
        connection.connect();

        Ok(Self {
            connection,
            dispatcher,
            dispatch_task: Some(dispatch_task),
            status,
            initiated,
            commands,
            angle: ClampedFormattedValue::angle(config.initial_angle),
        })
    }

    pub fn status(&self) -> Observable<ConnectionStatus> {
        self.status.clone()
    }

    pub fn initiated(&self) -> Observable<bool> {
        self.initiated.clone()
    }

    pub fn commands(&self) -> &CommandClient {
        &self.commands
    }

    pub fn angle(&self) -> &ClampedFormattedValue {
        &self.angle
    }

    pub fn angle_mut(&mut self) -> &mut ClampedFormattedValue {
        &mut self.angle
    }

    pub fn window_samples(&self) -> Vec<TelemetrySample> {
        self.lock_dispatcher().window().samples().iter().copied().collect()
    }

    pub fn display_ceiling(&self) -> f64 {
        self.lock_dispatcher().window().display_ceiling()
    }

    /// Reconnect after a manual teardown of the channel, or no-op if live.
    pub fn reconnect(&mut self) {
        self.connection.connect();
    }

    // ---------- Actions ----------

    pub fn reset(&self) {
        self.commands.reset();
    }

    pub fn turn_servo(&self) {
        self.commands.turn_servo();
    }

    /// Sends the shot request with the current, already clamped, angle.
    pub fn initiate_shot(&self) {
        self.commands.initiate_shot(self.angle.value() as i32);
    }

    pub async fn unmount(mut self) {
        self.connection.close().await;
        // The frame sender lives in the manager; dropping it ends the loop
        // once every queued frame has been dispatched.
        drop(self.connection);
        if let Some(task) = self.dispatch_task.take()
            && let Err(e) = task.await
        {
            warn!("dispatch loop ended abnormally: {e}");
        }
        info!("panel unmounted");
    }

    fn lock_dispatcher(&self) -> MutexGuard<'_, MessageDispatcher> {
        self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn dispatch_loop(mut frames: FrameReceiver, dispatcher: Arc<Mutex<MessageDispatcher>>) {
    while let Some(frame) = frames.recv().await {
        let mut d = dispatcher.lock().unwrap_or_else(PoisonError::into_inner);
        // Errors are already logged by the dispatcher and never fatal.
        let _ = d.dispatch(&frame);
    }
    debug!("frame queue closed, dispatch loop done");
}
