use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use katapult_device::{AppState, DeviceTasks, Event, SimulatedHall, router, spawn_device};
use katapult_panel::panel::connection::frame_channel;
use katapult_panel::{
    ConnectOptions, ConnectionManager, ConnectionStatus, Panel, PanelConfig, ReconnectPolicy,
};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};

struct Device {
    state: Arc<AppState>,
    _tasks: DeviceTasks,
    server: JoinHandle<()>,
}

impl Device {
    async fn start(addr: SocketAddr) -> (SocketAddr, Self) {
        let (state, tasks) = spawn_device(SimulatedHall::new(0.0, 0.0));
        let app = router(state.clone(), std::path::Path::new("./does-not-exist"));

        // The port may still be held by a previous instance for a moment.
        let deadline = Instant::now() + Duration::from_secs(5);
        let listener = loop {
            match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => break l,
                Err(e) if Instant::now() < deadline => {
                    eprintln!("bind {addr} failed ({e}), retrying");
                    sleep(Duration::from_millis(50)).await;
                }
                Err(e) => panic!("bind {addr}: {e}"),
            }
        };
        let addr = listener.local_addr().expect("addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        (
            addr,
            Self {
                state,
                _tasks: tasks,
                server,
            },
        )
    }

    /// Pulses at a fixed interval until the panel shows `rpm`. The server
    /// subscribes a session slightly after the client sees it open, so the
    /// first frames may be missed.
    async fn spin_until(&self, panel: &Panel, interval: Duration, rpm: f64) {
        let mut at = Instant::now();
        let reached = timeout(Duration::from_secs(10), async {
            loop {
                self.state
                    .events_tx
                    .send(Event::HallSensorTrigger(at))
                    .await
                    .expect("device loop alive");
                at += interval;
                sleep(Duration::from_millis(20)).await;
                if panel.window_samples().last().map(|s| s.value) == Some(rpm) {
                    break;
                }
            }
        })
        .await;
        assert!(reached.is_ok(), "panel never showed {rpm} rpm");
    }

    async fn stop(self) {
        self.state.close_sessions();
        self.server.abort();
        let _ = self.server.await;
    }
}

async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let ok = timeout(Duration::from_secs(10), async {
        while !cond() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(ok.is_ok(), "timed out waiting for {what}");
}

fn config_for(addr: SocketAddr) -> PanelConfig {
    PanelConfig {
        base_url: format!("http://{addr}/"),
        reconnect: ReconnectPolicy {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            max_attempts: None,
        },
        ..PanelConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panel_follows_device_frames() {
    let (addr, device) = Device::start(SocketAddr::from(([127, 0, 0, 1], 0))).await;
    let panel = Panel::mount(&config_for(addr), None).expect("mount");
    let status = panel.status();
    eventually("open channel", || status.get() == ConnectionStatus::Open).await;

    // 60000 / 100 ms = 600 rpm
    device
        .spin_until(&panel, Duration::from_millis(100), 600.0)
        .await;
    let samples = panel.window_samples();
    assert_eq!(samples.len(), 10);
    assert!(samples.windows(2).all(|w| w[0].label < w[1].label));
    assert_eq!(panel.display_ceiling(), 610.0);

    let initiated = panel.initiated();
    assert!(!initiated.get());
    panel
        .commands()
        .send_initiate_shot(panel.angle().value() as i32)
        .await
        .expect("initiate accepted");
    eventually("armed flag", || initiated.get()).await;
    assert_eq!(device.state.status().target_angle, 45);

    panel.unmount().await;
    assert_eq!(status.get(), ConnectionStatus::Closed);
    device.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panel_reconnects_after_device_restart() {
    let (addr, first) = Device::start(SocketAddr::from(([127, 0, 0, 1], 0))).await;
    let panel = Panel::mount(&config_for(addr), None).expect("mount");
    let status = panel.status();
    eventually("first open", || status.get() == ConnectionStatus::Open).await;

    first.stop().await;
    eventually("drop noticed", || status.get() != ConnectionStatus::Open).await;

    let (_, second) = Device::start(addr).await;
    eventually("reopen", || status.get() == ConnectionStatus::Open).await;

    second
        .spin_until(&panel, Duration::from_millis(200), 300.0)
        .await;

    panel.unmount().await;
    second.stop().await;
}

#[tokio::test]
async fn unmount_stops_retrying_an_absent_device() {
    let panel = Panel::mount(&config_for(SocketAddr::from(([127, 0, 0, 1], 9))), None)
        .expect("mount");
    let status = panel.status();
    eventually("failed attempt", || status.get() == ConnectionStatus::Error).await;

    panel.unmount().await;
    assert_eq!(status.get(), ConnectionStatus::Closed);
    sleep(Duration::from_millis(300)).await;
    assert_eq!(status.get(), ConnectionStatus::Closed);
}

#[tokio::test]
async fn commands_reach_the_servo() {
    let (addr, device) = Device::start(SocketAddr::from(([127, 0, 0, 1], 0))).await;
    let panel = Panel::mount(&config_for(addr), None).expect("mount");

    panel.commands().send_turn_servo().await.expect("turn");
    eventually("servo at 90", || device.state.status().servo_angle == 90).await;
    panel.commands().send_turn_servo().await.expect("turn");
    eventually("servo at -90", || device.state.status().servo_angle == -90).await;
    panel.commands().send_reset().await.expect("reset");
    eventually("servo home", || device.state.status().servo_angle == 90).await;

    panel.unmount().await;
    device.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connect_reports_connecting_then_open_and_is_idempotent() {
    let (addr, device) = Device::start(SocketAddr::from(([127, 0, 0, 1], 0))).await;
    let (frames_tx, mut frames_rx) = frame_channel();
    let mut manager = ConnectionManager::new(
        &format!("http://{addr}"),
        ConnectOptions::default(),
        frames_tx,
    )
    .expect("valid base");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    manager
        .status()
        .subscribe(move |s| sink.lock().unwrap().push(*s));

    manager.connect();
    let greeting = timeout(Duration::from_secs(10), frames_rx.recv())
        .await
        .expect("frame in time")
        .expect("queue open");
    assert_eq!(greeting, "Connected to WebSocket!");
    assert_eq!(
        *seen.lock().unwrap(),
        vec![ConnectionStatus::Connecting, ConnectionStatus::Open]
    );
    eventually("one session", || device.state.ws_tx.receiver_count() == 1).await;

    manager.connect();
    manager.connect();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(device.state.ws_tx.receiver_count(), 1);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![ConnectionStatus::Connecting, ConnectionStatus::Open]
    );

    manager.close().await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Open,
            ConnectionStatus::Closed
        ]
    );
    device.stop().await;
}
