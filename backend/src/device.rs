// backend/src/device.rs
//
// The launcher's state loop. Every input (HTTP trigger or hall pulse) is an
// Event on one queue; the loop owns the servo, the pulse history and the shot
// state, and is the only producer of frames for the WebSocket sessions.

use std::time::Duration;

use katapult_shared::InboundMessage;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ring_buffer::RingBuffer;
use crate::servo::Servo;

/// Angle of the rotor at which the hall sensor fires.
pub const MAGNET_POSITION_ANGLE: i32 = 45;
/// Time between servo command and the projectile actually leaving.
pub const SERVO_PROJECTILE_RELEASE_TIME: Duration = Duration::from_millis(150);
/// Pulse intervals averaged for the reported RPM.
pub const RPM_SMOOTHING: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// `None` toggles between the end stops, `Some` moves to that angle.
    TurnServo(Option<i32>),
    InitiateShot(i32),
    HallSensorTrigger(Instant),
}

/// Snapshot published after every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    pub rpm: u64,
    pub servo_angle: i32,
    pub shot_initiated: bool,
    pub target_angle: i32,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            rpm: 0,
            servo_angle: 0,
            shot_initiated: false,
            target_angle: MAGNET_POSITION_ANGLE,
        }
    }
}

pub fn rpm_from_interval_ms(avg_interval_ms: u64) -> u64 {
    if avg_interval_ms == 0 {
        return 0;
    }
    60_000 / avg_interval_ms
}

/// Wait after a hall pulse so the arm is at `target_angle` when the projectile
/// leaves.
pub fn release_delay(rpm: u64, target_angle: i32) -> Duration {
    if rpm == 0 {
        return Duration::ZERO;
    }
    let period_s = 60.0 / rpm as f64;
    let angle_delta = (target_angle - MAGNET_POSITION_ANGLE).rem_euclid(360);
    let ratio = angle_delta as f64 / 360.0;
    let delay = ratio * period_s - SERVO_PROJECTILE_RELEASE_TIME.as_secs_f64();
    Duration::from_secs_f64(delay.max(0.0))
}

pub struct Device {
    servo: Servo,
    intervals: RingBuffer<u64>,
    last_pulse: Option<Instant>,
    rpm: u64,
    shot_initiated: bool,
    target_angle: i32,
    ws_tx: broadcast::Sender<String>,
    status_tx: watch::Sender<DeviceStatus>,
}

impl Device {
    pub fn new(ws_tx: broadcast::Sender<String>, status_tx: watch::Sender<DeviceStatus>) -> Self {
        let device = Self {
            servo: Servo::standard(),
            intervals: RingBuffer::new(RPM_SMOOTHING),
            last_pulse: None,
            rpm: 0,
            shot_initiated: false,
            target_angle: MAGNET_POSITION_ANGLE,
            ws_tx,
            status_tx,
        };
        device.publish_status();
        device
    }

    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            rpm: self.rpm,
            servo_angle: self.servo.angle(),
            shot_initiated: self.shot_initiated,
            target_angle: self.target_angle,
        }
    }

    pub async fn run(mut self, mut events: mpsc::Receiver<Event>) {
        info!("device loop started");
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        info!("event queue closed, device loop done");
    }

    pub async fn handle(&mut self, event: Event) {
        match event {
            Event::TurnServo(Some(angle)) => {
                self.servo.set_angle(angle);
            }
            Event::TurnServo(None) => {
                self.servo.turn();
            }
            Event::InitiateShot(target_angle) => {
                // The target is only taken while arming; a second request cancels.
                if !self.shot_initiated {
                    self.target_angle = target_angle;
                }
                self.toggle_shot_initiated();
            }
            Event::HallSensorTrigger(now) => self.on_pulse(now).await,
        }
        self.publish_status();
    }

    async fn on_pulse(&mut self, now: Instant) {
        if let Some(last) = self.last_pulse {
            let delta_ms = now.saturating_duration_since(last).as_millis() as u64;
            if delta_ms > 0 {
                self.intervals.push(delta_ms);
                if let Some(avg) = self.intervals.average() {
                    self.rpm = rpm_from_interval_ms(avg);
                }
            }
        }
        self.last_pulse = Some(now);

        if self.shot_initiated {
            let delay = release_delay(self.rpm, self.target_angle);
            debug!(
                "releasing at {}° in {:?} ({} rpm)",
                self.target_angle, delay, self.rpm
            );
            tokio::time::sleep(delay).await;
            self.servo.turn();
            self.toggle_shot_initiated();
        }

        debug!("smoothed RPM: {}", self.rpm);
        self.broadcast(InboundMessage::rpm(self.rpm as f64));
    }

    fn toggle_shot_initiated(&mut self) {
        self.shot_initiated = !self.shot_initiated;
        info!(
            "shot {} (target {}°)",
            if self.shot_initiated { "armed" } else { "idle" },
            self.target_angle
        );
        self.broadcast(InboundMessage::initiate_update(self.shot_initiated));
    }

    fn broadcast(&self, msg: InboundMessage) {
        match msg.to_frame() {
            // No receivers just means no panel is connected.
            Ok(frame) => {
                let _ = self.ws_tx.send(frame);
            }
            Err(e) => warn!("failed to encode {} frame: {e}", msg.kind),
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status());
    }
}
