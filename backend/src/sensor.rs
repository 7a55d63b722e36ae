// backend/src/sensor.rs
//
// Stand-in for the hall sensor on the rotor: one HallSensorTrigger per
// revolution at a nominal speed, with a little jitter so the smoothing has
// something to do.

use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::device::Event;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedHall {
    pub rpm: f64,
    /// Relative jitter applied to each revolution, e.g. 0.03 for ±3 %.
    pub jitter: f64,
}

impl SimulatedHall {
    pub fn new(rpm: f64, jitter: f64) -> Self {
        Self {
            rpm,
            jitter: jitter.clamp(0.0, 0.5),
        }
    }

    /// Nominal revolution time, `None` when the rotor is not spinning.
    pub fn period(&self) -> Option<Duration> {
        if !self.rpm.is_finite() || self.rpm <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(60.0 / self.rpm))
    }

    fn next_interval(&self, period: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return period;
        }
        let mut rng = rand::rng();
        let factor = 1.0 + rng.random_range(-self.jitter..self.jitter);
        period.mul_f64(factor)
    }

    /// Emits pulses until the device loop goes away.
    pub async fn run(self, events: mpsc::Sender<Event>) {
        let Some(period) = self.period() else {
            info!("simulated hall sensor idle (rpm {})", self.rpm);
            return;
        };
        info!("simulated hall sensor at {} rpm", self.rpm);

        loop {
            tokio::time::sleep(self.next_interval(period)).await;
            debug!("magnet detected (leading edge)");
            if events
                .send(Event::HallSensorTrigger(Instant::now()))
                .await
                .is_err()
            {
                break;
            }
        }
    }
}
