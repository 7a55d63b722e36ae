// backend/src/servo.rs
//
// Release servo model. No PWM here: the pulse width the firmware would drive
// is computed and logged so the mapping stays testable.

use tracing::info;

pub const MIN_ANGLE: i32 = -90;
pub const MAX_ANGLE: i32 = 90;

/// Position the arm returns to on reset, and one end of the turn toggle.
pub const HOME_ANGLE: i32 = 90;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Servo {
    min_us: u32,
    max_us: u32,
    angle: i32,
    pulse_us: u32,
}

impl Servo {
    pub fn new(min_us: u32, max_us: u32) -> Self {
        let mut servo = Self {
            min_us,
            max_us: max_us.max(min_us),
            angle: 0,
            pulse_us: 0,
        };
        servo.set_angle(0);
        servo
    }

    /// 500..2000 µs hobby servo.
    pub fn standard() -> Self {
        Self::new(500, 2000)
    }

    /// Clamps to [-90, 90] and returns the resulting pulse width.
    pub fn set_angle(&mut self, angle: i32) -> u32 {
        self.angle = angle.clamp(MIN_ANGLE, MAX_ANGLE);
        self.pulse_us = self.map_angle_to_us(self.angle);
        info!("servo -> {}° ({} µs)", self.angle, self.pulse_us);
        self.pulse_us
    }

    /// Flips between the two end stops; anything but home goes home.
    pub fn turn(&mut self) -> u32 {
        if self.angle != HOME_ANGLE {
            self.set_angle(HOME_ANGLE)
        } else {
            self.set_angle(-HOME_ANGLE)
        }
    }

    pub fn angle(&self) -> i32 {
        self.angle
    }

    pub fn pulse_us(&self) -> u32 {
        self.pulse_us
    }

    fn map_angle_to_us(&self, angle: i32) -> u32 {
        let span_deg = (MAX_ANGLE - MIN_ANGLE) as u32;
        (angle - MIN_ANGLE) as u32 * (self.max_us - self.min_us) / span_deg + self.min_us
    }
}

impl Default for Servo {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_end_stops_and_centre() {
        let mut s = Servo::standard();
        assert_eq!(s.pulse_us(), 1250);
        assert_eq!(s.set_angle(-90), 500);
        assert_eq!(s.set_angle(90), 2000);
    }

    #[test]
    fn clamps_out_of_range_angles() {
        let mut s = Servo::standard();
        assert_eq!(s.set_angle(200), 2000);
        assert_eq!(s.angle(), 90);
        assert_eq!(s.set_angle(-1000), 500);
        assert_eq!(s.angle(), -90);
    }

    #[test]
    fn turn_toggles_between_end_stops() {
        let mut s = Servo::standard();
        s.turn();
        assert_eq!(s.angle(), 90);
        s.turn();
        assert_eq!(s.angle(), -90);
        s.turn();
        assert_eq!(s.angle(), 90);
    }
}
