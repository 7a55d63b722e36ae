// frontend/src/panel/telemetry_window.rs
//
// Sliding RPM window feeding the chart.
//  - Holds exactly `capacity` samples at rest.
//  - Every push is a two-step transition (Settled -> Extended -> Settled) and
//    the renderer sees both steps, which is what produces the slide animation:
//    the new point appears first, the oldest one drops out afterwards.
//  - The y-axis ceiling only ever grows.

use std::collections::VecDeque;

use tracing::trace;

pub const DEFAULT_CAPACITY: usize = 10;
pub const DEFAULT_CEILING: f64 = 60.0;

/// Headroom added to a sample before rounding it into a ceiling candidate.
const CEILING_HEADROOM: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub label: u64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// `capacity` samples, nothing pending.
    Settled,
    /// `capacity + 1` samples, oldest not yet evicted.
    Extended,
}

/// What a renderer gets to look at on every notification.
#[derive(Debug, Clone, Copy)]
pub struct WindowFrame<'a> {
    pub phase: WindowPhase,
    pub samples: &'a VecDeque<TelemetrySample>,
    pub ceiling: f64,
}

/// The chart collaborator. One renderer belongs to exactly one window.
pub trait WindowRenderer: Send {
    fn create(&mut self, frame: &WindowFrame<'_>);
    fn update(&mut self, frame: &WindowFrame<'_>);
    fn destroy(&mut self);
}

pub fn round_to_tens(v: f64) -> f64 {
    (v / 10.0).round() * 10.0
}

pub struct TelemetryWindow {
    capacity: usize,
    samples: VecDeque<TelemetrySample>,
    ceiling: f64,
    next_label: u64,
    phase: WindowPhase,
    renderer: Option<Box<dyn WindowRenderer>>,
}

impl TelemetryWindow {
    pub fn new(capacity: usize, ceiling_floor: f64) -> Self {
        let capacity = capacity.max(1);
        let samples: VecDeque<TelemetrySample> = (1..=capacity as u64)
            .map(|label| TelemetrySample { label, value: 0.0 })
            .collect();

        Self {
            capacity,
            samples,
            ceiling: ceiling_floor,
            next_label: capacity as u64 + 1,
            phase: WindowPhase::Settled,
            renderer: None,
        }
    }

    pub fn with_renderer(
        capacity: usize,
        ceiling_floor: f64,
        renderer: Box<dyn WindowRenderer>,
    ) -> Self {
        let mut window = Self::new(capacity, ceiling_floor);
        window.attach_renderer(renderer);
        window
    }

    /// Installs `renderer`, destroying any previous one first.
    pub fn attach_renderer(&mut self, mut renderer: Box<dyn WindowRenderer>) {
        self.detach_renderer();
        renderer.create(&self.frame());
        self.renderer = Some(renderer);
    }

    pub fn detach_renderer(&mut self) {
        if let Some(mut old) = self.renderer.take() {
            old.destroy();
        }
    }

    pub fn push(&mut self, value: f64) {
        self.extend(value);
        self.settle();
    }

    fn extend(&mut self, value: f64) {
        debug_assert_eq!(self.phase, WindowPhase::Settled);

        let label = self.next_label;
        self.next_label += 1;
        self.samples.push_back(TelemetrySample { label, value });

        // f64::max ignores NaN, so a bad candidate never lowers or poisons the ceiling.
        self.ceiling = self.ceiling.max(round_to_tens(value + CEILING_HEADROOM));
        self.phase = WindowPhase::Extended;

        trace!(label, value, ceiling = self.ceiling, "window extended");
        self.notify();
    }

    fn settle(&mut self) {
        debug_assert_eq!(self.phase, WindowPhase::Extended);

        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        self.phase = WindowPhase::Settled;
        self.notify();
    }

    fn notify(&mut self) {
        let Some(mut renderer) = self.renderer.take() else {
            return;
        };
        renderer.update(&self.frame());
        self.renderer = Some(renderer);
    }

    fn frame(&self) -> WindowFrame<'_> {
        WindowFrame {
            phase: self.phase,
            samples: &self.samples,
            ceiling: self.ceiling,
        }
    }

    pub fn samples(&self) -> &VecDeque<TelemetrySample> {
        &self.samples
    }

    #[cfg(test)]
    pub(crate) fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn latest(&self) -> Option<TelemetrySample> {
        self.samples.back().copied()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn display_ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn phase(&self) -> WindowPhase {
        self.phase
    }
}

impl Default for TelemetryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_CEILING)
    }
}

impl Drop for TelemetryWindow {
    fn drop(&mut self) {
        self.detach_renderer();
    }
}
