// frontend/src/panel/chart.rs
//
// Text RPM chart:
//  - One row of block glyphs per window notification, scaled against the
//    window's display ceiling (0 at the bottom, ceiling at the top).
//  - The extended frame is drawn too, so the slide is visible as two rows:
//    one with the new point appended, one after the oldest drops out.
//  - Owns its render target; create/update/destroy follow the window.

use std::io::Write;

use tracing::warn;

use super::telemetry_window::{WindowFrame, WindowPhase, WindowRenderer};

const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Maps a value onto a glyph index, 0 at the baseline, 7 at the ceiling.
pub fn level_for(value: f64, ceiling: f64) -> usize {
    let mut span = ceiling;
    if !span.is_finite() || span <= 1e-9 {
        span = 1.0;
    }
    let norm = (value / span).clamp(0.0, 1.0);
    if !norm.is_finite() {
        return 0;
    }
    (norm * (LEVELS.len() - 1) as f64).round() as usize
}

pub fn sparkline(frame: &WindowFrame<'_>) -> String {
    frame
        .samples
        .iter()
        .map(|s| LEVELS[level_for(s.value, frame.ceiling)])
        .collect()
}

pub struct SparklineChart<W: Write + Send> {
    target: Option<W>,
    title: String,
    show_extended: bool,
}

impl<W: Write + Send> SparklineChart<W> {
    pub fn new(target: W, title: impl Into<String>) -> Self {
        Self {
            target: Some(target),
            title: title.into(),
            show_extended: true,
        }
    }

    /// Draw only settled frames (no slide animation).
    pub fn settled_only(mut self) -> Self {
        self.show_extended = false;
        self
    }

    fn draw(&mut self, frame: &WindowFrame<'_>) {
        let latest = frame.samples.back().map(|s| s.value).unwrap_or(0.0);
        let marker = match frame.phase {
            WindowPhase::Extended => '+',
            WindowPhase::Settled => ' ',
        };
        let row = format!(
            "{}{marker} {} {latest:>8.1} / {:.0}",
            self.title,
            sparkline(frame),
            frame.ceiling
        );

        let Some(target) = self.target.as_mut() else {
            return;
        };
        if let Err(e) = writeln!(target, "{row}").and_then(|_| target.flush()) {
            warn!("chart target write failed: {e}");
        }
    }
}

impl<W: Write + Send> WindowRenderer for SparklineChart<W> {
    fn create(&mut self, frame: &WindowFrame<'_>) {
        self.draw(frame);
    }

    fn update(&mut self, frame: &WindowFrame<'_>) {
        if frame.phase == WindowPhase::Extended && !self.show_extended {
            return;
        }
        self.draw(frame);
    }

    fn destroy(&mut self) {
        if let Some(mut target) = self.target.take() {
            let _ = target.flush();
        }
    }
}
