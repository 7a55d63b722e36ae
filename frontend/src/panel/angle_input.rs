// frontend/src/panel/angle_input.rs

use std::num::IntErrorKind;

pub const ANGLE_MIN: i64 = 0;
pub const ANGLE_MAX: i64 = 360;
pub const DEFAULT_ANGLE: i64 = 45;

/// Narrow degree unit, e.g. "45°".
const DEGREE_UNIT: &str = "°";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Field has focus: show the bare number so it can be edited.
    Editing,
    /// Field is idle: show the unit-suffixed form.
    Display,
}

/// User-editable integer that is always inside `[min, max]`.
///
/// Bad input is never rejected: anything that does not start with an integer
/// becomes `0`, and the result is clamped to the range.
#[derive(Debug, Clone)]
pub struct ClampedFormattedValue {
    min: i64,
    max: i64,
    unit: &'static str,
    raw: Option<i64>,
    clamped: i64,
    mode: DisplayMode,
}

impl ClampedFormattedValue {
    pub fn new(min: i64, max: i64, unit: &'static str, initial: i64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            unit,
            raw: Some(initial),
            clamped: initial.clamp(min, max),
            mode: DisplayMode::Display,
        }
    }

    /// The launch-angle field: 0..=360 degrees.
    pub fn angle(initial: i64) -> Self {
        Self::new(ANGLE_MIN, ANGLE_MAX, DEGREE_UNIT, initial)
    }

    pub fn set_raw(&mut self, text: &str) {
        self.raw = parse_leading_int(text);
        self.clamped = self.raw.unwrap_or(0).clamp(self.min, self.max);
    }

    pub fn on_focus(&mut self) {
        self.mode = DisplayMode::Editing;
    }

    pub fn on_blur(&mut self) {
        self.mode = DisplayMode::Display;
    }

    pub fn display(&self) -> String {
        match self.mode {
            DisplayMode::Editing => self.clamped.to_string(),
            DisplayMode::Display => format!("{}{}", self.clamped, self.unit),
        }
    }

    pub fn value(&self) -> i64 {
        self.clamped
    }

    /// Last parsed input before clamping; `None` when it was not a number.
    pub fn raw(&self) -> Option<i64> {
        self.raw
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }
}

impl Default for ClampedFormattedValue {
    fn default() -> Self {
        Self::angle(DEFAULT_ANGLE)
    }
}

/// Reads an optional sign and the leading run of digits the way a browser's
/// `parseInt` does: leading whitespace is skipped, a `0x`/`0X` prefix switches
/// to hex, and anything after the digits is ignored ("45°" -> 45, "3.9" -> 3,
/// "0x20" -> 32). Out-of-range digit runs saturate.
fn parse_leading_int(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, body) = match rest.get(..2) {
        Some("0x") | Some("0X") => (16, &rest[2..]),
        _ => (10, rest),
    };
    let digits = body
        .chars()
        .take_while(|c| c.is_digit(radix))
        .count();
    if digits == 0 {
        return None;
    }

    match i64::from_str_radix(&body[..digits], radix) {
        Ok(n) => Some(if negative { -n } else { n }),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow if negative => Some(i64::MIN),
            IntErrorKind::PosOverflow => Some(i64::MAX),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angle_after(text: &str) -> i64 {
        let mut v = ClampedFormattedValue::default();
        v.set_raw(text);
        v.value()
    }

    #[test]
    fn coerces_and_clamps() {
        assert_eq!(angle_after("abc"), 0);
        assert_eq!(angle_after("500"), 360);
        assert_eq!(angle_after("-10"), 0);
        assert_eq!(angle_after("90"), 90);
        assert_eq!(angle_after(""), 0);
    }

    #[test]
    fn accepts_leading_integer_prefix() {
        assert_eq!(angle_after("  120"), 120);
        assert_eq!(angle_after("45°"), 45);
        assert_eq!(angle_after("3.9"), 3);
        assert_eq!(angle_after("+7deg"), 7);
        assert_eq!(angle_after("-"), 0);
    }

    #[test]
    fn hex_prefix_is_honoured() {
        assert_eq!(angle_after("0x20"), 32);
        assert_eq!(angle_after("0XfF"), 255);
        assert_eq!(angle_after("-0x10"), 0);
        assert_eq!(angle_after("0x"), 0);
        assert_eq!(angle_after("0xg"), 0);
        assert_eq!(angle_after("0x1000"), 360);
    }

    #[test]
    fn huge_input_saturates() {
        assert_eq!(angle_after("99999999999999999999999"), 360);
        assert_eq!(angle_after("-99999999999999999999999"), 0);
    }

    #[test]
    fn clamped_value_stays_in_range() {
        for text in ["0", "360", "361", "-1", "NaN", "1e9", " 12 ", "∞", "0x20"] {
            let v = angle_after(text);
            assert!((ANGLE_MIN..=ANGLE_MAX).contains(&v), "{text:?} gave {v}");
        }
    }

    #[test]
    fn raw_keeps_unclamped_input() {
        let mut v = ClampedFormattedValue::default();
        v.set_raw("500");
        assert_eq!(v.raw(), Some(500));
        v.set_raw("abc");
        assert_eq!(v.raw(), None);
        assert_eq!(v.value(), 0);
    }

    #[test]
    fn display_depends_on_focus() {
        let mut v = ClampedFormattedValue::default();
        assert_eq!(v.mode(), DisplayMode::Display);
        assert_eq!(v.display(), "45°");

        v.on_focus();
        assert_eq!(v.display(), "45");
        v.set_raw("180");
        assert_eq!(v.display(), "180");

        v.on_blur();
        assert_eq!(v.display(), "180°");
    }

    #[test]
    fn formatted_text_round_trips_through_set_raw() {
        let mut v = ClampedFormattedValue::default();
        let shown = v.display();
        v.set_raw(&shown);
        assert_eq!(v.value(), 45);
    }
}
