use std::str::FromStr;
use std::time::Duration;

use ratatui::style::Color;
use tracing::debug;

use crate::animation::{self, MAX_SPEED, MIN_SPEED};

/// Marker colors offered when cycling from the keyboard.
pub const COLOR_PALETTE: &[&str] = &["#4a90e2", "#e24a4a", "#50c878", "#f5c542", "#ffffff"];

const DURATION_STEP: i64 = 5;
const MIN_DURATION: i64 = 5;
const SIZE_STEP: i64 = 10;
const MIN_SIZE: i64 = 10;

/// Values read by the session at start; edited through the settings panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub duration_secs: u32,
    pub total_rounds: u32,
    pub speed_level: u8,
    /// Marker diameter in pixels; the terminal renders 10px per cell.
    pub marker_size: u16,
    pub marker_color: String,
    pub sound_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            total_rounds: 5,
            speed_level: 5,
            marker_size: 50,
            marker_color: COLOR_PALETTE[0].to_string(),
            sound_id: "tick.wav".to_string(),
        }
    }
}

/// One editable input of the settings panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum ConfigField {
    Duration,
    Rounds,
    Speed,
    #[strum(to_string = "Marker size")]
    MarkerSize,
    #[strum(to_string = "Marker color")]
    MarkerColor,
    Sound,
}

impl ConfigField {
    pub const ALL: [ConfigField; 6] = [
        ConfigField::Duration,
        ConfigField::Rounds,
        ConfigField::Speed,
        ConfigField::MarkerSize,
        ConfigField::MarkerColor,
        ConfigField::Sound,
    ];

    /// Whether edits must wait until the session is idle or ended.
    pub fn locked_while_active(self) -> bool {
        !matches!(self, ConfigField::MarkerSize | ConfigField::MarkerColor)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Leading-integer parse: surrounding whitespace is ignored and trailing
/// garbage after the digits is dropped, so "12s" reads as 12.
pub fn parse_int_lenient(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    digits[..end].parse::<i64>().ok().map(|v| v * sign)
}

/// Parse a CSS-style color name or `#rrggbb` into a terminal color.
pub fn parse_color(raw: &str) -> Option<Color> {
    Color::from_str(raw.trim()).ok()
}

impl SessionConfig {
    pub fn cycle_duration(&self) -> Duration {
        animation::cycle_duration(self.speed_level)
    }

    pub fn color(&self) -> Color {
        parse_color(&self.marker_color).unwrap_or(Color::Blue)
    }

    /// Current value of `field` as shown in the settings panel.
    pub fn display_value(&self, field: ConfigField) -> String {
        match field {
            ConfigField::Duration => format!("{}s", self.duration_secs),
            ConfigField::Rounds => self.total_rounds.to_string(),
            ConfigField::Speed => format!("{}/{}", self.speed_level, MAX_SPEED),
            ConfigField::MarkerSize => format!("{}px", self.marker_size),
            ConfigField::MarkerColor => self.marker_color.clone(),
            ConfigField::Sound => self.sound_id.clone(),
        }
    }

    /// Apply a raw user value. Invalid input keeps the previous value and
    /// returns false; speed is clamped into range rather than rejected.
    pub fn apply(&mut self, field: ConfigField, raw: &str) -> bool {
        let accepted = match field {
            ConfigField::Duration => positive(raw)
                .and_then(|v| u32::try_from(v).ok())
                .map(|v| self.duration_secs = v)
                .is_some(),
            ConfigField::Rounds => positive(raw)
                .and_then(|v| u32::try_from(v).ok())
                .map(|v| self.total_rounds = v)
                .is_some(),
            ConfigField::Speed => parse_int_lenient(raw)
                .map(|v| self.speed_level = v.clamp(MIN_SPEED.into(), MAX_SPEED.into()) as u8)
                .is_some(),
            ConfigField::MarkerSize => positive(raw)
                .and_then(|v| u16::try_from(v).ok())
                .map(|v| self.marker_size = v)
                .is_some(),
            ConfigField::MarkerColor => parse_color(raw)
                .map(|_| self.marker_color = raw.trim().to_string())
                .is_some(),
            ConfigField::Sound => {
                let id = raw.trim();
                if id.is_empty() {
                    false
                } else {
                    self.sound_id = id.to_string();
                    true
                }
            }
        };
        if !accepted {
            debug!(%field, raw, "ignored invalid config value");
        }
        accepted
    }

    /// Nudge `field` by `delta` steps. `sounds` is the catalog to cycle.
    pub fn step(&mut self, field: ConfigField, delta: i32, sounds: &[String]) -> bool {
        let delta = i64::from(delta);
        match field {
            ConfigField::Duration => {
                let v = (i64::from(self.duration_secs) + delta * DURATION_STEP).max(MIN_DURATION);
                self.apply(field, &v.to_string())
            }
            ConfigField::Rounds => {
                let v = (i64::from(self.total_rounds) + delta).max(1);
                self.apply(field, &v.to_string())
            }
            ConfigField::Speed => {
                let v = i64::from(self.speed_level) + delta;
                self.apply(field, &v.to_string())
            }
            ConfigField::MarkerSize => {
                let v = (i64::from(self.marker_size) + delta * SIZE_STEP).max(MIN_SIZE);
                self.apply(field, &v.to_string())
            }
            ConfigField::MarkerColor => {
                let next = cycle(COLOR_PALETTE, &self.marker_color, delta);
                self.apply(field, next)
            }
            ConfigField::Sound => {
                if sounds.is_empty() {
                    return false;
                }
                let next = cycle(sounds, &self.sound_id, delta).to_string();
                self.apply(field, &next)
            }
        }
    }
}

fn positive(raw: &str) -> Option<i64> {
    parse_int_lenient(raw).filter(|v| *v > 0)
}

fn cycle<'a, T: AsRef<str>>(items: &'a [T], current: &str, delta: i64) -> &'a str {
    let len = items.len() as i64;
    let idx = items
        .iter()
        .position(|s| s.as_ref().eq_ignore_ascii_case(current))
        .map_or(if delta >= 0 { -1 } else { 0 }, |i| i as i64);
    items[(idx + delta).rem_euclid(len) as usize].as_ref()
}
