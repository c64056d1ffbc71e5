//! Configuration for the hit-region page handler.
//!
//! Two layers: `HitmapSettings` is the user-facing record persisted by a
//! `ConfigStore` and changed at runtime, while `EngineConfig` carries process
//! tuning knobs read once from the environment.

use core::fmt;
use core::ops::Range;
use core::time::Duration;
use hit_region::{DEFAULT_MAX_COORDINATES_PER_ELEMENT, MAX_RESOLUTION};
use log::warn;
use serde::{Deserialize, Serialize};
use std::env;

/// Grid spacing used when nothing else is configured.
pub const DEFAULT_SAMPLING_RESOLUTION: u32 = 10;
/// Highlight color used when nothing else is configured.
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "FF0000";
/// Highlight opacity used when nothing else is configured.
pub const DEFAULT_HIGHLIGHT_OPACITY: f64 = 0.3;

/// An RGB highlight color, written as six hex digits without a leading `#`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HighlightColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl HighlightColor {
    /// Parse `RRGGBB` (an optional leading `#` is accepted).
    pub fn parse(source: &str) -> Option<Self> {
        let hex = source.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
        Some(Self {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }
}

impl Default for HighlightColor {
    fn default() -> Self {
        Self {
            red: 0xFF,
            green: 0,
            blue: 0,
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

/// User-facing settings, persisted as camelCase JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HitmapSettings {
    /// Grid spacing in pixels, `1..=100`.
    pub sampling_resolution: u32,
    /// Six hex digits.
    pub highlight_color: String,
    /// `0.0..=1.0`.
    pub highlight_opacity: f64,
    /// Recompute automatically after relevant page changes.
    pub auto_recalculate: bool,
}

impl Default for HitmapSettings {
    fn default() -> Self {
        Self {
            sampling_resolution: DEFAULT_SAMPLING_RESOLUTION,
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_owned(),
            highlight_opacity: DEFAULT_HIGHLIGHT_OPACITY,
            auto_recalculate: true,
        }
    }
}

impl HitmapSettings {
    /// Clamp or replace out-of-range values. Never fails.
    #[must_use]
    pub fn validated(mut self) -> Self {
        let resolution = self.sampling_resolution.clamp(1, MAX_RESOLUTION);
        if resolution != self.sampling_resolution {
            warn!(
                "Sampling resolution {} out of range; using {resolution}",
                self.sampling_resolution
            );
            self.sampling_resolution = resolution;
        }
        match HighlightColor::parse(&self.highlight_color) {
            Some(color) => self.highlight_color = color.to_string(),
            None => {
                warn!(
                    "Invalid highlight color {:?}; using {DEFAULT_HIGHLIGHT_COLOR}",
                    self.highlight_color
                );
                self.highlight_color = DEFAULT_HIGHLIGHT_COLOR.to_owned();
            }
        }
        if self.highlight_opacity.is_nan() {
            self.highlight_opacity = DEFAULT_HIGHLIGHT_OPACITY;
        } else {
            self.highlight_opacity = self.highlight_opacity.clamp(0.0, 1.0);
        }
        self
    }

    /// Parsed highlight color, falling back to the default.
    pub fn highlight(&self) -> HighlightColor {
        HighlightColor::parse(&self.highlight_color).unwrap_or_default()
    }
}

/// Process-level tuning knobs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Abort a sampling pass after this many milliseconds.
    pub sampling_timeout_ms: u64,
    /// Quiet period after the last relevant mutation before recalculating.
    pub mutation_debounce_ms: u64,
    /// Quiet period after the last resize before recalculating.
    pub resize_debounce_ms: u64,
    /// Grid points sampled per cooperative slice.
    pub chunk_size: usize,
    /// Per-element coordinate cap of the index.
    pub max_coordinates_per_element: usize,
    /// Emit a JSON telemetry line per pass.
    pub telemetry_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    pub const fn new() -> Self {
        Self {
            sampling_timeout_ms: 10_000,
            mutation_debounce_ms: 300,
            resize_debounce_ms: 200,
            chunk_size: 512,
            max_coordinates_per_element: DEFAULT_MAX_COORDINATES_PER_ELEMENT,
            telemetry_enabled: false,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `HITMAP_SAMPLING_TIMEOUT_MS` (default 10000)
    /// - `HITMAP_MUTATION_DEBOUNCE_MS` (default 300)
    /// - `HITMAP_RESIZE_DEBOUNCE_MS` (default 200)
    /// - `HITMAP_CHUNK_SIZE` (default 512, at least 1)
    /// - `HITMAP_MAX_COORDINATES_PER_ELEMENT` (default 10000, at least 1)
    /// - `HITMAP_TELEMETRY`: "1" enables telemetry
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::new();
        let number = |name: &str| env::var(name).ok().and_then(|val| val.trim().parse::<u64>().ok());
        Self {
            sampling_timeout_ms: number("HITMAP_SAMPLING_TIMEOUT_MS")
                .unwrap_or(defaults.sampling_timeout_ms),
            mutation_debounce_ms: number("HITMAP_MUTATION_DEBOUNCE_MS")
                .unwrap_or(defaults.mutation_debounce_ms),
            resize_debounce_ms: number("HITMAP_RESIZE_DEBOUNCE_MS")
                .unwrap_or(defaults.resize_debounce_ms),
            chunk_size: number("HITMAP_CHUNK_SIZE")
                .map_or(defaults.chunk_size, |val| val as usize)
                .max(1),
            max_coordinates_per_element: number("HITMAP_MAX_COORDINATES_PER_ELEMENT")
                .map_or(defaults.max_coordinates_per_element, |val| val as usize)
                .max(1),
            telemetry_enabled: env::var("HITMAP_TELEMETRY").ok().as_deref() == Some("1"),
        }
    }

    #[inline]
    pub const fn sampling_timeout(&self) -> Duration {
        Duration::from_millis(self.sampling_timeout_ms)
    }

    #[inline]
    pub const fn mutation_debounce(&self) -> Duration {
        Duration::from_millis(self.mutation_debounce_ms)
    }

    #[inline]
    pub const fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}
