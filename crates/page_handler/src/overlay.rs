//! Drawing surface for the hit-region highlight.

use crate::config::HighlightColor;
use anyhow::Result;
use hit_region::Coordinate;

/// Where the highlight for the visualized element is drawn.
pub trait Overlay {
    /// Replace the current highlight with `coords`, each covering one sampling
    /// cell. Failures are logged by the caller; the page keeps running.
    fn draw(&mut self, coords: &[Coordinate], color: &HighlightColor, opacity: f64) -> Result<()>;

    /// Remove any highlight.
    fn clear(&mut self);
}

/// A highlight as last drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
    pub coords: Vec<Coordinate>,
    pub color: HighlightColor,
    pub opacity: f64,
}

/// Overlay that keeps the last frame in memory, for headless hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingOverlay {
    frame: Option<OverlayFrame>,
    draws: usize,
    clears: usize,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current highlight, if any.
    pub fn frame(&self) -> Option<&OverlayFrame> {
        self.frame.as_ref()
    }

    pub fn draw_count(&self) -> usize {
        self.draws
    }

    pub fn clear_count(&self) -> usize {
        self.clears
    }
}

impl Overlay for RecordingOverlay {
    fn draw(&mut self, coords: &[Coordinate], color: &HighlightColor, opacity: f64) -> Result<()> {
        self.draws += 1;
        self.frame = Some(OverlayFrame {
            coords: coords.to_vec(),
            color: *color,
            opacity,
        });
        Ok(())
    }

    fn clear(&mut self) {
        self.clears += 1;
        self.frame = None;
    }
}
