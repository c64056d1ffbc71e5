//! Viewport sampling.
//!
//! A pass walks a regular grid over the viewport, asks the document which
//! element sits at each point, resolves that element to the interactive
//! element a click would reach and records the result in a fresh
//! `HitRegionIndex`. Passes can run to completion in one call (`calculate`) or
//! be driven in bounded slices (`SamplingPass::step`) so a cooperative caller
//! can yield between them. Either way the index is only handed out once every
//! point has been sampled.

use crate::classifier::find_interactive_ancestor;
use crate::coords::{Coordinate, CoordinateKey};
use crate::error::SamplingAbort;
use crate::index::{DEFAULT_MAX_COORDINATES_PER_ELEMENT, HitRegionIndex, Insertion};
use crate::stats::{Progress, SamplingStats};
use core::fmt;
use core::time::Duration;
use dom::{HostDocument, NodeKey, Viewport};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::info_span;

/// Passes running longer than this are aborted by default.
pub const DEFAULT_SAMPLING_TIMEOUT: Duration = Duration::from_secs(10);

/// Completed passes slower than this log a warning.
pub const SLOW_PASS_THRESHOLD: Duration = Duration::from_millis(500);

/// Coarsest supported grid spacing in pixels.
pub const MAX_RESOLUTION: u32 = 100;

/// Outcome of sampling one grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// The click reaches this interactive element.
    Hit(NodeKey),
    /// An element is there but neither it nor an ancestor is interactive.
    Miss(NodeKey),
    /// Nothing is rendered at the point.
    Empty,
    /// The hit element is no longer attached.
    Detached(NodeKey),
    /// The hit test failed for this point.
    Failed,
}

/// Grid points `x ∈ [0, width)`, `y ∈ [0, height)` spaced `resolution` apart,
/// in row-major order. A resolution of 0 is treated as 1; a zero dimension still
/// yields the origin row/column.
pub fn generate_grid(viewport: Viewport, resolution: u32) -> Vec<Coordinate> {
    let step = resolution.max(1);
    let width = viewport.width.max(1);
    let height = viewport.height.max(1);
    let columns = width.div_ceil(step) as usize;
    let rows = height.div_ceil(step) as usize;
    let mut grid = Vec::with_capacity(columns * rows);
    for y in (0..height).step_by(step as usize) {
        for x in (0..width).step_by(step as usize) {
            grid.push(Coordinate::new(x, y));
        }
    }
    grid
}

/// Sample a single point. Hit-test failures are logged and reported as
/// `Sample::Failed`, never propagated.
pub fn sample_one<D: HostDocument + ?Sized>(doc: &D, coord: Coordinate) -> Sample {
    match doc.element_from_point(coord.x, coord.y) {
        Err(err) => {
            debug!("Hit test failed at {coord}: {err:#}");
            Sample::Failed
        }
        Ok(None) => Sample::Empty,
        Ok(Some(node)) if !doc.is_attached(node) => Sample::Detached(node),
        Ok(Some(node)) => find_interactive_ancestor(doc, node).map_or(Sample::Miss(node), Sample::Hit),
    }
}

/// Resolution to suggest after a pass at `resolution` ran out of time.
pub fn suggest_coarser_resolution(resolution: u32) -> u32 {
    resolution.max(1).saturating_mul(2).min(MAX_RESOLUTION)
}

/// Coordinates that click `element`, sorted row-major. Empty for unknown elements.
pub fn get_hit_region(index: &HitRegionIndex, element: NodeKey) -> Vec<Coordinate> {
    let mut coords: Vec<Coordinate> = index
        .coordinates_of(element)
        .map(|set| set.iter().copied().map(CoordinateKey::decode).collect())
        .unwrap_or_default();
    coords.sort_unstable_by_key(|coord| coord.row_major());
    coords
}

/// Shared flag for cooperatively cancelling a pass.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle(Arc<AtomicBool>);

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-pass knobs.
pub struct SamplingOptions<'cb> {
    pub timeout: Duration,
    pub on_progress: Option<Box<dyn FnMut(Progress) + 'cb>>,
    pub cancellation: Option<CancellationHandle>,
    pub max_coordinates_per_element: usize,
}

impl Default for SamplingOptions<'_> {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SAMPLING_TIMEOUT,
            on_progress: None,
            cancellation: None,
            max_coordinates_per_element: DEFAULT_MAX_COORDINATES_PER_ELEMENT,
        }
    }
}

impl fmt::Debug for SamplingOptions<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SamplingOptions")
            .field("timeout", &self.timeout)
            .field("on_progress", &self.on_progress.is_some())
            .field("cancellation", &self.cancellation)
            .field("max_coordinates_per_element", &self.max_coordinates_per_element)
            .finish()
    }
}

impl<'cb> SamplingOptions<'cb> {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: impl FnMut(Progress) + 'cb) -> Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationHandle) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    #[must_use]
    pub fn with_max_coordinates_per_element(mut self, max: usize) -> Self {
        self.max_coordinates_per_element = max;
        self
    }
}

/// Where a pass stands after a `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Running,
    Complete,
    Aborted(SamplingAbort),
}

/// A resumable sampling pass.
pub struct SamplingPass<'cb> {
    resolution: u32,
    grid: Vec<Coordinate>,
    cursor: usize,
    /// Next tenth of the grid (1..=10) that has not been reported.
    next_tenth: usize,
    index: HitRegionIndex,
    stats: SamplingStats,
    started: Instant,
    options: SamplingOptions<'cb>,
    status: PassStatus,
}

impl fmt::Debug for SamplingPass<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SamplingPass")
            .field("resolution", &self.resolution)
            .field("cursor", &self.cursor)
            .field("total", &self.grid.len())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<'cb> SamplingPass<'cb> {
    /// Build the grid for the document's current viewport. The timeout clock
    /// starts now.
    pub fn new<D: HostDocument + ?Sized>(
        doc: &D,
        resolution: u32,
        options: SamplingOptions<'cb>,
    ) -> Self {
        let resolution = resolution.max(1);
        let viewport = doc.viewport();
        let grid = generate_grid(viewport, resolution);
        debug!(
            "Starting sampling pass: {}x{} viewport, resolution {}, {} points",
            viewport.width,
            viewport.height,
            resolution,
            grid.len()
        );
        let stats = SamplingStats {
            resolution,
            total: grid.len(),
            ..SamplingStats::default()
        };
        Self {
            resolution,
            next_tenth: 1,
            grid,
            cursor: 0,
            index: HitRegionIndex::with_max_per_element(options.max_coordinates_per_element),
            stats,
            started: Instant::now(),
            options,
            status: PassStatus::Running,
        }
    }

    pub fn status(&self) -> PassStatus {
        self.status
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn stats(&self) -> &SamplingStats {
        &self.stats
    }

    pub fn progress(&self) -> Progress {
        Progress::new(self.cursor, self.grid.len())
    }

    /// Sample up to `max_points` further points (at least one).
    pub fn step<D: HostDocument + ?Sized>(&mut self, doc: &D, max_points: usize) -> PassStatus {
        if self.status != PassStatus::Running {
            return self.status;
        }
        let _span = info_span!(
            "hit_region.step",
            resolution = self.resolution,
            cursor = self.cursor
        )
        .entered();
        let end = self.cursor.saturating_add(max_points.max(1)).min(self.grid.len());
        while self.cursor < end {
            if let Some(abort) = self.abort_reason() {
                self.abort(abort);
                return self.status;
            }
            let coord = self.grid[self.cursor];
            let sample = sample_one(doc, coord);
            self.stats.record(sample);
            if let Sample::Hit(element) = sample
                && self.index.insert(coord, element) == Insertion::Capped
            {
                self.stats.dropped_by_cap += 1;
            }
            self.cursor += 1;
            if self.tenth_reached() {
                self.report_progress();
                while self.tenth_reached() {
                    self.next_tenth += 1;
                }
            }
        }
        if self.cursor == self.grid.len() {
            self.complete();
        }
        self.status
    }

    /// Consume the pass. Yields the index only if every point was sampled.
    ///
    /// # Errors
    /// Returns the abort reason for an aborted pass, or
    /// `SamplingAbort::Unfinished` while points remain.
    pub fn finish(self) -> Result<(HitRegionIndex, SamplingStats), SamplingAbort> {
        match self.status {
            PassStatus::Complete => Ok((self.index, self.stats)),
            PassStatus::Aborted(abort) => Err(abort),
            PassStatus::Running => Err(SamplingAbort::Unfinished {
                remaining: self.grid.len() - self.cursor,
            }),
        }
    }

    fn abort_reason(&self) -> Option<SamplingAbort> {
        let (sampled, total) = (self.cursor, self.grid.len());
        if self
            .options
            .cancellation
            .as_ref()
            .is_some_and(CancellationHandle::is_cancelled)
        {
            return Some(SamplingAbort::Cancelled { sampled, total });
        }
        let elapsed = self.started.elapsed();
        (elapsed >= self.options.timeout).then(|| SamplingAbort::TimedOut {
            elapsed,
            sampled,
            total,
            suggested_resolution: suggest_coarser_resolution(self.resolution),
        })
    }

    /// Whether the cursor has reached the next unreported tenth of the grid,
    /// at `ceil(total * tenth / 10)` points.
    fn tenth_reached(&self) -> bool {
        self.next_tenth <= 10
            && self.cursor >= self.grid.len().saturating_mul(self.next_tenth).div_ceil(10)
    }

    fn report_progress(&mut self) {
        let progress = self.progress();
        if let Some(on_progress) = self.options.on_progress.as_mut() {
            on_progress(progress);
        }
    }

    fn abort(&mut self, abort: SamplingAbort) {
        self.stats.duration = self.started.elapsed();
        info!("Sampling pass aborted: {abort}");
        self.index.clear();
        self.status = PassStatus::Aborted(abort);
    }

    fn complete(&mut self) {
        self.stats.elements = self.index.element_count();
        self.stats.duration = self.started.elapsed();
        if self.stats.duration > SLOW_PASS_THRESHOLD {
            warn!(
                "Sampling {} points took {:?}; consider a sampling resolution of {}",
                self.stats.total,
                self.stats.duration,
                suggest_coarser_resolution(self.resolution)
            );
        }
        if self.stats.dropped_by_cap > 0 {
            warn!(
                "{} hit coordinates dropped by the per-element cap",
                self.stats.dropped_by_cap
            );
        }
        debug!(
            "Sampling pass complete: {} hits on {} elements in {:?}",
            self.stats.hits, self.stats.elements, self.stats.duration
        );
        self.status = PassStatus::Complete;
    }
}

/// Run a whole pass.
///
/// # Errors
/// Returns the abort reason if the pass was cancelled or ran out of time.
pub fn calculate<D: HostDocument + ?Sized>(
    doc: &D,
    resolution: u32,
    options: SamplingOptions<'_>,
) -> Result<(HitRegionIndex, SamplingStats), SamplingAbort> {
    let _span = info_span!("hit_region.calculate", resolution).entered();
    let mut pass = SamplingPass::new(doc, resolution, options);
    pass.step(doc, usize::MAX);
    pass.finish()
}
