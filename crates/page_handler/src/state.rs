//! Hit-region state for one page.
//!
//! `PageContext` owns the observed document, the overlay, the latest completed
//! index and at most one in-flight sampling pass. It is driven synchronously:
//! callers feed it events with the current time, fire debounce deadlines and
//! run sampling slices. `runtime::run` does that from an async loop.

use crate::config::{EngineConfig, HitmapSettings};
use crate::events::{PageEvent, PageNotice};
use crate::invalidation::any_relevant;
use crate::overlay::Overlay;
use crate::scheduler::Debouncer;
use crate::selection::{ElementIdentifier, resolve};
use crate::store::ConfigChange;
use crate::telemetry::{self, PerfCounters};
use dom::{DOMUpdate, NodeKey, ObservedDocument, Viewport};
use hit_region::{
    CancellationHandle, Coordinate, HitRegionIndex, PassStatus, SamplingOptions, SamplingPass,
    get_hit_region,
};
use log::{debug, info, trace, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::info_span;

/// Send a notice, ignoring a host that stopped listening.
fn send_notice(notices: &UnboundedSender<PageNotice>, notice: PageNotice) {
    if let Err(err) = notices.send(notice) {
        trace!("Notice receiver gone; dropped {:?}", err.0);
    }
}

/// The pass currently being sampled.
struct ActivePass {
    pass: SamplingPass<'static>,
    cancellation: CancellationHandle,
}

pub struct PageContext<D, O> {
    doc: D,
    overlay: O,
    settings: HitmapSettings,
    config: EngineConfig,
    /// Latest completed index; `None` until a pass completes or after invalidation.
    index: Option<HitRegionIndex>,
    /// Element whose hit region is shown.
    visualized: Option<NodeKey>,
    mutation_debounce: Debouncer,
    resize_debounce: Debouncer,
    active: Option<ActivePass>,
    /// A rebuild was requested while a pass was in flight.
    rerun: bool,
    counters: PerfCounters,
    notices: UnboundedSender<PageNotice>,
}

impl<D: ObservedDocument, O: Overlay> PageContext<D, O> {
    pub fn new(
        doc: D,
        overlay: O,
        settings: HitmapSettings,
        config: EngineConfig,
        notices: UnboundedSender<PageNotice>,
    ) -> Self {
        Self {
            doc,
            overlay,
            settings: settings.validated(),
            mutation_debounce: Debouncer::new(config.mutation_debounce()),
            resize_debounce: Debouncer::new(config.resize_debounce()),
            config,
            index: None,
            visualized: None,
            active: None,
            rerun: false,
            counters: PerfCounters::default(),
            notices,
        }
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    pub fn settings(&self) -> &HitmapSettings {
        &self.settings
    }

    pub fn index(&self) -> Option<&HitRegionIndex> {
        self.index.as_ref()
    }

    pub fn visualized(&self) -> Option<NodeKey> {
        self.visualized
    }

    pub fn counters(&self) -> &PerfCounters {
        &self.counters
    }

    pub fn is_pass_in_flight(&self) -> bool {
        self.active.is_some()
    }

    /// Hit region of `element` in the current index (empty without one).
    pub fn hit_region_of(&self, element: NodeKey) -> Vec<Coordinate> {
        self.index
            .as_ref()
            .map(|index| get_hit_region(index, element))
            .unwrap_or_default()
    }

    /// Earliest pending debounce deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (
            self.mutation_debounce.deadline(),
            self.resize_debounce.deadline(),
        ) {
            (Some(mutation), Some(resize)) => Some(mutation.min(resize)),
            (mutation, resize) => mutation.or(resize),
        }
    }

    /// Apply one inbound event. Returns `false` once the page should stop.
    pub fn handle_event(&mut self, event: PageEvent, now: Instant) -> bool {
        match event {
            // Hover previews and selection both drive the visualized element.
            PageEvent::ElementSelected(identifier) | PageEvent::ElementHovered(identifier) => {
                self.select(&identifier);
            }
            PageEvent::ElementDeselected => {
                self.visualized = None;
                self.clear_overlay();
            }
            PageEvent::DomUpdates(batch) => self.apply_dom_updates(batch, now),
            PageEvent::Resized(viewport) => self.resize(viewport, now),
            PageEvent::Recalculate => self.invalidate(true),
            PageEvent::Shutdown => return false,
        }
        true
    }

    /// Resolve and visualize `identifier`, starting a pass if no index exists yet.
    pub fn select(&mut self, identifier: &ElementIdentifier) {
        match resolve(&self.doc, identifier) {
            Ok(node) => {
                debug!("Selected element {} via {identifier}", node.0);
                self.visualized = Some(node);
                if self.index.is_some() {
                    self.visualize();
                } else if self.active.is_none() {
                    self.start_pass();
                }
            }
            Err(err) => {
                info!("Selection failed: {err}");
                send_notice(
                    &self.notices,
                    PageNotice::SelectionFailed {
                        identifier: identifier.clone(),
                        reason: err.to_string(),
                    },
                );
            }
        }
    }

    fn apply_dom_updates(&mut self, batch: Vec<DOMUpdate>, now: Instant) {
        for update in batch {
            if let Err(err) = self.doc.apply_update(update) {
                warn!("Skipping DOM update: {err:#}");
            }
        }
        let records = self.doc.take_records();
        if any_relevant(&records, &self.doc) {
            trace!("{} mutation records, at least one relevant", records.len());
            if self.mutation_debounce.is_armed() {
                self.counters.coalesced_triggers += 1;
            }
            self.mutation_debounce.signal(now);
        }
    }

    fn resize(&mut self, viewport: Viewport, now: Instant) {
        if self.doc.viewport() == viewport {
            return;
        }
        self.doc.set_viewport(viewport);
        if self.resize_debounce.is_armed() {
            self.counters.coalesced_triggers += 1;
        }
        self.resize_debounce.signal(now);
    }

    /// Fire debouncers whose quiet window has passed.
    pub fn fire_due(&mut self, now: Instant) {
        // Both must be polled so a due pair fires (and resets) together.
        let mutation = self.mutation_debounce.fire_if_due(now);
        let resize = self.resize_debounce.fire_if_due(now);
        if mutation || resize {
            self.invalidate(false);
        }
    }

    /// Discard the index and the highlight drawn from it. Rebuild when forced
    /// or when auto-recalculation is on.
    pub fn invalidate(&mut self, force: bool) {
        self.index = None;
        self.clear_overlay();
        if force || self.settings.auto_recalculate {
            self.request_rebuild();
        } else {
            debug!("Index invalidated; automatic recalculation is off");
        }
    }

    /// Start a pass, or mark the in-flight one for a rerun.
    pub fn request_rebuild(&mut self) {
        if self.active.is_some() {
            self.rerun = true;
        } else {
            self.start_pass();
        }
    }

    fn start_pass(&mut self) {
        let resolution = self.settings.sampling_resolution;
        let _span = info_span!("page.start_pass", resolution).entered();
        let cancellation = CancellationHandle::new();
        let progress_notices = self.notices.clone();
        let options = SamplingOptions::default()
            .with_timeout(self.config.sampling_timeout())
            .with_max_coordinates_per_element(self.config.max_coordinates_per_element)
            .with_cancellation(cancellation.clone())
            .with_progress(move |progress| {
                send_notice(&progress_notices, PageNotice::Progress(progress));
            });
        let pass = SamplingPass::new(&self.doc, resolution, options);
        send_notice(
            &self.notices,
            PageNotice::PassStarted {
                resolution,
                total: pass.stats().total,
            },
        );
        self.active = Some(ActivePass { pass, cancellation });
    }

    /// Sample the next slice of the in-flight pass. Returns whether a pass is
    /// still in flight afterwards.
    pub fn run_chunk(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let _span = info_span!("page.run_chunk").entered();
        match active.pass.step(&self.doc, self.config.chunk_size) {
            PassStatus::Running => return true,
            PassStatus::Complete | PassStatus::Aborted(_) => {}
        }
        if let Some(finished) = self.active.take() {
            self.settle(finished);
        }
        self.active.is_some()
    }

    fn settle(&mut self, finished: ActivePass) {
        match finished.pass.finish() {
            Ok((mut index, stats)) => {
                // Nodes removed between slices may still be referenced.
                let dropped = index.retain_attached(&self.doc);
                if dropped > 0 {
                    debug!("Dropped {dropped} detached elements from the new index");
                }
                self.counters.record_completed(&stats);
                telemetry::maybe_emit(
                    self.config.telemetry_enabled,
                    &telemetry::perf_counters_json(&self.counters),
                );
                send_notice(&self.notices, PageNotice::PassCompleted(stats));
                if self.rerun {
                    debug!("Discarding pass superseded by later changes");
                } else {
                    self.index = Some(index);
                    self.visualize();
                }
            }
            Err(abort) => {
                self.counters.record_aborted();
                if self.index.is_none() {
                    self.clear_overlay();
                }
                send_notice(
                    &self.notices,
                    PageNotice::PassAborted {
                        reason: abort.reason(),
                        suggested_resolution: abort.suggested_resolution(),
                    },
                );
            }
        }
        if self.rerun {
            self.rerun = false;
            self.start_pass();
        }
    }

    /// Draw the visualized element's hit region from the current index.
    fn visualize(&mut self) {
        let Some(element) = self.visualized else {
            return;
        };
        if !self.doc.is_attached(element) {
            info!("Visualized element {} was removed from the page", element.0);
            self.visualized = None;
            self.clear_overlay();
            return;
        }
        let Some(index) = self.index.as_ref() else {
            return;
        };
        let coords = get_hit_region(index, element);
        if coords.is_empty() {
            info!("Element {} has no clickable coordinates", element.0);
            self.clear_overlay();
            return;
        }
        let color = self.settings.highlight();
        match self
            .overlay
            .draw(&coords, &color, self.settings.highlight_opacity)
        {
            Ok(()) => send_notice(
                &self.notices,
                PageNotice::Drawn {
                    element,
                    coordinates: coords.len(),
                },
            ),
            Err(err) => {
                warn!("Failed to draw hit region overlay: {err:#}");
                self.clear_overlay();
            }
        }
    }

    fn clear_overlay(&mut self) {
        self.overlay.clear();
        send_notice(&self.notices, PageNotice::Cleared);
    }

    /// React to a settings change from the store.
    pub fn apply_config_change(&mut self, change: ConfigChange) {
        let ConfigChange { old, new } = change;
        self.replace_settings(new);
        if old.sampling_resolution != self.settings.sampling_resolution {
            info!(
                "Sampling resolution changed to {}",
                self.settings.sampling_resolution
            );
            self.invalidate(false);
        } else if old.highlight_color != self.settings.highlight_color
            || old.highlight_opacity.to_bits() != self.settings.highlight_opacity.to_bits()
        {
            self.visualize();
        }
    }

    pub fn replace_settings(&mut self, settings: HitmapSettings) {
        self.settings = settings.validated();
    }

    /// Cancel the in-flight pass, if any, and settle it as aborted. The
    /// previous index, if one survived, stays in place.
    pub fn cancel_pass(&mut self) {
        self.rerun = false;
        if let Some(active) = &self.active {
            active.cancellation.cancel();
            self.run_chunk();
        }
    }

    /// Cancel any pass and drop all derived state.
    pub fn shutdown(&mut self) {
        self.cancel_pass();
        self.mutation_debounce.cancel();
        self.resize_debounce.cancel();
        self.index = None;
        self.visualized = None;
        self.clear_overlay();
    }
}
