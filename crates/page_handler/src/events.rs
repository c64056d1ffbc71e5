//! Messages into and out of a page.

use crate::selection::ElementIdentifier;
use dom::{DOMUpdate, NodeKey, Viewport};
use hit_region::{Progress, SamplingStats};

/// Inbound page event.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// The inspector selected an element.
    ElementSelected(ElementIdentifier),
    /// The pointer is hovering an element in the inspector.
    ElementHovered(ElementIdentifier),
    /// Stop visualizing.
    ElementDeselected,
    /// A batch of document changes.
    DomUpdates(Vec<DOMUpdate>),
    /// The viewport changed size.
    Resized(Viewport),
    /// Recalculate now, regardless of `autoRecalculate`.
    Recalculate,
    Shutdown,
}

/// Outbound notification for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum PageNotice {
    SelectionFailed {
        identifier: ElementIdentifier,
        reason: String,
    },
    PassStarted {
        resolution: u32,
        total: usize,
    },
    Progress(Progress),
    PassCompleted(SamplingStats),
    PassAborted {
        reason: &'static str,
        suggested_resolution: Option<u32>,
    },
    /// The highlight for `element` was drawn with `coordinates` cells.
    Drawn {
        element: NodeKey,
        coordinates: usize,
    },
    /// The highlight was removed.
    Cleared,
}
