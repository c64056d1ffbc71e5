//! Host document seam for hit-region sampling.
//!
//! This crate centralizes the types shared between the sampling engine and the
//! page orchestrator: stable node keys, the `HostDocument` trait that exposes the
//! point-hit-test primitive and the ancestor chain, the `DOMUpdate` mirror model,
//! and mutation records. `StaticDocument` is an arena-backed implementation with
//! axis-aligned layout boxes used by the command-line front end and the tests.

#![allow(
    clippy::module_name_repetitions,
    reason = "Types like DocumentScene read better than Scene at call sites"
)]
#![allow(clippy::missing_errors_doc, reason = "Errors are described per trait method")]

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod document;
pub mod mutation;
pub mod query;
pub mod scene;
pub mod style;

pub use document::StaticDocument;
pub use mutation::{MutatedNode, MutationRecord};
pub use scene::{Scene, SceneNode};
pub use style::StyleDeclarations;

// ============================
// Stable Node keys
// ============================

/// A 64-bit stable key for DOM nodes. The host document owns the node; holders of
/// a key own nothing and must check `HostDocument::is_attached` before trusting it.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document node key (always present).
    pub const ROOT: Self = Self(0);
}

// ============================
// Geometry
// ============================

/// Viewport dimensions in CSS pixels.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned border box of an element in viewport coordinates.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct LayoutRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl LayoutRect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Half-open containment: `[x, x + width) × [y, y + height)`.
    #[inline]
    pub fn contains(&self, px: i64, py: i64) -> bool {
        let left = i64::from(self.x);
        let top = i64::from(self.y);
        px >= left
            && py >= top
            && px < left + i64::from(self.width)
            && py < top + i64::from(self.height)
    }
}

/// Computed value of the `pointer-events` property.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum PointerEvents {
    #[default]
    Auto,
    None,
}

// ============================
// DOM Update model + mirror pattern
// ============================

/// A batchable update applied to a document and mirrored to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DOMUpdate {
    InsertElement { parent: NodeKey, node: NodeKey, tag: String, pos: usize },
    InsertText { parent: NodeKey, node: NodeKey, text: String, pos: usize },
    SetAttr { node: NodeKey, name: String, value: String },
    RemoveAttr { node: NodeKey, name: String },
    SetText { node: NodeKey, text: String },
    SetLayout { node: NodeKey, rect: Option<LayoutRect> },
    RemoveNode { node: NodeKey },
    EndOfDocument,
}

/// A subscriber that receives `DOMUpdate` values and mirrors them into its own state.
pub trait DOMSubscriber {
    /// Apply a single `DOMUpdate` to the subscriber state.
    fn apply_update(&mut self, update: DOMUpdate) -> Result<()>;
}

// ============================
// Host document seam
// ============================

/// Read-only view of the host document used by the classifier and the sampler.
pub trait HostDocument {
    /// Current viewport size.
    fn viewport(&self) -> Viewport;

    /// Point-hit-test primitive: the topmost rendered element at `(x, y)`.
    ///
    /// # Errors
    /// Implementations may fail for individual points; callers treat a failure as
    /// "no element here".
    fn element_from_point(&self, x: u32, y: u32) -> Result<Option<NodeKey>>;

    /// Parent of `node`, or `None` at the document root or for unknown keys.
    fn parent(&self, node: NodeKey) -> Option<NodeKey>;

    /// Whether `node` is still connected to the document.
    fn is_attached(&self, node: NodeKey) -> bool;

    /// Lowercase tag name for element nodes, `None` for text/document/unknown nodes.
    fn tag_name(&self, node: NodeKey) -> Option<&str>;

    /// Whether `node` is an element.
    fn is_element(&self, node: NodeKey) -> bool {
        self.tag_name(node).is_some()
    }

    /// Attribute value by ASCII-case-insensitive name.
    fn attribute(&self, node: NodeKey, name: &str) -> Option<&str>;

    /// Computed (inherited) `pointer-events` of `node`.
    fn pointer_events(&self, node: NodeKey) -> PointerEvents;

    /// Element with the given `id` attribute (case-sensitive).
    fn element_by_id(&self, id: &str) -> Option<NodeKey>;

    /// First element in document order matching a CSS selector.
    ///
    /// # Errors
    /// Returns an error for selectors the document cannot parse.
    fn query_selector(&self, selector: &str) -> Result<Option<NodeKey>>;

    /// First element in document order selected by an XPath expression.
    ///
    /// # Errors
    /// Returns an error for expressions the document cannot parse.
    fn evaluate_xpath(&self, expression: &str) -> Result<Option<NodeKey>>;
}

/// A document that accepts updates and reports what changed, the way a page's
/// mutation and resize observers do.
pub trait ObservedDocument: HostDocument + DOMSubscriber {
    /// Drain the mutation records queued since the last call.
    fn take_records(&mut self) -> Vec<MutationRecord>;

    /// Resize the viewport.
    fn set_viewport(&mut self, viewport: Viewport);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_rect_is_half_open() {
        let rect = LayoutRect::new(0, 0, 60, 60);
        assert!(rect.contains(0, 0));
        assert!(rect.contains(59, 59));
        assert!(!rect.contains(60, 10));
        assert!(!rect.contains(10, 60));
        assert!(!rect.contains(-1, 0));
    }

    #[test]
    fn empty_rect_contains_nothing() {
        let rect = LayoutRect::new(5, 5, 0, 10);
        assert!(!rect.contains(5, 5));
    }
}
