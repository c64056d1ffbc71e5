#![allow(dead_code, reason = "Each integration test uses a different subset of helpers")]

use anyhow::{Result, anyhow};
use dom::{HostDocument, LayoutRect, NodeKey, PointerEvents, StaticDocument, Viewport};
use std::cell::Cell;

pub fn init_logging() {
    let _log_init: Result<(), _> = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// A page with a full-viewport `body` box.
pub fn page(width: u32, height: u32) -> Result<(StaticDocument, NodeKey)> {
    let mut doc = StaticDocument::new(Viewport::new(width, height));
    let body = doc.append_element(NodeKey::ROOT, "body", &[])?;
    doc.set_layout(body, LayoutRect::new(0, 0, width as i32, height as i32))?;
    Ok((doc, body))
}

/// Append an element with a layout box.
pub fn boxed(
    doc: &mut StaticDocument,
    parent: NodeKey,
    tag: &str,
    attrs: &[(&str, &str)],
    rect: LayoutRect,
) -> Result<NodeKey> {
    let node = doc.append_element(parent, tag, attrs)?;
    doc.set_layout(node, rect)?;
    Ok(node)
}

/// Wraps a document and makes selected points misbehave.
pub struct FlakyDocument<'doc> {
    pub inner: &'doc StaticDocument,
    /// Points whose hit test errors.
    pub failing: Vec<(u32, u32)>,
    /// Points that report a node which is not in the document.
    pub ghost: Vec<(u32, u32)>,
    pub calls: Cell<usize>,
}

pub const GHOST: NodeKey = NodeKey(u64::MAX);

impl<'doc> FlakyDocument<'doc> {
    pub fn new(inner: &'doc StaticDocument) -> Self {
        Self {
            inner,
            failing: Vec::new(),
            ghost: Vec::new(),
            calls: Cell::new(0),
        }
    }
}

impl HostDocument for FlakyDocument<'_> {
    fn viewport(&self) -> Viewport {
        self.inner.viewport()
    }

    fn element_from_point(&self, x: u32, y: u32) -> Result<Option<NodeKey>> {
        self.calls.set(self.calls.get() + 1);
        if self.failing.contains(&(x, y)) {
            return Err(anyhow!("hit test unavailable at {x},{y}"));
        }
        if self.ghost.contains(&(x, y)) {
            return Ok(Some(GHOST));
        }
        self.inner.element_from_point(x, y)
    }

    fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.inner.parent(node)
    }

    fn is_attached(&self, node: NodeKey) -> bool {
        self.inner.is_attached(node)
    }

    fn tag_name(&self, node: NodeKey) -> Option<&str> {
        self.inner.tag_name(node)
    }

    fn attribute(&self, node: NodeKey, name: &str) -> Option<&str> {
        self.inner.attribute(node, name)
    }

    fn pointer_events(&self, node: NodeKey) -> PointerEvents {
        self.inner.pointer_events(node)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeKey> {
        self.inner.element_by_id(id)
    }

    fn query_selector(&self, selector: &str) -> Result<Option<NodeKey>> {
        self.inner.query_selector(selector)
    }

    fn evaluate_xpath(&self, expression: &str) -> Result<Option<NodeKey>> {
        self.inner.evaluate_xpath(expression)
    }
}
