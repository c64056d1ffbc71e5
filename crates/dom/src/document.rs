//! In-memory document with layout boxes and a point-hit-test primitive.
//!
//! Nodes live in an `indextree` arena; `NodeKey`s map onto arena ids only while
//! the node is attached, so a removed node's key simply stops resolving. Every
//! applied `DOMUpdate` queues the `MutationRecord` an observer would see.

use crate::mutation::{MutatedNode, MutationRecord};
use crate::query::{Selector, XPath};
use crate::style::StyleDeclarations;
use crate::{
    DOMSubscriber, DOMUpdate, HostDocument, LayoutRect, NodeKey, ObservedDocument, PointerEvents,
    Viewport,
};
use anyhow::{Result, anyhow, bail};
use core::mem;
use indextree::{Arena, Node, NodeId};
use log::trace;
use smallvec::SmallVec;
use std::cell::OnceCell;
use std::collections::HashMap;

/// Node payload kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element { tag: String },
    Text { text: String },
}

#[derive(Debug, Clone, Default)]
struct NodeData {
    key: NodeKey,
    kind: NodeKind,
    attrs: SmallVec<[(String, String); 4]>,
    layout: Option<LayoutRect>,
}

/// A rendered, hit-testable element box in paint order.
#[derive(Debug, Clone, Copy)]
struct HitBox {
    key: NodeKey,
    rect: LayoutRect,
    z_index: i32,
}

#[derive(Debug)]
pub struct StaticDocument {
    arena: Arena<NodeData>,
    root: NodeId,
    /// Attached nodes only.
    ids: HashMap<NodeKey, NodeId>,
    /// `id` attribute -> element.
    id_index: HashMap<String, NodeKey>,
    viewport: Viewport,
    next_key: u64,
    records: Vec<MutationRecord>,
    /// Paint list cache, reset by every update.
    paint_list: OnceCell<Vec<HitBox>>,
}

impl StaticDocument {
    pub fn new(viewport: Viewport) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData::default());
        let mut ids = HashMap::new();
        ids.insert(NodeKey::ROOT, root);
        Self {
            arena,
            root,
            ids,
            id_index: HashMap::new(),
            viewport,
            next_key: 1,
            records: Vec::new(),
            paint_list: OnceCell::new(),
        }
    }

    /// Mint a key that no node in this document has used.
    pub fn mint_key(&mut self) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key = self.next_key.wrapping_add(1);
        key
    }

    /// Append an element with the given attributes under `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeKey,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<NodeKey> {
        let node = self.mint_key();
        self.apply_update(DOMUpdate::InsertElement {
            parent,
            node,
            tag: tag.to_owned(),
            pos: usize::MAX,
        })?;
        for (name, value) in attrs {
            self.apply_update(DOMUpdate::SetAttr {
                node,
                name: (*name).to_owned(),
                value: (*value).to_owned(),
            })?;
        }
        Ok(node)
    }

    /// Append a text node under `parent`.
    pub fn append_text(&mut self, parent: NodeKey, text: &str) -> Result<NodeKey> {
        let node = self.mint_key();
        self.apply_update(DOMUpdate::InsertText {
            parent,
            node,
            text: text.to_owned(),
            pos: usize::MAX,
        })?;
        Ok(node)
    }

    pub fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str) -> Result<()> {
        self.apply_update(DOMUpdate::SetAttr {
            node,
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }

    pub fn set_layout(&mut self, node: NodeKey, rect: LayoutRect) -> Result<()> {
        self.apply_update(DOMUpdate::SetLayout {
            node,
            rect: Some(rect),
        })
    }

    pub fn remove_node(&mut self, node: NodeKey) -> Result<()> {
        self.apply_update(DOMUpdate::RemoveNode { node })
    }

    /// Child keys of `node` in document order.
    pub fn children(&self, node: NodeKey) -> Vec<NodeKey> {
        self.ids.get(&node).map_or_else(Vec::new, |id| {
            id.children(&self.arena)
                .filter_map(|child| self.key_of(child))
                .collect()
        })
    }

    /// `node` and all of its descendants in document (pre-)order.
    pub fn descendants(&self, node: NodeKey) -> Vec<NodeKey> {
        self.ids.get(&node).map_or_else(Vec::new, |id| {
            id.descendants(&self.arena)
                .filter_map(|desc| self.key_of(desc))
                .collect()
        })
    }

    /// Layout box of `node`, if it has one.
    pub fn layout(&self, node: NodeKey) -> Option<LayoutRect> {
        self.data(node).and_then(|data| data.layout)
    }

    /// Text content of a text node.
    pub fn text(&self, node: NodeKey) -> Option<&str> {
        match &self.data(node)?.kind {
            NodeKind::Text { text } => Some(text),
            NodeKind::Document | NodeKind::Element { .. } => None,
        }
    }

    /// Number of attached nodes, including the document node.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.len() <= 1
    }

    fn key_of(&self, id: NodeId) -> Option<NodeKey> {
        self.arena.get(id).map(|node| node.get().key)
    }

    fn data(&self, key: NodeKey) -> Option<&NodeData> {
        let id = self.ids.get(&key)?;
        self.arena.get(*id).map(Node::get)
    }

    fn data_mut(&mut self, key: NodeKey) -> Result<&mut NodeData> {
        let id = *self
            .ids
            .get(&key)
            .ok_or_else(|| anyhow!("unknown node {}", key.0))?;
        self.arena
            .get_mut(id)
            .map(Node::get_mut)
            .ok_or_else(|| anyhow!("node {} missing from arena", key.0))
    }

    fn inline_style(&self, key: NodeKey) -> Option<StyleDeclarations> {
        self.attribute(key, "style").map(StyleDeclarations::parse)
    }

    /// Keys from `node` up to the document root, inclusive.
    fn ancestors_inclusive(&self, node: NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        let start = self.ids.get(&node).copied();
        start
            .into_iter()
            .flat_map(|id| id.ancestors(&self.arena))
            .filter_map(|id| self.key_of(id))
    }

    /// Whether `node` generates a box: neither it nor an ancestor is
    /// `display: none` (or `hidden`), and its inherited visibility is visible.
    fn is_rendered(&self, node: NodeKey) -> bool {
        let mut visibility: Option<bool> = None;
        for key in self.ancestors_inclusive(node) {
            if self.attribute(key, "hidden").is_some() {
                return false;
            }
            let Some(style) = self.inline_style(key) else {
                continue;
            };
            if style.has_keyword("display", "none") {
                return false;
            }
            if visibility.is_none()
                && let Some(value) = style.get("visibility")
                && !value.eq_ignore_ascii_case("inherit")
            {
                visibility = Some(value.eq_ignore_ascii_case("visible"));
            }
        }
        visibility.unwrap_or(true)
    }

    /// z-index of the nearest positioned ancestor (inclusive) that sets one.
    fn stacking_z(&self, node: NodeKey) -> i32 {
        for key in self.ancestors_inclusive(node) {
            let Some(style) = self.inline_style(key) else {
                continue;
            };
            let positioned = style
                .get("position")
                .is_some_and(|pos| !pos.eq_ignore_ascii_case("static"));
            if positioned
                && let Some(z_index) = style.get("z-index").and_then(|z| z.parse::<i32>().ok())
            {
                return z_index;
            }
        }
        0
    }

    fn build_paint_list(&self) -> Vec<HitBox> {
        let mut boxes: Vec<HitBox> = self
            .root
            .descendants(&self.arena)
            .filter_map(|id| self.arena.get(id).map(Node::get))
            .filter(|data| matches!(data.kind, NodeKind::Element { .. }))
            .filter_map(|data| data.layout.map(|rect| (data.key, rect)))
            .filter(|(key, _)| {
                self.is_rendered(*key) && self.pointer_events(*key) != PointerEvents::None
            })
            .map(|(key, rect)| HitBox {
                key,
                rect,
                z_index: self.stacking_z(key),
            })
            .collect();
        // Stable: document order is kept within one z level.
        boxes.sort_by_key(|hit| hit.z_index);
        trace!("Rebuilt paint list with {} hit boxes", boxes.len());
        boxes
    }

    fn attach(&mut self, parent: NodeKey, child: NodeId, pos: usize) -> Result<()> {
        let parent_id = *self
            .ids
            .get(&parent)
            .ok_or_else(|| anyhow!("unknown parent {}", parent.0))?;
        let sibling = parent_id.children(&self.arena).nth(pos);
        match sibling {
            Some(sibling) => sibling.checked_insert_before(child, &mut self.arena),
            None => parent_id.checked_append(child, &mut self.arena),
        }
        .map_err(|err| anyhow!("failed to attach node under {}: {err}", parent.0))
    }

    fn insert(&mut self, parent: NodeKey, node: NodeKey, kind: NodeKind, pos: usize) -> Result<()> {
        if self.ids.contains_key(&node) {
            bail!("node {} is already in the document", node.0);
        }
        let is_element = matches!(kind, NodeKind::Element { .. });
        let id = self.arena.new_node(NodeData {
            key: node,
            kind,
            ..NodeData::default()
        });
        if let Err(err) = self.attach(parent, id, pos) {
            id.remove(&mut self.arena);
            return Err(err);
        }
        self.ids.insert(node, id);
        self.next_key = self.next_key.max(node.0.wrapping_add(1));
        self.records.push(MutationRecord::ChildList {
            target: parent,
            added: vec![MutatedNode {
                key: node,
                is_element,
            }],
            removed: Vec::new(),
        });
        Ok(())
    }

    fn set_attr(&mut self, node: NodeKey, name: &str, value: Option<String>) -> Result<()> {
        let name_lc = name.to_ascii_lowercase();
        let data = self.data_mut(node)?;
        if !matches!(data.kind, NodeKind::Element { .. }) {
            bail!("node {} is not an element", node.0);
        }
        let position = data.attrs.iter().position(|(attr, _)| *attr == name_lc);
        let old_value = match (position, value.clone()) {
            (Some(idx), Some(new_value)) => {
                Some(mem::replace(&mut data.attrs[idx].1, new_value))
            }
            (Some(idx), None) => Some(data.attrs.remove(idx).1),
            (None, Some(new_value)) => {
                data.attrs.push((name_lc.clone(), new_value));
                None
            }
            (None, None) => return Ok(()),
        };
        if name_lc == "id" {
            // Only drop the reverse mapping if it still points at this node.
            if let Some(old) = &old_value
                && self.id_index.get(old) == Some(&node)
            {
                self.id_index.remove(old);
            }
            if let Some(new_id) = value.as_ref().filter(|id| !id.is_empty()) {
                self.id_index.insert(new_id.clone(), node);
            }
        }
        self.records.push(MutationRecord::Attributes {
            target: node,
            name: name_lc,
            old_value,
            new_value: value,
        });
        Ok(())
    }

    fn remove(&mut self, node: NodeKey) -> Result<()> {
        if node == NodeKey::ROOT {
            bail!("the document node cannot be removed");
        }
        let id = *self
            .ids
            .get(&node)
            .ok_or_else(|| anyhow!("unknown node {}", node.0))?;
        let parent = self.parent(node).unwrap_or(NodeKey::ROOT);
        let is_element = self.is_element(node);
        for key in self.descendants(node) {
            self.ids.remove(&key);
            self.id_index.retain(|_, owner| *owner != key);
        }
        id.remove_subtree(&mut self.arena);
        self.records.push(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![MutatedNode {
                key: node,
                is_element,
            }],
        });
        Ok(())
    }
}

impl DOMSubscriber for StaticDocument {
    fn apply_update(&mut self, update: DOMUpdate) -> Result<()> {
        use DOMUpdate::*;
        self.paint_list = OnceCell::new();
        match update {
            InsertElement {
                parent,
                node,
                tag,
                pos,
            } => self.insert(
                parent,
                node,
                NodeKind::Element {
                    tag: tag.to_ascii_lowercase(),
                },
                pos,
            ),
            InsertText {
                parent,
                node,
                text,
                pos,
            } => self.insert(parent, node, NodeKind::Text { text }, pos),
            SetAttr { node, name, value } => self.set_attr(node, &name, Some(value)),
            RemoveAttr { node, name } => self.set_attr(node, &name, None),
            SetText { node, text } => {
                let data = self.data_mut(node)?;
                let NodeKind::Text { text: current } = &mut data.kind else {
                    bail!("node {} is not a text node", node.0);
                };
                *current = text;
                self.records
                    .push(MutationRecord::CharacterData { target: node });
                Ok(())
            }
            SetLayout { node, rect } => {
                self.data_mut(node)?.layout = rect;
                self.records.push(MutationRecord::Layout { target: node });
                Ok(())
            }
            RemoveNode { node } => self.remove(node),
            EndOfDocument => Ok(()),
        }
    }
}

impl HostDocument for StaticDocument {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn element_from_point(&self, x: u32, y: u32) -> Result<Option<NodeKey>> {
        if x >= self.viewport.width || y >= self.viewport.height {
            return Ok(None);
        }
        let paint_list = self.paint_list.get_or_init(|| self.build_paint_list());
        let (px, py) = (i64::from(x), i64::from(y));
        // Later entries paint on top.
        Ok(paint_list
            .iter()
            .rev()
            .find(|hit| hit.rect.contains(px, py))
            .map(|hit| hit.key))
    }

    fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        let id = self.ids.get(&node)?;
        let parent = self.arena.get(*id)?.parent()?;
        self.key_of(parent)
    }

    fn is_attached(&self, node: NodeKey) -> bool {
        self.ids
            .get(&node)
            .is_some_and(|id| !id.is_removed(&self.arena))
    }

    fn tag_name(&self, node: NodeKey) -> Option<&str> {
        match &self.data(node)?.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Document | NodeKind::Text { .. } => None,
        }
    }

    fn attribute(&self, node: NodeKey, name: &str) -> Option<&str> {
        self.data(node)?
            .attrs
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn pointer_events(&self, node: NodeKey) -> PointerEvents {
        // Inherited: the nearest declaration wins.
        for key in self.ancestors_inclusive(node) {
            if let Some(value) = self
                .inline_style(key)
                .and_then(|style| style.get("pointer-events").map(str::to_owned))
                && !value.eq_ignore_ascii_case("inherit")
            {
                return if value.eq_ignore_ascii_case("none") {
                    PointerEvents::None
                } else {
                    PointerEvents::Auto
                };
            }
        }
        PointerEvents::Auto
    }

    fn element_by_id(&self, id: &str) -> Option<NodeKey> {
        self.id_index.get(id).copied()
    }

    fn query_selector(&self, selector: &str) -> Result<Option<NodeKey>> {
        let parsed = Selector::parse(selector)?;
        Ok(self
            .descendants(NodeKey::ROOT)
            .into_iter()
            .find(|node| parsed.matches(self, *node)))
    }

    fn evaluate_xpath(&self, expression: &str) -> Result<Option<NodeKey>> {
        let parsed = XPath::parse(expression)?;
        Ok(parsed.evaluate_first(self))
    }
}

impl ObservedDocument for StaticDocument {
    fn take_records(&mut self) -> Vec<MutationRecord> {
        mem::take(&mut self.records)
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Result<(StaticDocument, NodeKey)> {
        let mut doc = StaticDocument::new(Viewport::new(200, 200));
        let body = doc.append_element(NodeKey::ROOT, "body", &[])?;
        doc.set_layout(body, LayoutRect::new(0, 0, 200, 200))?;
        Ok((doc, body))
    }

    #[test]
    fn topmost_box_wins_in_document_order() -> Result<()> {
        let (mut doc, body) = page()?;
        let under = doc.append_element(body, "div", &[])?;
        doc.set_layout(under, LayoutRect::new(0, 0, 100, 100))?;
        let over = doc.append_element(body, "div", &[])?;
        doc.set_layout(over, LayoutRect::new(50, 50, 100, 100))?;

        assert_eq!(doc.element_from_point(10, 10)?, Some(under));
        assert_eq!(doc.element_from_point(60, 60)?, Some(over));
        assert_eq!(doc.element_from_point(180, 10)?, Some(body));
        assert_eq!(doc.element_from_point(500, 10)?, None);
        Ok(())
    }

    #[test]
    fn z_index_of_positioned_elements_reorders_paint() -> Result<()> {
        let (mut doc, body) = page()?;
        let raised = doc.append_element(body, "div", &[("style", "position:relative; z-index: 5")])?;
        doc.set_layout(raised, LayoutRect::new(0, 0, 100, 100))?;
        let later = doc.append_element(body, "div", &[])?;
        doc.set_layout(later, LayoutRect::new(0, 0, 100, 100))?;

        assert_eq!(doc.element_from_point(10, 10)?, Some(raised));
        Ok(())
    }

    #[test]
    fn pointer_events_none_and_hidden_boxes_are_transparent() -> Result<()> {
        let (mut doc, body) = page()?;
        let below = doc.append_element(body, "div", &[])?;
        doc.set_layout(below, LayoutRect::new(0, 0, 100, 100))?;
        let ghost = doc.append_element(body, "div", &[("style", "pointer-events: none")])?;
        doc.set_layout(ghost, LayoutRect::new(0, 0, 100, 100))?;
        let hidden = doc.append_element(body, "div", &[("style", "visibility:hidden")])?;
        doc.set_layout(hidden, LayoutRect::new(0, 0, 100, 100))?;

        assert_eq!(doc.element_from_point(10, 10)?, Some(below));
        assert_eq!(doc.pointer_events(ghost), PointerEvents::None);
        Ok(())
    }

    #[test]
    fn pointer_events_is_inherited_and_overridable() -> Result<()> {
        let (mut doc, body) = page()?;
        let outer = doc.append_element(body, "div", &[("style", "pointer-events:none")])?;
        let inner = doc.append_element(outer, "span", &[])?;
        let revived = doc.append_element(outer, "span", &[("style", "pointer-events:auto")])?;

        assert_eq!(doc.pointer_events(inner), PointerEvents::None);
        assert_eq!(doc.pointer_events(revived), PointerEvents::Auto);
        Ok(())
    }

    #[test]
    fn removal_detaches_the_whole_subtree_and_records_it() -> Result<()> {
        let (mut doc, body) = page()?;
        let wrapper = doc.append_element(body, "div", &[("id", "wrap")])?;
        let leaf = doc.append_text(wrapper, "hello")?;
        doc.take_records();

        doc.remove_node(wrapper)?;
        assert!(!doc.is_attached(wrapper));
        assert!(!doc.is_attached(leaf));
        assert_eq!(doc.element_by_id("wrap"), None);
        assert_eq!(
            doc.take_records(),
            vec![MutationRecord::ChildList {
                target: body,
                added: Vec::new(),
                removed: vec![MutatedNode {
                    key: wrapper,
                    is_element: true
                }],
            }]
        );
        Ok(())
    }

    #[test]
    fn attribute_records_carry_old_values() -> Result<()> {
        let (mut doc, body) = page()?;
        let button = doc.append_element(body, "button", &[("class", "a")])?;
        doc.take_records();
        doc.set_attribute(button, "CLASS", "b")?;
        assert_eq!(
            doc.take_records(),
            vec![MutationRecord::Attributes {
                target: button,
                name: "class".into(),
                old_value: Some("a".into()),
                new_value: Some("b".into()),
            }]
        );
        assert_eq!(doc.attribute(button, "Class"), Some("b"));
        Ok(())
    }

    #[test]
    fn insert_at_position_keeps_sibling_order() -> Result<()> {
        let (mut doc, body) = page()?;
        let first = doc.append_element(body, "p", &[])?;
        let second = NodeKey(900);
        doc.apply_update(DOMUpdate::InsertElement {
            parent: body,
            node: second,
            tag: "P".into(),
            pos: 0,
        })?;
        assert_eq!(doc.children(body), vec![second, first]);
        assert_eq!(doc.tag_name(second), Some("p"));
        // Minted keys never collide with explicitly supplied ones.
        assert!(doc.mint_key().0 > 900);
        Ok(())
    }

    #[test]
    fn invalid_updates_are_rejected() -> Result<()> {
        let (mut doc, body) = page()?;
        let text = doc.append_text(body, "x")?;
        assert!(doc.set_attribute(text, "role", "button").is_err());
        assert!(doc.remove_node(NodeKey::ROOT).is_err());
        assert!(doc.append_element(NodeKey(4242), "div", &[]).is_err());
        Ok(())
    }
}
