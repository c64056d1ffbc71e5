//! JSON scene descriptions for building a `StaticDocument`.
//!
//! ```json
//! { "viewport": { "width": 100, "height": 100 },
//!   "nodes": [ { "tag": "button", "attrs": { "id": "go" }, "rect": [0, 0, 60, 60],
//!                "children": [ { "text": "Go" } ] } ] }
//! ```

use crate::document::StaticDocument;
use crate::{LayoutRect, NodeKey, ObservedDocument as _, Viewport};
use anyhow::{Context as _, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of a scene: an element (`tag`) or a text node (`text`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    /// `[x, y, width, height]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<[i32; 4]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub viewport: Viewport,
    #[serde(default)]
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    /// Parse a scene from JSON.
    ///
    /// # Errors
    /// Returns an error if the JSON does not describe a scene.
    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).context("failed to parse scene JSON")
    }

    /// Build a document containing the scene's nodes under the document root.
    ///
    /// # Errors
    /// Returns an error for nodes that are neither elements nor text.
    pub fn build(&self) -> Result<StaticDocument> {
        let mut doc = StaticDocument::new(self.viewport);
        for node in &self.nodes {
            Self::build_node(&mut doc, NodeKey::ROOT, node)?;
        }
        // Construction is not an observable change.
        doc.take_records();
        Ok(doc)
    }

    fn build_node(doc: &mut StaticDocument, parent: NodeKey, node: &SceneNode) -> Result<()> {
        match (&node.tag, &node.text) {
            (Some(tag), None) => {
                let attrs: Vec<(&str, &str)> = node
                    .attrs
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str()))
                    .collect();
                let key = doc.append_element(parent, tag, &attrs)?;
                if let Some([x, y, width, height]) = node.rect {
                    doc.set_layout(key, LayoutRect::new(x, y, width, height))?;
                }
                for child in &node.children {
                    Self::build_node(doc, key, child)?;
                }
            }
            (None, Some(text)) => {
                doc.append_text(parent, text)?;
            }
            _ => bail!("scene nodes need exactly one of `tag` or `text`"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HostDocument as _;
    use anyhow::Context as _;

    #[test]
    fn builds_document_from_json() -> Result<()> {
        let scene = Scene::from_json(
            r#"{ "viewport": { "width": 100, "height": 100 },
                 "nodes": [ { "tag": "button", "attrs": { "id": "go" }, "rect": [0, 0, 60, 60],
                              "children": [ { "text": "Go" } ] } ] }"#,
        )?;
        let mut doc = scene.build()?;
        let button = doc.element_by_id("go").context("button missing")?;
        assert_eq!(doc.tag_name(button), Some("button"));
        assert_eq!(doc.element_from_point(10, 10)?, Some(button));
        assert_eq!(doc.children(button).len(), 1);
        assert!(doc.take_records().is_empty());
        Ok(())
    }

    #[test]
    fn rejects_ambiguous_nodes() -> Result<()> {
        let scene = Scene::from_json(
            r#"{ "viewport": { "width": 1, "height": 1 }, "nodes": [ { "tag": "p", "text": "x" } ] }"#,
        )?;
        assert!(scene.build().is_err());
        assert!(Scene::from_json("{").is_err());
        Ok(())
    }
}
