//! Mutation records queued by an observed document.

use crate::NodeKey;

/// A node added to or removed from a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutatedNode {
    pub key: NodeKey,
    pub is_element: bool,
}

/// One observed change, modelled after the records a DOM mutation observer delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children were inserted into or removed from `target`.
    ChildList {
        target: NodeKey,
        added: Vec<MutatedNode>,
        removed: Vec<MutatedNode>,
    },
    /// An attribute of `target` changed. `None` means absent.
    Attributes {
        target: NodeKey,
        name: String,
        old_value: Option<String>,
        new_value: Option<String>,
    },
    /// Text content of a text node changed.
    CharacterData { target: NodeKey },
    /// The layout box of `target` moved or resized.
    Layout { target: NodeKey },
}

impl MutationRecord {
    /// Node the record is about.
    pub const fn target(&self) -> NodeKey {
        match self {
            Self::ChildList { target, .. }
            | Self::Attributes { target, .. }
            | Self::CharacterData { target }
            | Self::Layout { target } => *target,
        }
    }

    /// Short record type name for logs.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::ChildList { .. } => "childList",
            Self::Attributes { .. } => "attributes",
            Self::CharacterData { .. } => "characterData",
            Self::Layout { .. } => "layout",
        }
    }
}
