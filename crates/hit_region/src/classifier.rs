//! Interactive-element classification.
//!
//! An element is interactive when its role (explicit or implied by the tag) is
//! `button` or `link` and it does not opt out of pointer events. Elements that
//! only carry a click handler have no role and are not interactive.

use dom::{HostDocument, NodeKey, PointerEvents};

/// `input` types that render as push buttons.
const BUTTON_INPUT_TYPES: [&str; 4] = ["button", "submit", "reset", "image"];

/// Roles that receive clicks.
const INTERACTIVE_ROLES: [&str; 2] = ["button", "link"];

/// Implicit ARIA role for the supported elements.
fn implicit_role<D: HostDocument + ?Sized>(
    doc: &D,
    node: NodeKey,
    tag: &str,
) -> Option<&'static str> {
    match tag {
        "button" => Some("button"),
        "input" => doc
            .attribute(node, "type")
            .map(str::trim)
            .filter(|kind| {
                BUTTON_INPUT_TYPES
                    .iter()
                    .any(|button| kind.eq_ignore_ascii_case(button))
            })
            .map(|_| "button"),
        "a" | "area" => doc.attribute(node, "href").map(|_| "link"),
        _ => None,
    }
}

/// Effective role of `node`: the first token of a non-empty `role` attribute,
/// otherwise the implicit role of its tag. Non-elements have no role.
pub fn effective_role<D: HostDocument + ?Sized>(doc: &D, node: NodeKey) -> Option<String> {
    let tag = doc.tag_name(node)?;
    if let Some(explicit) = doc
        .attribute(node, "role")
        .and_then(|role| role.split_ascii_whitespace().next())
    {
        return Some(explicit.to_ascii_lowercase());
    }
    implicit_role(doc, node, tag).map(str::to_owned)
}

/// Whether a click at a point resolving to `node` is handled by `node` itself.
pub fn is_interactive<D: HostDocument + ?Sized>(doc: &D, node: NodeKey) -> bool {
    effective_role(doc, node).is_some_and(|role| INTERACTIVE_ROLES.contains(&role.as_str()))
        && doc.pointer_events(node) != PointerEvents::None
}

/// Nearest interactive element among `node` and its ancestors.
pub fn find_interactive_ancestor<D: HostDocument + ?Sized>(
    doc: &D,
    node: NodeKey,
) -> Option<NodeKey> {
    let mut current = Some(node);
    while let Some(candidate) = current {
        if is_interactive(doc, candidate) {
            return Some(candidate);
        }
        current = doc.parent(candidate);
    }
    None
}
