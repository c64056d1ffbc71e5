//! Which page mutations can change hit regions.
//!
//! Mirrors what a mutation observer filtered to hit-testing concerns would
//! report: element insertion and removal, role and class changes, layout-box
//! changes, and inline-style edits to properties that move boxes or change
//! their hit-testability. Text edits and other attributes are ignored.

use dom::{HostDocument, MutationRecord, StyleDeclarations};

/// Inline-style properties that affect where an element can be clicked.
pub const HIT_TEST_STYLE_PROPERTIES: [&str; 9] = [
    "pointer-events",
    "position",
    "display",
    "visibility",
    "transform",
    "top",
    "left",
    "right",
    "bottom",
];

/// Whether `record` can change the hit-region index.
pub fn is_relevant<D: HostDocument + ?Sized>(record: &MutationRecord, doc: &D) -> bool {
    match record {
        MutationRecord::ChildList { added, removed, .. } => {
            added.iter().chain(removed).any(|node| node.is_element)
        }
        MutationRecord::Attributes {
            name,
            old_value,
            new_value,
            ..
        } => match name.as_str() {
            "class" | "role" => true,
            "style" => style_change_is_relevant(old_value.as_deref(), new_value.as_deref()),
            _ => false,
        },
        MutationRecord::Layout { target } => doc.is_element(*target),
        MutationRecord::CharacterData { .. } => false,
    }
}

/// Whether any of the hit-test properties differ between two `style` values.
pub fn style_change_is_relevant(old: Option<&str>, new: Option<&str>) -> bool {
    let before = StyleDeclarations::parse(old.unwrap_or_default());
    let after = StyleDeclarations::parse(new.unwrap_or_default());
    HIT_TEST_STYLE_PROPERTIES
        .iter()
        .any(|property| before.get(property) != after.get(property))
}

/// Whether any record in a batch is relevant.
pub fn any_relevant<D: HostDocument + ?Sized>(records: &[MutationRecord], doc: &D) -> bool {
    records.iter().any(|record| is_relevant(record, doc))
}
