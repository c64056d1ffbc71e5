//! Resolving the element an inspector selected.

use core::fmt;
use dom::{HostDocument, NodeKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the host names a selected element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ElementIdentifier {
    Id(String),
    Selector(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

/// Characters that only appear in a CSS selector, never in a bare id.
const SELECTOR_PUNCTUATION: [char; 10] = ['.', '#', '[', ']', '>', ':', '*', ',', '~', '+'];

impl ElementIdentifier {
    /// Classify a raw identifier string: a leading `/` or `(` means XPath,
    /// selector punctuation or whitespace means a CSS selector, anything else
    /// is an element id.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('/') || trimmed.starts_with('(') || trimmed.starts_with("id(") {
            Self::XPath(trimmed.to_owned())
        } else if trimmed.contains(SELECTOR_PUNCTUATION)
            || trimmed.contains(char::is_whitespace)
        {
            Self::Selector(trimmed.to_owned())
        } else {
            Self::Id(trimmed.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Id(value) | Self::Selector(value) | Self::XPath(value) => value,
        }
    }
}

impl fmt::Display for ElementIdentifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(formatter, "id {id:?}"),
            Self::Selector(selector) => write!(formatter, "selector {selector:?}"),
            Self::XPath(expression) => write!(formatter, "xpath {expression:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no element matches {0}")]
    NotFound(ElementIdentifier),
    #[error("cannot evaluate {identifier}: {reason}")]
    Malformed {
        identifier: ElementIdentifier,
        reason: String,
    },
    #[error("empty element identifier")]
    Empty,
}

/// Resolve `identifier` to an attached element of `doc`.
///
/// # Errors
/// `Empty` for blank identifiers, `Malformed` when the selector or expression
/// cannot be evaluated, `NotFound` when nothing attached matches.
pub fn resolve<D: HostDocument + ?Sized>(
    doc: &D,
    identifier: &ElementIdentifier,
) -> Result<NodeKey, SelectionError> {
    if identifier.as_str().is_empty() {
        return Err(SelectionError::Empty);
    }
    let found = match identifier {
        ElementIdentifier::Id(id) => Ok(doc.element_by_id(id)),
        ElementIdentifier::Selector(selector) => doc.query_selector(selector),
        ElementIdentifier::XPath(expression) => doc.evaluate_xpath(expression),
    }
    .map_err(|err| SelectionError::Malformed {
        identifier: identifier.clone(),
        reason: format!("{err:#}"),
    })?;
    found
        .filter(|node| doc.is_attached(*node) && doc.is_element(*node))
        .ok_or_else(|| SelectionError::NotFound(identifier.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use dom::{StaticDocument, Viewport};

    #[test]
    fn parse_classifies_raw_strings() {
        assert_eq!(
            ElementIdentifier::parse("submit-btn"),
            ElementIdentifier::Id("submit-btn".into())
        );
        assert_eq!(
            ElementIdentifier::parse("  #main .cta "),
            ElementIdentifier::Selector("#main .cta".into())
        );
        assert_eq!(
            ElementIdentifier::parse("button[type=submit]"),
            ElementIdentifier::Selector("button[type=submit]".into())
        );
        assert_eq!(
            ElementIdentifier::parse("//div[2]/button"),
            ElementIdentifier::XPath("//div[2]/button".into())
        );
        assert_eq!(
            ElementIdentifier::parse("id('go')"),
            ElementIdentifier::XPath("id('go')".into())
        );
    }

    #[test]
    fn identifiers_serialize_tagged() -> Result<()> {
        let json = serde_json::to_string(&ElementIdentifier::XPath("/html".into()))?;
        assert_eq!(json, r#"{"kind":"xpath","value":"/html"}"#);
        let back: ElementIdentifier = serde_json::from_str(r#"{"kind":"id","value":"go"}"#)?;
        assert_eq!(back, ElementIdentifier::Id("go".into()));
        Ok(())
    }

    #[test]
    fn resolve_by_each_kind() -> Result<()> {
        let mut doc = StaticDocument::new(Viewport::new(10, 10));
        let body = doc.append_element(NodeKey::ROOT, "body", &[])?;
        let button = doc.append_element(body, "button", &[("id", "go"), ("class", "cta")])?;

        assert_eq!(resolve(&doc, &ElementIdentifier::Id("go".into())), Ok(button));
        assert_eq!(
            resolve(&doc, &ElementIdentifier::Selector("body > .cta".into())),
            Ok(button)
        );
        assert_eq!(
            resolve(&doc, &ElementIdentifier::XPath("//button[@id='go']".into())),
            Ok(button)
        );
        Ok(())
    }

    #[test]
    fn resolve_reports_failures_without_panicking() -> Result<()> {
        let mut doc = StaticDocument::new(Viewport::new(10, 10));
        let gone = doc.append_element(NodeKey::ROOT, "div", &[("id", "gone")])?;
        doc.remove_node(gone)?;

        assert_eq!(
            resolve(&doc, &ElementIdentifier::Id("gone".into())),
            Err(SelectionError::NotFound(ElementIdentifier::Id("gone".into())))
        );
        assert_eq!(
            resolve(&doc, &ElementIdentifier::Id(String::new())),
            Err(SelectionError::Empty)
        );
        assert!(matches!(
            resolve(&doc, &ElementIdentifier::Selector("div[".into())),
            Err(SelectionError::Malformed { .. })
        ));
        assert!(matches!(
            resolve(&doc, &ElementIdentifier::XPath("//div[".into())),
            Err(SelectionError::Malformed { .. })
        ));
        Ok(())
    }
}
