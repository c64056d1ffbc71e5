//! Inline `style` attribute parsing.
//!
//! Only declarations are understood (`name: value; ...`). Property names are
//! lowercased, values are trimmed and `!important` is stripped. A repeated
//! property keeps the last value, like the cascade within one declaration block.

use smallvec::SmallVec;

/// Parsed declarations of one inline style attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDeclarations {
    entries: SmallVec<[(String, String); 4]>,
}

impl StyleDeclarations {
    /// Parse a `style` attribute value. Malformed declarations are skipped.
    pub fn parse(source: &str) -> Self {
        let mut entries: SmallVec<[(String, String); 4]> = SmallVec::new();
        for declaration in source.split(';') {
            let Some((name, value)) = declaration.split_once(':') else {
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_suffix("!important")
                .map_or(value, str::trim_end)
                .to_owned();
            if let Some(existing) = entries.iter_mut().find(|(prop, _)| *prop == name) {
                existing.1 = value;
            } else {
                entries.push((name, value));
            }
        }
        Self { entries }
    }

    /// Value of `property` (lowercase name), if declared.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    /// Whether `property` is declared with exactly `keyword` (ASCII case-insensitive).
    pub fn has_keyword(&self, property: &str, keyword: &str) -> bool {
        self.get(property)
            .is_some_and(|value| value.eq_ignore_ascii_case(keyword))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_declarations_case_insensitively() {
        let decls = StyleDeclarations::parse("Pointer-Events: NONE; position:absolute ;");
        assert_eq!(decls.get("pointer-events"), Some("NONE"));
        assert!(decls.has_keyword("pointer-events", "none"));
        assert_eq!(decls.get("position"), Some("absolute"));
    }

    #[test]
    fn last_declaration_wins_and_important_is_stripped() {
        let decls = StyleDeclarations::parse("display:block; display: none !important");
        assert_eq!(decls.get("display"), Some("none"));
        assert_eq!(decls.iter().count(), 1);
    }

    #[test]
    fn malformed_declarations_are_skipped() {
        let decls = StyleDeclarations::parse("garbage; :novalue; color: red");
        assert_eq!(decls.iter().collect::<Vec<_>>(), vec![("color", "red")]);
        assert!(StyleDeclarations::parse("").is_empty());
    }
}
