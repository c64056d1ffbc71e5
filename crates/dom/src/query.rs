//! Element lookup by CSS selector and XPath.
//!
//! Both grammars are the subset an inspector emits when it names an element:
//! - selectors: type, `*`, `#id`, `.class`, `[attr]`, `[attr=value]`, descendant
//!   and child combinators, and comma-separated lists;
//! - XPath: `id('x')`, and `/` or `//` location paths of element steps with
//!   `[n]`, `[last()]`, `[@attr]` and `[@attr='value']` predicates.

use crate::document::StaticDocument;
use crate::{HostDocument, NodeKey};
use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};

// ============================
// Shared scanning helpers
// ============================

struct Cursor<'src> {
    chars: Vec<char>,
    pos: usize,
    source: &'src str,
}

impl<'src> Cursor<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        let len = expected.chars().count();
        let matches = self
            .chars
            .get(self.pos..self.pos + len)
            .is_some_and(|window| window.iter().copied().eq(expected.chars()));
        if matches {
            self.pos += len;
        }
        matches
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn ident(&mut self) -> Option<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_') || !ch.is_ascii())
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn quoted(&mut self) -> Result<String> {
        let Some(quote) = self.bump().filter(|ch| matches!(ch, '"' | '\'')) else {
            bail!("expected a quoted string in `{}`", self.source);
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(ch) if ch == quote => return Ok(out),
                Some(ch) => out.push(ch),
                None => bail!("unterminated string in `{}`", self.source),
            }
        }
    }
}

// ============================
// CSS selectors
// ============================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    /// `None` for `*` or an omitted type selector.
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn matches<D: HostDocument + ?Sized>(&self, doc: &D, node: NodeKey) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };
        if let Some(expected) = &self.tag
            && !tag.eq_ignore_ascii_case(expected)
        {
            return false;
        }
        if let Some(expected) = &self.id
            && doc.attribute(node, "id") != Some(expected.as_str())
        {
            return false;
        }
        if !self.classes.is_empty() {
            let class_attr = doc.attribute(node, "class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|class| class_attr.split_whitespace().any(|token| token == class))
            {
                return false;
            }
        }
        self.attrs.iter().all(|test| {
            doc.attribute(node, &test.name)
                .is_some_and(|value| test.value.as_deref().is_none_or(|want| want == value))
        })
    }
}

/// One selector of a list: compounds left to right, with the combinator that
/// joins each compound to the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches_at<D: HostDocument + ?Sized>(&self, doc: &D, node: NodeKey, idx: usize) -> bool {
        if !self.compounds[idx].matches(doc, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|parent| self.matches_at(doc, parent, idx - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, ancestor, idx - 1) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

impl Selector {
    /// Parse a selector list.
    ///
    /// # Errors
    /// Returns an error for empty input, dangling combinators, or syntax outside
    /// the supported subset (pseudo-classes, other attribute operators).
    pub fn parse(source: &str) -> Result<Self> {
        let mut cursor = Cursor::new(source);
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(Self::parse_complex(&mut cursor)?);
            if cursor.at_end() {
                break;
            }
            if !cursor.eat(',') {
                bail!("unexpected `{}` in selector `{source}`", cursor.peek().unwrap_or(' '));
            }
        }
        Ok(Self { alternatives })
    }

    /// Whether `node` matches any selector in the list.
    pub fn matches<D: HostDocument + ?Sized>(&self, doc: &D, node: NodeKey) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches_at(doc, node, complex.compounds.len() - 1))
    }

    fn parse_complex(cursor: &mut Cursor<'_>) -> Result<Complex> {
        let mut compounds: Vec<Compound> = Vec::new();
        let mut combinators = Vec::new();
        loop {
            let saw_space = cursor.skip_whitespace();
            match cursor.peek() {
                None | Some(',') => break,
                Some('>') => {
                    if compounds.is_empty() {
                        bail!("selector `{}` starts with a combinator", cursor.source);
                    }
                    cursor.bump();
                    cursor.skip_whitespace();
                    compounds.push(Self::parse_compound(cursor)?);
                    combinators.push(Combinator::Child);
                }
                Some(_) => {
                    if !compounds.is_empty() && !saw_space {
                        bail!("unsupported syntax in selector `{}`", cursor.source);
                    }
                    compounds.push(Self::parse_compound(cursor)?);
                    if compounds.len() > 1 {
                        combinators.push(Combinator::Descendant);
                    }
                }
            }
        }
        if compounds.is_empty() {
            bail!("empty selector in `{}`", cursor.source);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(cursor: &mut Cursor<'_>) -> Result<Compound> {
        let mut compound = Compound::default();
        let mut empty = true;
        if cursor.eat('*') {
            empty = false;
        } else if let Some(tag) = cursor.ident() {
            compound.tag = Some(tag.to_ascii_lowercase());
            empty = false;
        }
        loop {
            match cursor.peek() {
                Some('#') => {
                    cursor.bump();
                    let Some(id) = cursor.ident() else {
                        bail!("expected an id after `#` in `{}`", cursor.source);
                    };
                    compound.id = Some(id);
                }
                Some('.') => {
                    cursor.bump();
                    let Some(class) = cursor.ident() else {
                        bail!("expected a class after `.` in `{}`", cursor.source);
                    };
                    compound.classes.push(class);
                }
                Some('[') => {
                    cursor.bump();
                    compound.attrs.push(Self::parse_attr(cursor)?);
                }
                Some(':') => bail!("pseudo-classes are not supported: `{}`", cursor.source),
                _ => break,
            }
            empty = false;
        }
        if empty {
            bail!("expected a selector in `{}`", cursor.source);
        }
        Ok(compound)
    }

    fn parse_attr(cursor: &mut Cursor<'_>) -> Result<AttrTest> {
        cursor.skip_whitespace();
        let Some(name) = cursor.ident() else {
            bail!("expected an attribute name in `{}`", cursor.source);
        };
        cursor.skip_whitespace();
        let value = if cursor.eat('=') {
            cursor.skip_whitespace();
            let value = match cursor.peek() {
                Some('"' | '\'') => cursor.quoted()?,
                _ => match cursor.ident() {
                    Some(ident) => ident,
                    None => bail!("expected an attribute value in `{}`", cursor.source),
                },
            };
            cursor.skip_whitespace();
            Some(value)
        } else {
            None
        };
        if !cursor.eat(']') {
            bail!("unsupported attribute selector in `{}`", cursor.source);
        }
        Ok(AttrTest {
            name: name.to_ascii_lowercase(),
            value,
        })
    }
}

// ============================
// XPath
// ============================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    HasAttr(String),
    AttrEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    /// Preceded by `//` (descendant-or-self) rather than `/`.
    descendant: bool,
    /// `None` for `*`.
    name: Option<String>,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expression {
    Id(String),
    Path(Vec<Step>),
}

/// A parsed XPath expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    expression: Expression,
}

impl XPath {
    /// Parse an expression.
    ///
    /// # Errors
    /// Returns an error for relative paths, non-element node tests, and other
    /// syntax outside the supported subset.
    pub fn parse(source: &str) -> Result<Self> {
        let mut cursor = Cursor::new(source.trim());
        if cursor.eat_str("id(") {
            cursor.skip_whitespace();
            let id = cursor.quoted()?;
            cursor.skip_whitespace();
            if !cursor.eat(')') || !cursor.at_end() {
                bail!("malformed id() call in `{source}`");
            }
            return Ok(Self {
                expression: Expression::Id(id),
            });
        }
        if cursor.peek() != Some('/') {
            bail!("only absolute XPath expressions are supported: `{source}`");
        }
        let mut steps = Vec::new();
        while !cursor.at_end() {
            if !cursor.eat('/') {
                bail!("expected `/` in `{source}`");
            }
            let descendant = cursor.eat('/');
            let name = if cursor.eat('*') {
                None
            } else {
                match cursor.ident() {
                    Some(name) => Some(name.to_ascii_lowercase()),
                    None => bail!("expected an element name in `{source}`"),
                }
            };
            if cursor.peek() == Some('(') {
                bail!("only element node tests are supported: `{source}`");
            }
            let mut predicates = Vec::new();
            while cursor.eat('[') {
                predicates.push(Self::parse_predicate(&mut cursor)?);
            }
            steps.push(Step {
                descendant,
                name,
                predicates,
            });
        }
        if steps.is_empty() {
            bail!("empty XPath expression");
        }
        Ok(Self {
            expression: Expression::Path(steps),
        })
    }

    fn parse_predicate(cursor: &mut Cursor<'_>) -> Result<Predicate> {
        cursor.skip_whitespace();
        let predicate = if cursor.eat('@') {
            let Some(name) = cursor.ident() else {
                bail!("expected an attribute name in `{}`", cursor.source);
            };
            cursor.skip_whitespace();
            if cursor.eat('=') {
                cursor.skip_whitespace();
                Predicate::AttrEquals(name.to_ascii_lowercase(), cursor.quoted()?)
            } else {
                Predicate::HasAttr(name.to_ascii_lowercase())
            }
        } else if cursor.eat_str("last()") {
            Predicate::Last
        } else {
            let digits = cursor.ident().unwrap_or_default();
            match digits.parse::<usize>() {
                Ok(position) if position > 0 => Predicate::Position(position),
                _ => bail!("unsupported predicate in `{}`", cursor.source),
            }
        };
        cursor.skip_whitespace();
        if !cursor.eat(']') {
            bail!("unterminated predicate in `{}`", cursor.source);
        }
        Ok(predicate)
    }

    /// First selected element in document order.
    pub fn evaluate_first(&self, doc: &StaticDocument) -> Option<NodeKey> {
        let steps = match &self.expression {
            Expression::Id(id) => return doc.element_by_id(id),
            Expression::Path(steps) => steps,
        };
        let mut context = vec![NodeKey::ROOT];
        for step in steps {
            let parents: Vec<NodeKey> = if step.descendant {
                let mut seen = HashSet::new();
                context
                    .iter()
                    .flat_map(|node| doc.descendants(*node))
                    .filter(|node| seen.insert(*node))
                    .collect()
            } else {
                context
            };
            let mut seen = HashSet::new();
            context = parents
                .into_iter()
                .flat_map(|parent| Self::apply_step(doc, step, parent))
                .filter(|node| seen.insert(*node))
                .collect();
            if context.is_empty() {
                return None;
            }
        }
        let order: HashMap<NodeKey, usize> = doc
            .descendants(NodeKey::ROOT)
            .into_iter()
            .enumerate()
            .map(|(idx, key)| (key, idx))
            .collect();
        context
            .into_iter()
            .min_by_key(|key| order.get(key).copied().unwrap_or(usize::MAX))
    }

    fn apply_step(doc: &StaticDocument, step: &Step, parent: NodeKey) -> Vec<NodeKey> {
        let mut matched: Vec<NodeKey> = doc
            .children(parent)
            .into_iter()
            .filter(|child| {
                doc.tag_name(*child).is_some_and(|tag| {
                    step.name.as_deref().is_none_or(|name| tag.eq_ignore_ascii_case(name))
                })
            })
            .collect();
        for predicate in &step.predicates {
            matched = match predicate {
                Predicate::Position(position) => {
                    matched.get(position - 1).copied().into_iter().collect()
                }
                Predicate::Last => matched.last().copied().into_iter().collect(),
                Predicate::HasAttr(name) => matched
                    .into_iter()
                    .filter(|node| doc.attribute(*node, name).is_some())
                    .collect(),
                Predicate::AttrEquals(name, value) => matched
                    .into_iter()
                    .filter(|node| doc.attribute(*node, name) == Some(value.as_str()))
                    .collect(),
            };
        }
        matched
    }
}
