//! CSS selector subset used by the site controllers and the harness.
//!
//! Supported: selector lists (`,`), descendant and child combinators, type
//! selectors, `*`, `#id`, `.class` and the attribute conditions `[a]`,
//! `[a="v"]`, `[a^="v"]`, `[a$="v"]`, `[a*="v"]`, `[a~="v"]`. Anything else is
//! rejected at parse time so a typo can never turn into a silent empty match.

use crate::dom::{Document, NodeId};
use crate::result::{SiteError, SiteResult};

/// Attribute test inside `[...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrCondition {
    /// `[name]`
    Exists {
        /// Attribute name
        name: String,
    },
    /// `[name="value"]`
    Equals {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// `[name^="value"]`
    StartsWith {
        /// Attribute name
        name: String,
        /// Required prefix
        value: String,
    },
    /// `[name$="value"]`
    EndsWith {
        /// Attribute name
        name: String,
        /// Required suffix
        value: String,
    },
    /// `[name*="value"]`
    Contains {
        /// Attribute name
        name: String,
        /// Required substring
        value: String,
    },
    /// `[name~="value"]`
    Includes {
        /// Attribute name
        name: String,
        /// Required whitespace-separated word
        value: String,
    },
}

impl AttrCondition {
    fn name(&self) -> &str {
        match self {
            Self::Exists { name }
            | Self::Equals { name, .. }
            | Self::StartsWith { name, .. }
            | Self::EndsWith { name, .. }
            | Self::Contains { name, .. }
            | Self::Includes { name, .. } => name,
        }
    }

    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self {
            Self::Exists { .. } => true,
            Self::Equals { value, .. } => actual == value,
            Self::StartsWith { value, .. } => !value.is_empty() && actual.starts_with(value.as_str()),
            Self::EndsWith { value, .. } => !value.is_empty() && actual.ends_with(value.as_str()),
            Self::Contains { value, .. } => !value.is_empty() && actual.contains(value.as_str()),
            Self::Includes { value, .. } => actual.split_whitespace().any(|w| w == value),
        }
    }
}

/// One compound selector, e.g. `a.sdt-mobile-menu__link[href^="#"]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    /// Type selector; `None` for `*` or when omitted
    pub tag: Option<String>,
    /// `#id`
    pub id: Option<String>,
    /// `.class` list
    pub classes: Vec<String>,
    /// Attribute conditions
    pub attrs: Vec<AttrCondition>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attribute(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attrs
            .iter()
            .all(|cond| cond.matches(doc.attribute(node, cond.name()).as_deref()))
    }
}

/// Relationship between a compound and the one to its left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
}

/// A chain of compounds joined by combinators, leftmost first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

impl ComplexSelector {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.compounds.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent_element(node)
                .is_some_and(|parent| self.matches_at(doc, parent, index - 1)),
            Combinator::Descendant => {
                let mut cursor = doc.parent_element(node);
                while let Some(ancestor) = cursor {
                    if self.matches_at(doc, ancestor, index - 1) {
                        return true;
                    }
                    cursor = doc.parent_element(ancestor);
                }
                false
            }
        }
    }
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    /// Parse a selector list.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Selector`] for empty input or any syntax outside
    /// the supported subset (pseudo-classes, sibling combinators, namespaces).
    pub fn parse(input: &str) -> SiteResult<Self> {
        let mut selectors = Vec::new();
        for group in split_groups(input)? {
            selectors.push(Parser::new(input, &group).complex()?);
        }
        Ok(Self { selectors })
    }

    /// Whether `node` matches any selector in the list
    #[must_use]
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, node))
    }

    /// Number of comma-separated selectors
    #[must_use]
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// Always false for a successfully parsed list
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

fn split_groups(input: &str) -> SiteResult<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in input.chars() {
        if escaped {
            escaped = false;
            current.push(ch);
            continue;
        }
        match (quote, ch) {
            (Some(_), '\\') => {
                escaped = true;
                current.push(ch);
            }
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '[') => {
                depth += 1;
                current.push(ch);
            }
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SiteError::selector(input, "unbalanced `]`"))?;
                current.push(ch);
            }
            (None, ',') if depth == 0 => {
                let trimmed = current.trim();
                if trimmed.is_empty() {
                    return Err(SiteError::selector(input, "empty selector in list"));
                }
                groups.push(trimmed.to_string());
                current.clear();
            }
            (None, c) => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(SiteError::selector(input, "unterminated string"));
    }
    if depth != 0 {
        return Err(SiteError::selector(input, "unterminated attribute condition"));
    }
    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err(SiteError::selector(input, "empty selector"));
    }
    groups.push(trimmed.to_string());
    Ok(groups)
}

struct Parser<'a> {
    full: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(full: &'a str, group: &str) -> Self {
        Self {
            full,
            chars: group.chars().collect(),
            pos: 0,
        }
    }

    fn err(&self, message: impl Into<String>) -> SiteError {
        SiteError::selector(self.full, message)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn complex(&mut self) -> SiteResult<ComplexSelector> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    Combinator::Child
                }
                Some('+' | '~') => return Err(self.err("sibling combinators are not supported")),
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(self.err(format!("unexpected `{c}`"))),
            };
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }

        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> SiteResult<Compound> {
        let mut compound = Compound::default();
        let mut any = false;

        if self.peek() == Some('*') {
            self.pos += 1;
            any = true;
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
            any = true;
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attr()?);
                }
                Some(':') => return Err(self.err("pseudo-classes are not supported")),
                Some('|') => return Err(self.err("namespaces are not supported")),
                _ => break,
            }
            any = true;
        }

        if any {
            Ok(compound)
        } else {
            Err(self.err("expected a selector"))
        }
    }

    fn ident(&mut self) -> SiteResult<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.err("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn attr(&mut self) -> SiteResult<AttrCondition> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrCondition::Exists { name });
            }
            Some('=') => {
                self.pos += 1;
                '='
            }
            Some(c @ ('^' | '$' | '*' | '~')) => {
                self.pos += 1;
                if self.peek() != Some('=') {
                    return Err(self.err(format!("expected `=` after `{c}`")));
                }
                self.pos += 1;
                c
            }
            Some(c) => return Err(self.err(format!("unsupported attribute operator `{c}`"))),
            None => return Err(self.err("unterminated attribute condition")),
        };

        self.skip_ws();
        let value = self.attr_value()?;
        self.skip_ws();
        if self.peek() != Some(']') {
            return Err(self.err("expected `]`"));
        }
        self.pos += 1;

        Ok(match op {
            '^' => AttrCondition::StartsWith { name, value },
            '$' => AttrCondition::EndsWith { name, value },
            '*' => AttrCondition::Contains { name, value },
            '~' => AttrCondition::Includes { name, value },
            _ => AttrCondition::Equals { name, value },
        })
    }

    fn attr_value(&mut self) -> SiteResult<String> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        None => return Err(self.err("unterminated string")),
                        Some(c) if c == q => break,
                        Some('\\') => {
                            self.pos += 1;
                            let Some(c) = self.peek() else {
                                return Err(self.err("unterminated string"));
                            };
                            value.push(c);
                        }
                        Some(c) => value.push(c),
                    }
                    self.pos += 1;
                }
                self.pos += 1;
                Ok(value)
            }
            _ => self.ident(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.create_element("body");
        doc.append_child(doc.root(), body);
        let section = doc.create_element("section");
        doc.set_attribute(section, "id", "1kq6r0t");
        doc.set_attribute(section, "class", "framer-1kq6r0t-container team");
        doc.append_child(body, section);
        let card = doc.create_element("div");
        doc.set_attribute(card, "class", "sdt-team__card");
        doc.append_child(section, card);
        let link = doc.create_element("a");
        doc.set_attribute(link, "href", "#team");
        doc.set_attribute(link, "data-nested-link", "true");
        doc.append_child(card, link);
        (doc, section, card, link)
    }

    #[test]
    fn test_parse_list_and_combinators() {
        let list = SelectorList::parse(r#"[id="1kq6r0t"] .sdt-team__card, .framer-74g9dq"#).unwrap();
        assert_eq!(list.len(), 2);
        assert!(SelectorList::parse("div > a.x[href^='#']").is_ok());
        assert!(SelectorList::parse("*").is_ok());
    }

    #[test]
    fn test_unsupported_syntax_is_error() {
        for bad in ["", "a,", "a:hover", "a + b", "a ~ b", "[href", "[href|=x]", "a]", "[x='y]"] {
            let err = SelectorList::parse(bad);
            assert!(
                matches!(err, Err(SiteError::Selector { .. })),
                "expected error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_attribute_operators() {
        let (doc, section, _, link) = sample();
        let is = |sel: &str, node| SelectorList::parse(sel).unwrap().matches(&doc, node);

        assert!(is(r#"[id="1kq6r0t"]"#, section));
        assert!(is("[id]", section));
        assert!(is(r##"a[href^="#"]"##, link));
        assert!(is(r#"[href$="team"]"#, link));
        assert!(is(r#"[class*="1kq6r0t-cont"]"#, section));
        assert!(is(r#"[class~="team"]"#, section));
        assert!(!is(r#"[class~="tea"]"#, section));
        assert!(!is(r#"[href^=""]"#, link));
        assert!(is(r##"[data-nested-link="true"][href^="#"]"##, link));
    }

    #[test]
    fn test_descendant_and_child() {
        let (doc, section, card, link) = sample();
        let is = |sel: &str, node| SelectorList::parse(sel).unwrap().matches(&doc, node);

        assert!(is(".framer-1kq6r0t-container .sdt-team__card", card));
        assert!(is("section > div", card));
        assert!(!is("section > a", link));
        assert!(is("section a", link));
        assert!(is("body > section > div > a", link));
        assert!(!is("a section", section));
    }

    #[test]
    fn test_type_selector_case_insensitive() {
        let (doc, section, _, _) = sample();
        assert!(SelectorList::parse("SECTION").unwrap().matches(&doc, section));
    }
}
