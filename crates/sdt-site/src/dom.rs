//! Arena-backed document tree.
//!
//! Nodes are never freed: removing a node detaches it from its parent, so a
//! stale [`NodeId`] held by a controller stays valid and simply reports
//! `is_attached == false`.

use crate::result::SiteResult;
use crate::selector::SelectorList;
use std::fmt;

/// Handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
    classes: Vec<String>,
    style: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Mutable document tree with selector queries
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document (root node only)
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    /// The document node
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// First `<body>` element, if any
    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|&n| self.tag_name(n) == Some("body"))
    }

    /// Total nodes ever allocated, attached or not
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    // =========================================================================
    // Tree construction
    // =========================================================================

    /// Allocate a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            ..ElementData::default()
        }))
    }

    /// Allocate a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    ///
    /// Appending a node under itself or one of its descendants is ignored.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() || parent == child {
            return;
        }
        if self.ancestors(parent).any(|a| a == child) {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Detach `node` from its parent; the subtree stays intact
    pub fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return;
        };
        self.nodes[parent.0].children.retain(|&c| c != node);
        self.nodes[node.0].parent = None;
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Parent of any node
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    /// Parent if it is an element
    #[must_use]
    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|&p| self.is_element(p))
    }

    /// Child list
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[], |n| n.children.as_slice())
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }

    /// Strict descendants in document (pre-)order
    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(self.children(next).iter().rev().copied());
            Some(next)
        })
    }

    /// Whether the node is reachable from the document root
    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        node == self.root() || self.ancestors(node).any(|a| a == self.root())
    }

    /// Whether the node is an element
    #[must_use]
    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    /// Lowercase tag name of an element
    #[must_use]
    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    /// Concatenated text of the subtree
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(Node {
            kind: NodeKind::Text(t),
            ..
        }) = self.node(node)
        {
            out.push_str(t);
        }
        for d in self.descendants(node) {
            if let Some(Node {
                kind: NodeKind::Text(t),
                ..
            }) = self.node(d)
            {
                out.push_str(t);
            }
        }
        out
    }

    /// Whether the node is a text node
    #[must_use]
    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(
            self.node(node),
            Some(Node {
                kind: NodeKind::Text(_),
                ..
            })
        )
    }

    // =========================================================================
    // Attributes, classes and inline style
    // =========================================================================

    /// Attribute value; `class` and `style` are serialized on demand
    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let el = self.element(node)?;
        match name {
            "class" if !el.classes.is_empty() => Some(el.classes.join(" ")),
            "style" if !el.style.is_empty() => Some(
                el.style
                    .iter()
                    .map(|(k, v)| format!("{k}: {v};"))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            "class" | "style" => None,
            _ => el
                .attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone()),
        }
    }

    /// Whether the attribute is present
    #[must_use]
    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Set an attribute; `class` and `style` replace the parsed lists
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(node) else {
            return;
        };
        match name {
            "class" => {
                el.classes = Vec::new();
                for c in value.split_whitespace() {
                    if !el.classes.iter().any(|x| x == c) {
                        el.classes.push(c.to_string());
                    }
                }
            }
            "style" => el.style = parse_style(value),
            _ => {
                if let Some(slot) = el.attrs.iter_mut().find(|(k, _)| k == name) {
                    slot.1 = value.to_string();
                } else {
                    el.attrs.push((name.to_string(), value.to_string()));
                }
            }
        }
    }

    /// Remove an attribute if present
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let Some(el) = self.element_mut(node) else {
            return;
        };
        match name {
            "class" => el.classes.clear(),
            "style" => el.style.clear(),
            _ => el.attrs.retain(|(k, _)| k != name),
        }
    }

    /// Class list in insertion order
    #[must_use]
    pub fn classes(&self, node: NodeId) -> &[String] {
        self.element(node).map_or(&[], |e| e.classes.as_slice())
    }

    /// Whether the element carries `class`
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    /// Add a class; returns whether the list changed
    pub fn add_class(&mut self, node: NodeId, class: &str) -> bool {
        let Some(el) = self.element_mut(node) else {
            return false;
        };
        if el.classes.iter().any(|c| c == class) {
            return false;
        }
        el.classes.push(class.to_string());
        true
    }

    /// Remove a class; returns whether the list changed
    pub fn remove_class(&mut self, node: NodeId, class: &str) -> bool {
        let Some(el) = self.element_mut(node) else {
            return false;
        };
        let before = el.classes.len();
        el.classes.retain(|c| c != class);
        el.classes.len() != before
    }

    /// Inline style property value
    #[must_use]
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.element(node)?
            .style
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.as_str())
    }

    /// Set an inline style property; an empty value removes it
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if value.is_empty() {
            self.remove_style(node, property);
            return;
        }
        let Some(el) = self.element_mut(node) else {
            return;
        };
        if let Some(slot) = el.style.iter_mut().find(|(k, _)| k == property) {
            slot.1 = value.to_string();
        } else {
            el.style.push((property.to_string(), value.to_string()));
        }
    }

    /// Remove an inline style property
    pub fn remove_style(&mut self, node: NodeId, property: &str) {
        if let Some(el) = self.element_mut(node) {
            el.style.retain(|(k, _)| k != property);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All attached elements matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is outside the supported subset.
    pub fn query_selector_all(&self, selector: &str) -> SiteResult<Vec<NodeId>> {
        self.query_selector_all_from(self.root(), selector)
    }

    /// First attached element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is outside the supported subset.
    pub fn query_selector(&self, selector: &str) -> SiteResult<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .descendants(self.root())
            .find(|&n| list.matches(self, n)))
    }

    /// Descendants of `scope` matching `selector`, in document order.
    ///
    /// Ancestors of `scope` still take part in combinator matching.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is outside the supported subset.
    pub fn query_selector_all_from(&self, scope: NodeId, selector: &str) -> SiteResult<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope)
            .filter(|&n| list.matches(self, n))
            .collect())
    }

    /// First descendant of `scope` matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is outside the supported subset.
    pub fn query_selector_from(&self, scope: NodeId, selector: &str) -> SiteResult<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self.descendants(scope).find(|&n| list.matches(self, n)))
    }

    /// Whether `node` matches `selector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is outside the supported subset.
    pub fn matches(&self, node: NodeId, selector: &str) -> SiteResult<bool> {
        Ok(SelectorList::parse(selector)?.matches(self, node))
    }

    /// Nearest inclusive ancestor element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is outside the supported subset.
    pub fn closest(&self, node: NodeId, selector: &str) -> SiteResult<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        let start = if self.is_element(node) {
            Some(node)
        } else {
            self.parent_element(node)
        };
        Ok(std::iter::successors(start, |&n| self.parent_element(n)).find(|&n| list.matches(self, n)))
    }
}

/// Parse `a: b; c: d` into ordered pairs; later duplicates win
#[must_use]
pub fn parse_style(text: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for decl in text.split(';') {
        let Some((k, v)) = decl.split_once(':') else {
            continue;
        };
        let (k, v) = (k.trim().to_ascii_lowercase(), v.trim().to_string());
        if k.is_empty() || v.is_empty() {
            continue;
        }
        if let Some(slot) = out.iter_mut().find(|(key, _)| *key == k) {
            slot.1 = v;
        } else {
            out.push((k, v));
        }
    }
    out
}
