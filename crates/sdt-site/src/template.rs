//! Element templates: a detached markup tree that can be rendered to HTML or
//! instantiated into a [`Document`].

use crate::dom::{Document, NodeId};
use serde::{Deserialize, Serialize};

/// Template child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateNode {
    /// Nested element
    Element(ElementTemplate),
    /// Text run
    Text(String),
}

/// Builder for one element and its subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementTemplate {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<TemplateNode>,
}

impl ElementTemplate {
    /// Start an element
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute, replacing any earlier value
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value.to_string();
        } else {
            self.attrs.push((name.to_string(), value.to_string()));
        }
        self
    }

    /// Append one class
    #[must_use]
    pub fn class(self, class: &str) -> Self {
        let joined = match self.get("class") {
            Some(existing) => format!("{existing} {class}"),
            None => class.to_string(),
        };
        self.attr("class", &joined)
    }

    /// Append one inline style declaration
    #[must_use]
    pub fn style(self, property: &str, value: &str) -> Self {
        let joined = match self.get("style") {
            Some(existing) => format!("{existing} {property}: {value};"),
            None => format!("{property}: {value};"),
        };
        self.attr("style", &joined)
    }

    /// Append a child element
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(TemplateNode::Element(child));
        self
    }

    /// Append several child elements
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children
            .extend(children.into_iter().map(TemplateNode::Element));
        self
    }

    /// Append a text run
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.children.push(TemplateNode::Text(text.to_string()));
        self
    }

    /// Tag name
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute value set on the template
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child list
    #[must_use]
    pub fn child_nodes(&self) -> &[TemplateNode] {
        &self.children
    }

    /// Build the subtree in `doc` (detached) and return its root
    pub fn instantiate(&self, doc: &mut Document) -> NodeId {
        let node = doc.create_element(&self.tag);
        for (k, v) in &self.attrs {
            doc.set_attribute(node, k, v);
        }
        for child in &self.children {
            let id = match child {
                TemplateNode::Element(el) => el.instantiate(doc),
                TemplateNode::Text(t) => doc.create_text(t),
            };
            doc.append_child(node, id);
        }
        node
    }

    /// Serialize to HTML
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (k, v) in &self.attrs {
            if v.is_empty() {
                out.push_str(&format!(" {k}"));
            } else {
                out.push_str(&format!(r#" {k}="{}""#, escape(v)));
            }
        }
        out.push('>');
        if is_void(&self.tag) {
            return;
        }
        for child in &self.children {
            match child {
                TemplateNode::Element(el) => el.write_html(out),
                TemplateNode::Text(t) => out.push_str(&escape(t)),
            }
        }
        out.push_str(&format!("</{}>", self.tag));
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "br" | "hr" | "input" | "meta" | "link")
}

/// Escape text for HTML content and quoted attributes
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_render_html() {
        let t = ElementTemplate::new("div")
            .class("sdt-bio-overlay")
            .class("sdt-bio-overlay--phone")
            .attr("hidden", "")
            .child(ElementTemplate::new("p").text("Sanders, Dunn & Thompson <LLP>"))
            .child(ElementTemplate::new("img").attr("src", "a.jpg"));
        assert_eq!(
            t.to_html(),
            r#"<div class="sdt-bio-overlay sdt-bio-overlay--phone" hidden><p>Sanders, Dunn &amp; Thompson &lt;LLP&gt;</p><img src="a.jpg"></div>"#
        );
    }

    #[test]
    fn test_instantiate_builds_subtree() {
        let mut doc = Document::new();
        let t = ElementTemplate::new("section")
            .attr("id", "team")
            .style("height", "120px")
            .child(ElementTemplate::new("h2").text("Our Team"));
        let node = t.instantiate(&mut doc);
        assert!(!doc.is_attached(node));
        doc.append_child(doc.root(), node);
        assert_eq!(doc.query_selector("#team").unwrap(), Some(node));
        assert_eq!(doc.style(node, "height"), Some("120px"));
        assert_eq!(doc.text_content(node), "Our Team");
    }
}
