//! Bio overlay view model.
//!
//! One [`AttorneyRecord`] renders to a breakpoint-specific overlay subtree.
//! The phone variant carries a close button; tablet and desktop carry a
//! full-viewport backdrop instead.

use crate::attorney::AttorneyRecord;
use crate::breakpoint::Breakpoint;
use crate::template::ElementTemplate;

/// Class shared by every overlay root
pub const OVERLAY_CLASS: &str = "sdt-bio-overlay";
/// Visible state class on the overlay root
pub const VISIBLE_CLASS: &str = "bio-portal--visible";
/// Closing state class on the overlay root
pub const CLOSING_CLASS: &str = "bio-portal--closing";
/// Enter-animation class on the dialog
pub const ANIMATE_IN_CLASS: &str = "animate-in";
/// Close button selector
pub const CLOSE_BUTTON_SELECTOR: &str = ".sdt-bio-close, .bio-panel__close";
/// Backdrop selector
pub const BACKDROP_SELECTOR: &str = ".bio-portal__backdrop";
/// Dialog selector inside an overlay
pub const DIALOG_SELECTOR: &str = r#"[role="dialog"]"#;

/// Panel colour shared with the menu collapse
pub const PANEL_BACKGROUND: &str = "rgb(242, 240, 233)";

/// Everything needed to render one overlay
#[derive(Debug, Clone)]
pub struct BioViewModel<'a> {
    record: &'a AttorneyRecord,
    breakpoint: Breakpoint,
}

impl<'a> BioViewModel<'a> {
    /// Bind a record to a breakpoint
    #[must_use]
    pub const fn new(record: &'a AttorneyRecord, breakpoint: Breakpoint) -> Self {
        Self { record, breakpoint }
    }

    /// Breakpoint-specific overlay class
    #[must_use]
    pub fn variant_class(&self) -> String {
        format!("{OVERLAY_CLASS}--{}", self.breakpoint)
    }

    /// Selector for this overlay in a document
    #[must_use]
    pub fn selector(&self) -> String {
        overlay_selector(self.breakpoint, &self.record.id)
    }

    fn portrait_height(&self) -> &'static str {
        match self.breakpoint {
            Breakpoint::Phone => "360px",
            Breakpoint::Tablet => "420px",
            Breakpoint::Desktop => "480px",
        }
    }

    /// Render the hidden overlay root and its subtree
    #[must_use]
    pub fn render(&self) -> ElementTemplate {
        let r = self.record;

        let contact = ElementTemplate::new("div")
            .class("bio-panel__contact")
            .child(
                ElementTemplate::new("a")
                    .attr("href", &r.mailto())
                    .text(&r.email),
            )
            .child(ElementTemplate::new("a").attr("href", &r.tel()).text(&r.phone));

        let header = ElementTemplate::new("header")
            .class("bio-panel__header")
            .child(ElementTemplate::new("h2").class("bio-panel__name").text(&r.name))
            .child(ElementTemplate::new("p").class("bio-panel__title").text(&r.title));

        let divider = ElementTemplate::new("hr")
            .class("bio-panel__divider")
            .style("height", "1px")
            .style("background", "#1a1a1a");

        let body = ElementTemplate::new("div")
            .class("bio-panel__body")
            .children(
                r.paragraphs()
                    .into_iter()
                    .map(|p| ElementTemplate::new("p").text(p)),
            );

        let portrait = ElementTemplate::new("img")
            .class("bio-panel__portrait")
            .attr("src", &r.image)
            .attr("alt", &r.name)
            .style("height", self.portrait_height())
            .style("background", "#8c8c8c")
            .style("clip-path", &r.crops.for_breakpoint(self.breakpoint).to_css());

        let mut dialog = ElementTemplate::new("div")
            .class("bio-panel")
            .attr("role", "dialog")
            .attr("aria-modal", "true")
            .attr("aria-label", &r.name)
            .style("background", PANEL_BACKGROUND)
            .style("transition-duration", "300ms");

        if self.breakpoint == Breakpoint::Phone {
            dialog = dialog.child(
                ElementTemplate::new("button")
                    .class("bio-panel__close")
                    .class("sdt-bio-close")
                    .attr("type", "button")
                    .attr("aria-label", "Close")
                    .style("height", "44px")
                    .text("Close"),
            );
        }

        dialog = dialog
            .child(portrait)
            .child(contact)
            .child(header)
            .child(divider)
            .child(body);

        let mut root = ElementTemplate::new("div")
            .class(OVERLAY_CLASS)
            .class(&self.variant_class())
            .class("bio-portal")
            .attr("data-bio-id", &r.id)
            .attr("hidden", "");

        if self.breakpoint != Breakpoint::Phone {
            root = root.child(
                ElementTemplate::new("div")
                    .class("bio-portal__backdrop")
                    .style("position", "fixed")
                    .style("top", "0")
                    .style("left", "0")
                    .style("width", "100%")
                    .style("height", "100%")
                    .style("background", "rgba(26, 26, 26, 0.6)")
                    .style("z-index", "99"),
            );
        }

        root.child(dialog)
    }
}

/// Selector for the overlay of `id` at `breakpoint`
#[must_use]
pub fn overlay_selector(breakpoint: Breakpoint, id: &str) -> String {
    format!(r#".{OVERLAY_CLASS}--{breakpoint}[data-bio-id="{id}"]"#)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attorney::Roster;
    use crate::dom::Document;

    fn render(bp: Breakpoint) -> (Document, crate::dom::NodeId) {
        let roster = Roster::builtin().unwrap();
        let vm = BioViewModel::new(roster.get("1kq6r0t").unwrap(), bp);
        let mut doc = Document::new();
        let node = vm.render().instantiate(&mut doc);
        doc.append_child(doc.root(), node);
        (doc, node)
    }

    #[test]
    fn test_overlay_root_contract() {
        let (doc, root) = render(Breakpoint::Tablet);
        assert_eq!(
            doc.query_selector(&overlay_selector(Breakpoint::Tablet, "1kq6r0t")).unwrap(),
            Some(root)
        );
        assert!(doc.has_attribute(root, "hidden"));
        assert!(doc.has_class(root, "bio-portal"));
        assert!(doc.query_selector_from(root, DIALOG_SELECTOR).unwrap().is_some());
    }

    #[test]
    fn test_phone_has_close_button_not_backdrop() {
        let (doc, root) = render(Breakpoint::Phone);
        assert!(doc.query_selector_from(root, ".sdt-bio-close").unwrap().is_some());
        assert!(doc.query_selector_from(root, BACKDROP_SELECTOR).unwrap().is_none());

        let (doc, root) = render(Breakpoint::Desktop);
        assert!(doc.query_selector_from(root, ".sdt-bio-close").unwrap().is_none());
        let backdrop = doc.query_selector_from(root, BACKDROP_SELECTOR).unwrap().unwrap();
        assert_eq!(doc.parent(backdrop), Some(root));
    }

    #[test]
    fn test_one_paragraph_per_chunk_after_divider() {
        let (doc, root) = render(Breakpoint::Desktop);
        let paras = doc.query_selector_all_from(root, ".bio-panel__body p").unwrap();
        assert_eq!(paras.len(), 3);
        let dialog = doc.query_selector_from(root, DIALOG_SELECTOR).unwrap().unwrap();
        let order: Vec<String> = doc
            .children(dialog)
            .iter()
            .filter_map(|&c| doc.attribute(c, "class"))
            .collect();
        assert_eq!(
            order,
            vec![
                "bio-panel__portrait",
                "bio-panel__contact",
                "bio-panel__header",
                "bio-panel__divider",
                "bio-panel__body"
            ]
        );
    }

    #[test]
    fn test_html_contains_contact() {
        let roster = Roster::builtin().unwrap();
        let html = BioViewModel::new(roster.get("a2aut").unwrap(), Breakpoint::Phone)
            .render()
            .to_html();
        assert!(html.contains(r#"href="mailto:hdunn@sdtlaw.com""#));
        assert!(html.contains("sdt-bio-overlay--phone"));
    }
}
