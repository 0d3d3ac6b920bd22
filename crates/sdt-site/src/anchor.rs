//! In-page anchor navigation.
//!
//! Clicks on `#id` links scroll to the visible element with that id. On
//! phones with the menu panel displayed, the scroll leaves room for the fixed
//! header instead of aligning the target to the viewport top.

use crate::breakpoint::Breakpoint;
use crate::dom::NodeId;
use crate::menu::MenuController;
use crate::page::Page;
use crate::resolver::{id_selector, VisibilityResolver};
use crate::result::SiteResult;
use crate::window::Behavior;
use tracing::debug;

/// Links produced by the page export
pub const NESTED_LINK_SELECTOR: &str = r##"[data-nested-link="true"][href^="#"]"##;
/// Plain in-page anchors
pub const ANCHOR_SELECTOR: &str = r##"a[href^="#"]"##;

/// Smooth-scrolls to in-page targets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorNavigator {
    header_offset: f64,
}

impl AnchorNavigator {
    /// Navigator leaving `header_offset` px above targets when the phone
    /// menu is displayed
    #[must_use]
    pub const fn new(header_offset: f64) -> Self {
        Self { header_offset }
    }

    /// The `#id` link a click on `target` activates, with its id
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn link_for(page: &Page, target: NodeId) -> SiteResult<Option<(NodeId, String)>> {
        let doc = page.document();
        let link = match doc.closest(target, NESTED_LINK_SELECTOR)? {
            Some(link) => Some(link),
            None => doc.closest(target, ANCHOR_SELECTOR)?,
        };
        Ok(link.and_then(|link| {
            let href = doc.attribute(link, "href")?;
            let id = href.strip_prefix('#')?;
            (!id.is_empty()).then(|| (link, id.to_string()))
        }))
    }

    /// Handle a click. Returns whether a scroll started.
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn handle_click(
        &self,
        page: &mut Page,
        menu: &MenuController,
        target: NodeId,
    ) -> SiteResult<bool> {
        let Some((_, id)) = Self::link_for(page, target)? else {
            return Ok(false);
        };
        let Some(destination) = page.resolve_visible(&id_selector(&id))? else {
            debug!(id = %id, "anchor target not visible");
            return Ok(false);
        };

        if page.breakpoint() == Breakpoint::Phone && menu.panel_displayed(page)? {
            let top = page.page_top(destination) - self.header_offset;
            debug!(id = %id, top, "anchor scroll below phone header");
            page.scroll_to(top, Behavior::Smooth);
        } else {
            debug!(id = %id, "anchor scroll into view");
            page.scroll_into_view(destination, Behavior::Smooth);
        }
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::breakpoint::DeviceProfile;
    use crate::config::Timings;
    use crate::dom::Document;
    use crate::template::ElementTemplate;

    fn page(profile: DeviceProfile) -> Page {
        let mut doc = Document::new();
        let variant = |bp: &str| {
            ElementTemplate::new("div")
                .attr("data-visible-on", bp)
                .child(ElementTemplate::new("section").attr("id", "hero").style("height", "1000px"))
                .child(ElementTemplate::new("section").attr("id", "firm").style("height", "1000px"))
        };
        let body = ElementTemplate::new("body")
            .child(
                ElementTemplate::new("nav")
                    .child(
                        ElementTemplate::new("a")
                            .attr("href", "#firm")
                            .child(ElementTemplate::new("span").text("The Firm")),
                    )
                    .child(
                        ElementTemplate::new("div")
                            .attr("data-nested-link", "true")
                            .attr("href", "#firm")
                            .text("Firm"),
                    )
                    .child(ElementTemplate::new("a").attr("href", "#").text("Top"))
                    .child(ElementTemplate::new("a").attr("href", "#missing").text("Gone")),
            )
            .child(
                ElementTemplate::new("nav")
                    .class("sdt-mobile-menu")
                    .attr("data-visible-on", "phone")
                    .style("display", "flex"),
            )
            .child(variant("phone"))
            .child(variant("tablet"))
            .child(variant("desktop"))
            .instantiate(&mut doc);
        doc.append_child(doc.root(), body);
        Page::new(doc, profile, "/")
    }

    fn settle(page: &mut Page) {
        while page.next_event(page.now() + 2000).is_some() {}
    }

    #[test]
    fn test_scrolls_into_view_on_desktop() {
        let mut page = page(DeviceProfile::desktop());
        let menu = MenuController::new(Timings::default());
        let span = page.document().query_selector("nav a span").unwrap().unwrap();
        let nav = AnchorNavigator::new(60.0);
        assert!(nav.handle_click(&mut page, &menu, span).unwrap());
        settle(&mut page);
        let firm = page.resolve_visible("#firm").unwrap().unwrap();
        assert!(page.client_rect(firm).y.abs() < 1e-6);
    }

    #[test]
    fn test_phone_with_menu_displayed_leaves_header_room() {
        let mut page = page(DeviceProfile::phone());
        let menu = MenuController::new(Timings::default());
        let link = page
            .document()
            .query_selector(r#"[data-nested-link="true"]"#)
            .unwrap()
            .unwrap();
        let nav = AnchorNavigator::new(60.0);
        assert!(nav.handle_click(&mut page, &menu, link).unwrap());
        settle(&mut page);
        let firm = page.resolve_visible("#firm").unwrap().unwrap();
        assert!((page.client_rect(firm).y - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_ignored_links() {
        let mut page = page(DeviceProfile::tablet());
        let menu = MenuController::new(Timings::default());
        let nav = AnchorNavigator::new(60.0);
        let links = page.document().query_selector_all("nav a").unwrap();
        // "#" and a missing target
        assert!(!nav.handle_click(&mut page, &menu, links[1]).unwrap());
        assert!(!nav.handle_click(&mut page, &menu, links[2]).unwrap());
        let body = page.document().body().unwrap();
        assert!(!nav.handle_click(&mut page, &menu, body).unwrap());
        assert!(page.scroll_y().abs() < f64::EPSILON);
    }

    #[test]
    fn test_quoted_id_resolves() {
        let awkward = r#"a"b\c"#;
        let mut doc = Document::new();
        let body = ElementTemplate::new("body")
            .child(ElementTemplate::new("a").attr("href", &format!("#{awkward}")).text("Odd"))
            .child(ElementTemplate::new("section").style("height", "1500px"))
            .child(ElementTemplate::new("section").attr("id", awkward).style("height", "1000px"))
            .instantiate(&mut doc);
        doc.append_child(doc.root(), body);
        let mut page = Page::new(doc, DeviceProfile::desktop(), "/");
        let menu = MenuController::new(Timings::default());
        let link = page.document().query_selector("a").unwrap().unwrap();

        let nav = AnchorNavigator::new(60.0);
        assert!(nav.handle_click(&mut page, &menu, link).unwrap());
        settle(&mut page);
        let target = page.resolve_visible(&id_selector(awkward)).unwrap().unwrap();
        assert!(page.client_rect(target).y.abs() < 1e-6);
        assert!(page.scroll_y() >= 1500.0);
    }
}
