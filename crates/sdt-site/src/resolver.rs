//! Visibility resolution for duplicated responsive content.
//!
//! The page export repeats every section once per breakpoint and hides the
//! copies that do not apply, so ids and classes are not unique. The "real"
//! element is the first match in document order with a non-empty bounding
//! box. Every caller (controllers, anchor navigation, harness helpers) uses
//! this one rule.

use crate::dom::NodeId;
use crate::layout::Rect;
use crate::page::Page;
use crate::result::SiteResult;

/// Whether a bounding box counts as visible
#[must_use]
pub fn is_rendered(rect: Rect) -> bool {
    rect.is_rendered()
}

/// Selector for every element carrying `id`, including duplicates.
/// Quotes and backslashes in `id` are escaped.
#[must_use]
pub fn id_selector(id: &str) -> String {
    let mut escaped = String::with_capacity(id.len());
    for c in id.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!(r#"[id="{escaped}"]"#)
}

/// Resolve duplicated content to the currently visible element
pub trait VisibilityResolver {
    /// First element in document order matching `selector` whose bounding
    /// box has non-zero width and height. Reads current layout, no caching.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is outside the supported subset.
    fn resolve_visible(&self, selector: &str) -> SiteResult<Option<NodeId>>;

    /// Every visible match, in document order.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is outside the supported subset.
    fn resolve_all_visible(&self, selector: &str) -> SiteResult<Vec<NodeId>>;
}

impl VisibilityResolver for Page {
    fn resolve_visible(&self, selector: &str) -> SiteResult<Option<NodeId>> {
        Ok(self
            .document()
            .query_selector_all(selector)?
            .into_iter()
            .find(|&n| is_rendered(self.client_rect(n))))
    }

    fn resolve_all_visible(&self, selector: &str) -> SiteResult<Vec<NodeId>> {
        Ok(self
            .document()
            .query_selector_all(selector)?
            .into_iter()
            .filter(|&n| is_rendered(self.client_rect(n)))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::breakpoint::{DeviceProfile, Viewport};
    use crate::dom::Document;
    use crate::result::SiteError;
    use crate::template::ElementTemplate;
    use proptest::prelude::*;

    fn duplicated() -> Document {
        let mut doc = Document::new();
        let variant = |bp: &str, h: &str| {
            ElementTemplate::new("div").attr("data-visible-on", bp).child(
                ElementTemplate::new("section")
                    .attr("id", "team")
                    .attr("data-variant", bp)
                    .style("height", h),
            )
        };
        let body = ElementTemplate::new("body")
            .child(variant("phone", "900px"))
            .child(variant("tablet", "1000px"))
            .child(variant("desktop", "1100px"))
            .instantiate(&mut doc);
        doc.append_child(doc.root(), body);
        doc
    }

    #[test]
    fn test_picks_the_visible_duplicate() {
        for (profile, expect) in [
            (DeviceProfile::phone(), "phone"),
            (DeviceProfile::tablet(), "tablet"),
            (DeviceProfile::desktop(), "desktop"),
        ] {
            let page = Page::new(duplicated(), profile, "/");
            let node = page.resolve_visible(&id_selector("team")).unwrap().unwrap();
            assert_eq!(
                page.document().attribute(node, "data-variant").as_deref(),
                Some(expect)
            );
            assert_eq!(page.resolve_all_visible("#team").unwrap().len(), 1);
        }
    }

    #[test]
    fn test_no_match_is_none() {
        let page = Page::new(duplicated(), DeviceProfile::phone(), "/");
        assert_eq!(page.resolve_visible("#firm").unwrap(), None);
    }

    #[test]
    fn test_bad_selector_is_error() {
        let page = Page::new(duplicated(), DeviceProfile::phone(), "/");
        assert!(matches!(
            page.resolve_visible("#team:first-child"),
            Err(SiteError::Selector { .. })
        ));
    }

    #[test]
    fn test_id_selector_escapes_quotes() {
        assert_eq!(id_selector("team"), r#"[id="team"]"#);
        let awkward = r#"a"b\c"#;
        let selector = id_selector(awkward);
        assert_eq!(selector, r#"[id="a\"b\\c"]"#);

        let mut doc = Document::new();
        let body = ElementTemplate::new("body")
            .child(ElementTemplate::new("section").attr("id", awkward).style("height", "100px"))
            .instantiate(&mut doc);
        doc.append_child(doc.root(), body);
        let page = Page::new(doc, DeviceProfile::desktop(), "/");
        assert!(page.resolve_visible(&selector).unwrap().is_some());
    }

    #[test]
    fn test_follows_resize() {
        let mut page = Page::new(duplicated(), DeviceProfile::phone(), "/");
        let phone = page.resolve_visible("#team").unwrap();
        page.resize(Viewport::new(1300, 900));
        let desktop = page.resolve_visible("#team").unwrap();
        assert_ne!(phone, desktop);
    }

    proptest! {
        #[test]
        fn prop_exactly_one_visible_and_stable(width in 200u32..2400) {
            let mut profile = DeviceProfile::desktop();
            profile.viewport = Viewport::new(width, 900);
            let page = Page::new(duplicated(), profile, "/");
            let all = page.resolve_all_visible("#team").unwrap();
            prop_assert_eq!(all.len(), 1);
            let first = page.resolve_visible("#team").unwrap();
            let second = page.resolve_visible("#team").unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(first, Some(all[0]));
        }
    }
}
