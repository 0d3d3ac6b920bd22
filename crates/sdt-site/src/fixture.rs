//! The firm's landing page as an in-process fixture.
//!
//! Two markups of the same page are served: the semantic rebuild at `/` and
//! the page-builder export at `/_baseline/` (plus an alternate export at
//! `/_baseline2/`). Both repeat every section once per breakpoint, hide the
//! copies that do not apply, and paint identically; only class names, link
//! elements and overlay provisioning differ. The semantic page ships its bio
//! overlays pre-rendered, the export leaves them to the overlay controller.

use crate::attorney::{AttorneyRecord, Roster};
use crate::breakpoint::{Breakpoint, DeviceProfile};
use crate::config::Timings;
use crate::dom::Document;
use crate::page::Page;
use crate::result::{SiteError, SiteResult};
use crate::runtime::SiteRuntime;
use crate::template::ElementTemplate;
use crate::view::{BioViewModel, PANEL_BACKGROUND};
use serde::{Deserialize, Serialize};
use std::fmt;

const HERO_BACKGROUND: &str = "#1f2a36";
const FIRM_BACKGROUND: &str = "#f7f5ef";
const TEAM_BACKGROUND: &str = "#ffffff";
const CARD_BACKGROUND: &str = "#e9e4d8";
const PORTRAIT_BACKGROUND: &str = "#8c8c8c";
const DARK: &str = "#1a1a1a";
const LIGHT_TEXT: &str = "#f2f0e9";

/// Sections linked from the header and the mobile menu
const NAV_LINKS: [(&str, &str); 3] = [("#firm", "The Firm"), ("#team", "Our Team"), ("#contact", "Contact")];

/// Which markup a URL serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Markup {
    /// Hand-written semantic rebuild
    Semantic,
    /// Page-builder export
    Export,
}

impl Markup {
    /// Markup served at `path`
    #[must_use]
    pub fn for_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "" | "/index.html" => Some(Self::Semantic),
            "/_baseline" | "/_baseline2" => Some(Self::Export),
            _ => None,
        }
    }

    /// Short name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path component of a URL (`http://host:port/a/?q` → `/a/`)
#[must_use]
pub fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = if url.contains("://") {
        rest.find('/').map_or("/", |i| &rest[i..])
    } else {
        rest
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

// =============================================================================
// Markup
// =============================================================================

fn section_heights(bp: Breakpoint) -> (u32, u32, u32) {
    // (header, hero, firm)
    match bp {
        Breakpoint::Phone => (89, 700, 900),
        Breakpoint::Tablet => (100, 900, 1000),
        Breakpoint::Desktop => (100, 800, 900),
    }
}

fn px(v: u32) -> String {
    format!("{v}px")
}

fn link(markup: Markup, href: &str, label: &str, class: &str) -> ElementTemplate {
    let a = ElementTemplate::new("a").attr("href", href).text(label);
    match markup {
        Markup::Semantic => a.class(class),
        Markup::Export => a.attr("data-nested-link", "true"),
    }
}

fn header(markup: Markup, bp: Breakpoint) -> ElementTemplate {
    let (height, _, _) = section_heights(bp);
    let (tag, class) = match markup {
        Markup::Semantic => ("header", "sdt-header"),
        Markup::Export => ("div", "framer-header"),
    };
    let logo = ElementTemplate::new("div").class("sdt-logo").text("SD&T Law");
    let mut header = ElementTemplate::new(tag)
        .class(class)
        .style("height", &px(height))
        .style("background", PANEL_BACKGROUND)
        .style("display", "flex")
        .child(logo);

    if bp == Breakpoint::Phone {
        let toggle_class = match markup {
            Markup::Semantic => "sdt-menu-toggle",
            Markup::Export => "framer-1080cat",
        };
        header = header.child(
            ElementTemplate::new("button")
                .class(toggle_class)
                .attr("type", "button")
                .attr("aria-label", "Open menu")
                .style("height", "44px")
                .text("Menu"),
        );
    } else {
        header = header.children(
            NAV_LINKS
                .iter()
                .map(|(href, label)| link(markup, href, label, "sdt-nav__link")),
        );
    }
    header
}

fn card(markup: Markup, record: &AttorneyRecord, bp: Breakpoint) -> ElementTemplate {
    let (height, portrait) = match bp {
        Breakpoint::Phone => (520, 400),
        Breakpoint::Tablet => (420, 320),
        Breakpoint::Desktop => (460, 360),
    };
    let card_class = match markup {
        Markup::Semantic => "sdt-team__card",
        Markup::Export => "framer-74g9dq",
    };
    let card = ElementTemplate::new("div")
        .class(card_class)
        .style("height", &px(height))
        .style("background", CARD_BACKGROUND)
        .child(
            ElementTemplate::new("div")
                .class("sdt-team__portrait")
                .style("height", &px(portrait))
                .style("background", PORTRAIT_BACKGROUND),
        )
        .child(ElementTemplate::new("p").class("sdt-team__name").text(&record.name))
        .child(ElementTemplate::new("p").class("sdt-team__title").text(&record.title));

    let container = ElementTemplate::new("div").attr("id", &record.id).child(card);
    match markup {
        Markup::Semantic => ElementTemplate::new("article")
            .class("sdt-team__member")
            .attr("id", &record.semantic_id)
            .child(container),
        Markup::Export => container.class(&format!("framer-{}-container", record.id)),
    }
}

fn team(markup: Markup, roster: &Roster, bp: Breakpoint) -> ElementTemplate {
    let mut cards = ElementTemplate::new("div")
        .class("sdt-team__grid")
        .style("gap", "24px");
    if bp != Breakpoint::Phone {
        cards = cards.style("display", "flex");
    }
    let cards = cards.children(roster.records().iter().map(|r| card(markup, r, bp)));

    ElementTemplate::new("section")
        .attr("id", "team")
        .class("sdt-team")
        .style("background", TEAM_BACKGROUND)
        .child(
            ElementTemplate::new("h2")
                .class("sdt-team__heading")
                .style("height", "120px")
                .text("Our Team"),
        )
        .child(cards)
}

fn footer(markup: Markup) -> ElementTemplate {
    let class = match markup {
        Markup::Semantic => "sdt-footer",
        Markup::Export => "framer-footer",
    };
    ElementTemplate::new("footer")
        .class(class)
        .attr("id", "contact")
        .style("height", "400px")
        .style("background", DARK)
        .child(
            ElementTemplate::new("p")
                .style("color", LIGHT_TEXT)
                .text("SD&T Law · Counsel for families and businesses"),
        )
}

fn variant(markup: Markup, roster: &Roster, bp: Breakpoint) -> ElementTemplate {
    let (_, hero, firm) = section_heights(bp);
    ElementTemplate::new("div")
        .class("sdt-variant")
        .attr("data-visible-on", bp.as_str())
        .child(header(markup, bp))
        .child(
            ElementTemplate::new("section")
                .attr("id", "hero")
                .class("sdt-hero")
                .style("height", &px(hero))
                .style("background", HERO_BACKGROUND)
                .child(
                    ElementTemplate::new("h1")
                        .style("color", LIGHT_TEXT)
                        .text("Trusted counsel, close to home"),
                ),
        )
        .child(
            ElementTemplate::new("section")
                .attr("id", "firm")
                .class("sdt-firm")
                .style("height", &px(firm))
                .style("background", FIRM_BACKGROUND)
                .child(ElementTemplate::new("h2").text("The Firm")),
        )
        .child(team(markup, roster, bp))
        .child(footer(markup))
}

fn mobile_menu(markup: Markup) -> ElementTemplate {
    let (tag, class) = match markup {
        Markup::Semantic => ("nav", "sdt-mobile-menu"),
        Markup::Export => ("div", "framer-lxsbpu"),
    };
    ElementTemplate::new(tag)
        .class(class)
        .attr("data-visible-on", "phone")
        .style("display", "none")
        .style("flex-direction", "column")
        .style("position", "fixed")
        .style("top", "89px")
        .style("left", "0")
        .style("width", "100%")
        .style("height", "122px")
        .style("background", PANEL_BACKGROUND)
        .style("z-index", "9999")
        .children(
            NAV_LINKS
                .iter()
                .map(|(href, label)| link(markup, href, label, "sdt-mobile-menu__link")),
        )
}

/// Body template of the page in `markup`
#[must_use]
pub fn body(markup: Markup, roster: &Roster) -> ElementTemplate {
    let mut body = ElementTemplate::new("body")
        .children(Breakpoint::ALL.iter().map(|&bp| variant(markup, roster, bp)))
        .child(mobile_menu(markup));
    if markup == Markup::Semantic {
        for record in roster.records() {
            body = body.children(
                Breakpoint::ALL
                    .iter()
                    .map(|&bp| BioViewModel::new(record, bp).render()),
            );
        }
    }
    body
}

/// Build the page document
#[must_use]
pub fn document(markup: Markup, roster: &Roster) -> Document {
    let mut doc = Document::new();
    let html = doc.create_element("html");
    let root = doc.root();
    doc.append_child(root, html);
    let body = body(markup, roster).instantiate(&mut doc);
    doc.append_child(html, body);
    doc
}

/// Full HTML of the page
#[must_use]
pub fn html(markup: Markup, roster: &Roster) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>SD&amp;T Law</title></head>{}</html>",
        body(markup, roster).to_html()
    )
}

/// Load `markup` into a fresh runtime with the built-in roster
///
/// # Errors
///
/// Returns an error if the roster or controller setup fails.
pub fn load(markup: Markup, profile: DeviceProfile, timings: Timings) -> SiteResult<SiteRuntime> {
    let roster = Roster::builtin()?;
    let url = match markup {
        Markup::Semantic => "/",
        Markup::Export => "/_baseline/",
    };
    let page = Page::with_timings(document(markup, &roster), profile, url, &timings);
    SiteRuntime::new(page, roster, timings)
}

/// Load whatever `url` serves
///
/// # Errors
///
/// Returns [`SiteError::Navigation`] for a path nothing is served at.
pub fn load_url(url: &str, profile: DeviceProfile, timings: Timings) -> SiteResult<SiteRuntime> {
    let path = url_path(url);
    let markup = Markup::for_path(path).ok_or_else(|| SiteError::Navigation {
        url: url.to_string(),
        message: format!("404: nothing served at `{path}`"),
    })?;
    let roster = Roster::builtin()?;
    let page = Page::with_timings(document(markup, &roster), profile, url, &timings);
    SiteRuntime::new(page, roster, timings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster;
    use crate::resolver::VisibilityResolver;

    #[test]
    fn test_paths() {
        assert_eq!(Markup::for_path("/"), Some(Markup::Semantic));
        assert_eq!(Markup::for_path("/_baseline/"), Some(Markup::Export));
        assert_eq!(Markup::for_path("/_baseline2"), Some(Markup::Export));
        assert_eq!(Markup::for_path("/nope/"), None);
        assert_eq!(url_path("http://localhost:3000/_baseline/?x=1"), "/_baseline/");
        assert_eq!(url_path("http://localhost:3000"), "/");
        assert_eq!(url_path("/_baseline2/#team"), "/_baseline2/");
    }

    #[test]
    fn test_unknown_url_is_navigation_error() {
        let err = load_url("http://localhost/missing", DeviceProfile::phone(), Timings::default());
        assert!(matches!(err, Err(SiteError::Navigation { .. })));
    }

    #[test]
    fn test_one_visible_copy_per_section() {
        for profile in DeviceProfile::standard() {
            for markup in [Markup::Semantic, Markup::Export] {
                let rt = load(markup, profile.clone(), Timings::default()).unwrap();
                for sel in ["#hero", "#firm", "#team", "#contact", r#"[id="a2aut"]"#] {
                    let all = rt.page().resolve_all_visible(sel).unwrap();
                    assert_eq!(all.len(), 1, "{sel} at {} ({markup})", profile.name);
                }
            }
        }
    }

    #[test]
    fn test_markups_paint_identically() {
        for profile in DeviceProfile::standard() {
            let semantic = load(Markup::Semantic, profile.clone(), Timings::default()).unwrap();
            let export = load(Markup::Export, profile.clone(), Timings::default()).unwrap();
            assert_eq!(
                raster::rasterize(semantic.page()),
                raster::rasterize(export.page()),
                "{}",
                profile.name
            );
        }
    }

    #[test]
    fn test_semantic_has_prerendered_overlays() {
        let roster = Roster::builtin().unwrap();
        let doc = document(Markup::Semantic, &roster);
        assert_eq!(doc.query_selector_all(".sdt-bio-overlay").unwrap().len(), 9);
        let doc = document(Markup::Export, &roster);
        assert!(doc.query_selector_all(".sdt-bio-overlay").unwrap().is_empty());
    }

    #[test]
    fn test_html_export() {
        let roster = Roster::builtin().unwrap();
        let html = html(Markup::Export, &roster);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"class="framer-lxsbpu""#));
    }
}
