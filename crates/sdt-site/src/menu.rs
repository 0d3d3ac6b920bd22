//! Mobile menu controller.
//!
//! Opening shows the panel at once. Closing hides the panel at once and
//! covers the gap with a fixed "collapse" strip that animates its height to
//! zero, then removes itself on transition end (or a fallback timer).

use crate::config::Timings;
use crate::dom::NodeId;
use crate::page::Page;
use crate::resolver::{id_selector, VisibilityResolver};
use crate::result::SiteResult;
use crate::scheduler::Task;
use crate::view::PANEL_BACKGROUND;
use crate::window::Behavior;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Open-state class on the toggle and panel
pub const OPEN_CLASS: &str = "is-open";
/// Class held by the panel during its opening phase
pub const OPENING_CLASS: &str = "menu-opening";
/// Class on collapse strips
pub const COLLAPSE_CLASS: &str = "sdt-menu-collapse";

/// Top of the collapse strip (header height on phones)
const COLLAPSE_TOP: &str = "89px";
/// Starting height of the collapse strip
const COLLAPSE_HEIGHT: &str = "122px";

/// Menu lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuState {
    /// Panel hidden, no collapse running
    Closed,
    /// Panel shown, `menu-opening` still set
    Opening,
    /// Panel shown
    Open,
    /// Panel hidden, collapse strip still animating
    Closing,
}

/// Where the menu lives in the markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuSelectors {
    /// Toggle button
    pub toggle: String,
    /// Panel
    pub panel: String,
    /// Links inside the panel
    pub links: String,
}

impl Default for MenuSelectors {
    fn default() -> Self {
        Self {
            toggle: ".sdt-menu-toggle, .framer-1080cat".to_string(),
            panel: ".sdt-mobile-menu, .framer-lxsbpu".to_string(),
            links: r#".sdt-mobile-menu__link, [data-nested-link="true"]"#.to_string(),
        }
    }
}

/// Owns the mobile menu for one page
#[derive(Debug, Clone)]
pub struct MenuController {
    selectors: MenuSelectors,
    timings: Timings,
    state: MenuState,
    generation: u64,
    collapsing: Vec<NodeId>,
}

impl MenuController {
    /// Create a closed controller
    #[must_use]
    pub fn new(timings: Timings) -> Self {
        Self::with_selectors(timings, MenuSelectors::default())
    }

    /// Create a controller for custom markup
    #[must_use]
    pub const fn with_selectors(timings: Timings, selectors: MenuSelectors) -> Self {
        Self {
            selectors,
            timings,
            state: MenuState::Closed,
            generation: 0,
            collapsing: Vec::new(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> MenuState {
        self.state
    }

    /// Whether the panel is shown
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, MenuState::Opening | MenuState::Open)
    }

    /// Collapse strips still in the document
    #[must_use]
    pub fn collapse_nodes(&self) -> &[NodeId] {
        &self.collapsing
    }

    /// Selectors in use
    #[must_use]
    pub const fn selectors(&self) -> &MenuSelectors {
        &self.selectors
    }

    fn parts(&self, page: &Page) -> SiteResult<Option<(NodeId, NodeId)>> {
        let doc = page.document();
        let toggle = doc.query_selector(&self.selectors.toggle)?;
        let panel = doc.query_selector(&self.selectors.panel)?;
        Ok(toggle.zip(panel))
    }

    /// Hide the panel. Returns `Ok(false)` when the page has no menu.
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn init(&mut self, page: &mut Page) -> SiteResult<bool> {
        let Some((toggle, panel)) = self.parts(page)? else {
            debug!("no mobile menu on page");
            return Ok(false);
        };
        page.set_style(panel, "display", "none");
        page.remove_class(panel, OPEN_CLASS);
        page.remove_class(toggle, OPEN_CLASS);
        self.state = MenuState::Closed;
        Ok(true)
    }

    /// Whether the panel is currently displayed (inline display not `none`)
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn panel_displayed(&self, page: &Page) -> SiteResult<bool> {
        let doc = page.document();
        Ok(doc.query_selector(&self.selectors.panel)?.is_some_and(|panel| {
            !doc.has_attribute(panel, "hidden") && doc.style(panel, "display") != Some("none")
        }))
    }

    /// Open when closed or closing, otherwise close
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn toggle(&mut self, page: &mut Page) -> SiteResult<()> {
        if self.is_open() {
            self.close(page)?;
        } else {
            self.open(page)?;
        }
        Ok(())
    }

    /// Show the panel
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn open(&mut self, page: &mut Page) -> SiteResult<bool> {
        let Some((toggle, panel)) = self.parts(page)? else {
            return Ok(false);
        };
        if self.is_open() {
            return Ok(false);
        }
        page.set_style(panel, "display", "flex");
        page.add_class(panel, OPEN_CLASS);
        page.add_class(panel, OPENING_CLASS);
        page.add_class(toggle, OPEN_CLASS);
        page.set_attribute(toggle, "aria-label", "Close menu");

        self.generation += 1;
        page.set_timeout(
            self.timings.menu_opening_ms,
            Task::MenuOpened {
                generation: self.generation,
            },
        );
        self.state = MenuState::Opening;
        info!(generation = self.generation, "mobile menu opened");
        Ok(true)
    }

    /// Hide the panel and start the collapse strip. No-op when already
    /// closed or closing.
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn close(&mut self, page: &mut Page) -> SiteResult<bool> {
        if !self.is_open() {
            return Ok(false);
        }
        let Some((toggle, panel)) = self.parts(page)? else {
            return Ok(false);
        };

        page.remove_class(toggle, OPEN_CLASS);
        page.set_attribute(toggle, "aria-label", "Open menu");
        page.remove_class(panel, OPEN_CLASS);
        page.remove_class(panel, OPENING_CLASS);

        let style = format!(
            "position: fixed; top: {COLLAPSE_TOP}; left: 0; width: 100%; height: {COLLAPSE_HEIGHT}; \
             background: {PANEL_BACKGROUND}; z-index: 10000; overflow: hidden; transition: {}",
            self.timings.collapse_transition()
        );
        let Some(body) = page.document().body() else {
            page.set_style(panel, "display", "none");
            self.state = MenuState::Closed;
            return Ok(true);
        };
        let strip = page.mutate(|doc| {
            let strip = doc.create_element("div");
            doc.set_attribute(strip, "class", COLLAPSE_CLASS);
            doc.set_attribute(strip, "style", &style);
            doc.append_child(body, strip);
            strip
        });
        page.force_layout();
        page.set_style(panel, "display", "none");

        page.request_frame(Task::MenuCollapseArm { node: strip });
        page.set_timeout(
            self.timings.menu_collapse_fallback_ms,
            Task::MenuCollapseRemove { node: strip },
        );
        self.collapsing.push(strip);
        self.state = MenuState::Closing;
        info!(%strip, "mobile menu closing");
        Ok(true)
    }

    fn remove_strip(&mut self, page: &mut Page, node: NodeId) {
        let before = self.collapsing.len();
        self.collapsing.retain(|&n| n != node);
        if self.collapsing.len() == before {
            return;
        }
        page.remove(node);
        debug!(%node, "collapse strip removed");
        if self.collapsing.is_empty() && self.state == MenuState::Closing {
            self.state = MenuState::Closed;
        }
    }

    /// Handle a scheduled menu task
    pub fn handle_task(&mut self, page: &mut Page, task: Task) {
        match task {
            Task::MenuOpened { generation } => {
                if generation != self.generation || self.state != MenuState::Opening {
                    return;
                }
                if let Ok(Some((_, panel))) = self.parts(page) {
                    page.remove_class(panel, OPENING_CLASS);
                }
                self.state = MenuState::Open;
            }
            Task::MenuCollapseArm { node } if self.collapsing.contains(&node) => {
                page.request_frame(Task::MenuCollapseStart { node });
            }
            Task::MenuCollapseStart { node } if self.collapsing.contains(&node) => {
                page.set_style(node, "height", "0px");
            }
            Task::MenuCollapseRemove { node } => self.remove_strip(page, node),
            Task::MenuScrollTo { node } => {
                let top = page.page_top(node) - self.timings.header_offset();
                debug!(%node, top, "menu link scroll");
                page.scroll_to(top, Behavior::Smooth);
            }
            _ => {}
        }
    }

    /// A transition ended; removes the strip when its height collapse ended
    pub fn handle_transition_end(&mut self, page: &mut Page, node: NodeId, property: &str) {
        if property == "height" {
            self.remove_strip(page, node);
        }
    }

    /// Route a click on an in-menu link.
    ///
    /// Returns `Ok(true)` when the click belonged to a menu link; such
    /// clicks do not propagate to other handlers.
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn handle_link_click(&mut self, page: &mut Page, target: NodeId) -> SiteResult<bool> {
        let doc = page.document();
        let Some(link) = doc.closest(target, &self.selectors.links)? else {
            return Ok(false);
        };
        if doc.closest(link, &self.selectors.panel)?.is_none() {
            return Ok(false);
        }
        let Some(href) = doc.attribute(link, "href") else {
            return Ok(false);
        };
        let Some(id) = href.strip_prefix('#').filter(|id| !id.is_empty()) else {
            return Ok(false);
        };

        let Some(destination) = page.resolve_visible(&id_selector(id))? else {
            debug!(id, "menu link target not found");
            return Ok(true);
        };
        self.close(page)?;
        page.set_timeout(
            self.timings.link_scroll_delay_ms,
            Task::MenuScrollTo { node: destination },
        );
        info!(id, "menu link followed");
        Ok(true)
    }
}
