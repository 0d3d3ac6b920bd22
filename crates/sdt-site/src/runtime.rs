//! Page runtime: the controllers bound to one page.
//!
//! Owns the [`Page`] and routes user input and page events to the overlay,
//! menu and anchor controllers in the order the browser would deliver them.

use crate::anchor::AnchorNavigator;
use crate::attorney::Roster;
use crate::breakpoint::Viewport;
use crate::config::Timings;
use crate::dom::NodeId;
use crate::menu::MenuController;
use crate::overlay::OverlayController;
use crate::page::{KeyListener, Page, PageEvent};
use crate::raster;
use crate::resolver::{id_selector, VisibilityResolver};
use crate::result::SiteResult;
use tracing::{debug, trace};

/// Card element inside a card container
pub const CARD_SELECTOR: &str = ".sdt-team__card, .framer-74g9dq";

/// Keys the runtime reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Escape
    Escape,
    /// Enter
    Enter,
    /// Space bar
    Space,
    /// Anything else
    Other,
}

impl Key {
    /// Map a DOM key name (`"Escape"`, `"Enter"`, `" "`)
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Self::Escape,
            "Enter" => Self::Enter,
            " " | "Space" | "Spacebar" => Self::Space,
            _ => Self::Other,
        }
    }
}

/// A page with its interaction controllers
#[derive(Debug, Clone)]
pub struct SiteRuntime {
    page: Page,
    roster: Roster,
    timings: Timings,
    overlay: OverlayController,
    menu: MenuController,
    anchors: AnchorNavigator,
    cards: Vec<(NodeId, String)>,
}

impl SiteRuntime {
    /// Bind the controllers to `page` and run their setup.
    ///
    /// # Errors
    ///
    /// Propagates selector errors from setup.
    pub fn new(page: Page, roster: Roster, timings: Timings) -> SiteResult<Self> {
        let mut runtime = Self {
            page,
            roster,
            timings,
            overlay: OverlayController::new(timings),
            menu: MenuController::new(timings),
            anchors: AnchorNavigator::new(timings.header_offset()),
            cards: Vec::new(),
        };
        runtime.menu.init(&mut runtime.page)?;
        runtime.bind_cards()?;
        Ok(runtime)
    }

    /// Mark every visible card as an interactive bio trigger
    fn bind_cards(&mut self) -> SiteResult<()> {
        for record in self.roster.records() {
            let containers = self
                .page
                .resolve_all_visible(&id_selector(&record.id))?;
            for container in containers {
                let Some(card) = self.page.document().query_selector_from(container, CARD_SELECTOR)?
                else {
                    continue;
                };
                if self.cards.iter().any(|(n, _)| *n == card) {
                    continue;
                }
                self.page.set_style(card, "cursor", "pointer");
                self.page.set_attribute(card, "role", "button");
                self.page.set_attribute(card, "tabindex", "0");
                self.cards.push((card, record.id.clone()));
            }
        }
        debug!(cards = self.cards.len(), "bio cards bound");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The page
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    /// The page, mutably
    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    /// Overlay controller
    #[must_use]
    pub const fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    /// Menu controller
    #[must_use]
    pub const fn menu(&self) -> &MenuController {
        &self.menu
    }

    /// Attorney table
    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Timings in use
    #[must_use]
    pub const fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Cards bound as bio triggers, with their attorney id
    #[must_use]
    pub fn cards(&self) -> &[(NodeId, String)] {
        &self.cards
    }

    fn card_attorney(&self, target: NodeId) -> Option<String> {
        let doc = self.page.document();
        std::iter::once(target)
            .chain(doc.ancestors(target))
            .find_map(|n| self.cards.iter().find(|(c, _)| *c == n))
            .map(|(_, id)| id.clone())
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Click `target`.
    ///
    /// Handlers run in bubbling order: in-menu links (which stop
    /// propagation), bio cards, overlay dismissal, the menu toggle, then the
    /// document-level anchor handler.
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn click(&mut self, target: NodeId) -> SiteResult<()> {
        trace!(%target, "click");
        if self.menu.handle_link_click(&mut self.page, target)? {
            return Ok(());
        }
        if let Some(id) = self.card_attorney(target) {
            self.overlay.open(&mut self.page, &self.roster, &id)?;
        }
        self.overlay.handle_click(&mut self.page, target)?;
        let on_toggle = self
            .page
            .document()
            .closest(target, &self.menu.selectors().toggle)?
            .is_some();
        if on_toggle {
            self.menu.toggle(&mut self.page)?;
        }
        self.anchors.handle_click(&mut self.page, &self.menu, target)?;
        Ok(())
    }

    /// Focus an element
    pub fn focus(&mut self, target: NodeId) {
        self.page.focus(target);
    }

    /// Press a key on the focused element (or the document)
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn press_key(&mut self, name: &str) -> SiteResult<()> {
        match Key::from_name(name) {
            Key::Escape => {
                if self.page.key_listeners().contains(&KeyListener::OverlayEscape) {
                    self.overlay.close(&mut self.page);
                    self.menu.close(&mut self.page)?;
                }
            }
            Key::Enter | Key::Space => {
                let card = self.page.focused().and_then(|f| self.card_attorney(f));
                if let Some(id) = card {
                    self.overlay.open(&mut self.page, &self.roster, &id)?;
                }
            }
            Key::Other => {}
        }
        Ok(())
    }

    /// Change the viewport; cards that became visible get bound
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn resize(&mut self, viewport: Viewport) -> SiteResult<()> {
        self.page.resize(viewport);
        self.bind_cards()
    }

    /// Open the bio of `attorney_id` directly
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn open_bio(&mut self, attorney_id: &str) -> SiteResult<bool> {
        self.overlay.open(&mut self.page, &self.roster, attorney_id)
    }

    /// Close the current bio
    pub fn close_bio(&mut self) -> bool {
        self.overlay.close(&mut self.page)
    }

    /// Toggle the mobile menu
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn toggle_menu(&mut self) -> SiteResult<()> {
        self.menu.toggle(&mut self.page)
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// Advance virtual time by `ms`, delivering everything that comes due
    pub fn advance(&mut self, ms: u64) {
        let until = self.page.now() + ms;
        self.run_until(until);
    }

    fn run_until(&mut self, until: u64) {
        while let Some(event) = self.page.next_event(until) {
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: PageEvent) {
        match event {
            PageEvent::Task(task) => {
                self.overlay.handle_task(&mut self.page, task);
                self.menu.handle_task(&mut self.page, task);
            }
            PageEvent::TransitionEnd { node, property } => {
                self.overlay.handle_transition_end(&mut self.page, node);
                self.menu
                    .handle_transition_end(&mut self.page, node, &property);
            }
        }
    }

    /// Jump running animations to their end and deliver the resulting events
    pub fn settle_animations(&mut self) {
        self.page.finish_animations();
        let now = self.page.now();
        self.run_until(now);
    }

    /// PNG screenshot of the viewport once animations have settled
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn screenshot(&mut self) -> SiteResult<Vec<u8>> {
        self.settle_animations();
        raster::screenshot(&self.page)
    }
}
