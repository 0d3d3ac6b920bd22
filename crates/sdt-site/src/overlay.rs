//! Bio overlay controller.
//!
//! ```text
//! closed ──open──▶ opening ──2nd frame──▶ open ──close──▶ closing ──end/fallback──▶ closed
//! ```
//!
//! At most one instance is current. Opening while another is open closes it
//! and finalises it on the spot; opening while one is still closing
//! finalises that one too (last writer wins). Deferred work carries the
//! instance generation and is dropped when the generation moved on.

use crate::attorney::Roster;
use crate::breakpoint::Breakpoint;
use crate::config::Timings;
use crate::dom::NodeId;
use crate::page::{KeyListener, ListenerId, Page};
use crate::resolver::VisibilityResolver;
use crate::result::SiteResult;
use crate::scheduler::{Task, TimerId};
use crate::view::{
    overlay_selector, BioViewModel, ANIMATE_IN_CLASS, BACKDROP_SELECTOR, CLOSE_BUTTON_SELECTOR,
    CLOSING_CLASS, DIALOG_SELECTOR, VISIBLE_CLASS,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Card top used when no card is visible
pub const FALLBACK_CARD_TOP: f64 = 2000.0;

/// Z-index of an open overlay
pub const OVERLAY_Z_INDEX: i32 = 100;

/// Inline properties set on open and cleared on finalise
const PLACEMENT_PROPERTIES: [&str; 5] = ["position", "top", "left", "width", "z-index"];

/// Overlay lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayState {
    /// Nothing shown
    Closed,
    /// Visible, enter animation pending
    Opening,
    /// Visible, enter animation started
    Open,
    /// Exit animation running
    Closing,
}

/// Computed overlay box (page coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    /// Page top
    pub top: f64,
    /// Left edge
    pub left: f64,
    /// Fixed width
    pub width: f64,
}

impl Placement {
    /// Centre horizontally and sit `offset` above the first card row
    #[must_use]
    pub fn compute(breakpoint: Breakpoint, viewport_width: f64, card_top: Option<f64>) -> Self {
        let width = breakpoint.overlay_width();
        Self {
            top: card_top.unwrap_or(FALLBACK_CARD_TOP) - breakpoint.overlay_offset(),
            left: (viewport_width - width) / 2.0,
            width,
        }
    }
}

/// One shown (or closing) overlay
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayInstance {
    /// Attorney export id
    pub attorney_id: String,
    /// Overlay root element
    pub root: NodeId,
    /// Dialog element, if the markup has one
    pub dialog: Option<NodeId>,
    /// Lifecycle state
    pub state: OverlayState,
    /// Box applied on open
    pub placement: Placement,
    /// Breakpoint at open time
    pub breakpoint: Breakpoint,
    /// Generation for stale-callback checks
    pub generation: u64,
    injected: bool,
}

/// Owns the bio overlay lifecycle for one page
#[derive(Debug, Clone)]
pub struct OverlayController {
    timings: Timings,
    current: Option<OverlayInstance>,
    closing: Option<OverlayInstance>,
    fallback: Option<TimerId>,
    escape: Option<ListenerId>,
    generation: u64,
}

impl OverlayController {
    /// Create a closed controller
    #[must_use]
    pub const fn new(timings: Timings) -> Self {
        Self {
            timings,
            current: None,
            closing: None,
            fallback: None,
            escape: None,
            generation: 0,
        }
    }

    /// Overall state: the current instance's, else closing, else closed
    #[must_use]
    pub fn state(&self) -> OverlayState {
        match (&self.current, &self.closing) {
            (Some(i), _) => i.state,
            (None, Some(_)) => OverlayState::Closing,
            (None, None) => OverlayState::Closed,
        }
    }

    /// Instance that is opening or open
    #[must_use]
    pub const fn current(&self) -> Option<&OverlayInstance> {
        self.current.as_ref()
    }

    /// Instance still running its exit
    #[must_use]
    pub const fn closing(&self) -> Option<&OverlayInstance> {
        self.closing.as_ref()
    }

    /// Whether the Escape listener is installed
    #[must_use]
    pub const fn escape_installed(&self) -> bool {
        self.escape.is_some()
    }

    /// Show the bio of `attorney_id`.
    ///
    /// Returns `Ok(false)` for an unknown attorney or when no overlay could be
    /// found or built.
    ///
    /// # Errors
    ///
    /// Propagates selector errors from the document.
    pub fn open(&mut self, page: &mut Page, roster: &Roster, attorney_id: &str) -> SiteResult<bool> {
        let Some(record) = roster.get(attorney_id) else {
            warn!(attorney = attorney_id, "open ignored: unknown attorney");
            return Ok(false);
        };

        if self.current.is_some() {
            self.close(page);
        }
        if self.closing.is_some() {
            self.finalize(page);
        }

        let breakpoint = page.breakpoint();
        let selector = overlay_selector(breakpoint, &record.id);
        let (root, injected) = match page.document().query_selector(&selector)? {
            Some(root) => (root, false),
            None => {
                let Some(body) = page.document().body() else {
                    warn!(attorney = %record.id, %breakpoint, "open ignored: no body to inject into");
                    return Ok(false);
                };
                let view = BioViewModel::new(record, breakpoint);
                let root = page.mutate(|doc| {
                    let node = view.render().instantiate(doc);
                    doc.append_child(body, node);
                    node
                });
                debug!(attorney = %record.id, %breakpoint, "overlay injected");
                (root, true)
            }
        };

        let card = page.resolve_visible(&roster.card_container_selector())?;
        let placement = Placement::compute(
            breakpoint,
            page.window().inner_width(),
            card.map(|c| page.page_top(c)),
        );
        if card.is_none() {
            debug!(fallback = FALLBACK_CARD_TOP, "no visible card, using fallback top");
        }

        page.set_style(root, "position", "absolute");
        page.set_style(root, "top", &format!("{}px", placement.top));
        page.set_style(root, "left", &format!("{}px", placement.left));
        page.set_style(root, "width", &format!("{}px", placement.width));
        page.set_style(root, "z-index", &OVERLAY_Z_INDEX.to_string());
        page.remove_class(root, CLOSING_CLASS);
        page.remove_attribute(root, "hidden");
        page.add_class(root, VISIBLE_CLASS);

        let dialog = page.document().query_selector_from(root, DIALOG_SELECTOR)?;
        self.generation += 1;
        let generation = self.generation;
        page.request_frame(Task::OverlayResetEnter { generation });

        if self.escape.is_none() {
            self.escape = Some(page.add_key_listener(KeyListener::OverlayEscape));
        }

        info!(
            attorney = %record.id,
            %breakpoint,
            top = placement.top,
            left = placement.left,
            width = placement.width,
            generation,
            "bio overlay opening"
        );

        self.current = Some(OverlayInstance {
            attorney_id: record.id.clone(),
            root,
            dialog,
            state: OverlayState::Opening,
            placement,
            breakpoint,
            generation,
            injected,
        });
        Ok(true)
    }

    /// Start the exit of the current overlay. No-op when nothing is open.
    ///
    /// Returns whether an overlay started closing.
    pub fn close(&mut self, page: &mut Page) -> bool {
        let Some(mut instance) = self.current.take() else {
            return false;
        };
        if self.closing.is_some() {
            self.finalize(page);
        }

        if let Some(dialog) = instance.dialog {
            page.remove_class(dialog, ANIMATE_IN_CLASS);
        }
        page.remove_class(instance.root, VISIBLE_CLASS);
        page.add_class(instance.root, CLOSING_CLASS);
        instance.state = OverlayState::Closing;

        self.fallback = Some(page.set_timeout(
            self.timings.overlay_close_ms,
            Task::OverlayFinalize {
                generation: instance.generation,
            },
        ));
        if let Some(id) = self.escape.take() {
            page.remove_key_listener(id);
        }

        info!(attorney = %instance.attorney_id, generation = instance.generation, "bio overlay closing");
        self.closing = Some(instance);
        true
    }

    /// Force the closing instance to its closed visual state
    fn finalize(&mut self, page: &mut Page) {
        let Some(mut instance) = self.closing.take() else {
            return;
        };
        if let Some(timer) = self.fallback.take() {
            page.clear_timeout(timer);
        }

        page.set_attribute(instance.root, "hidden", "");
        page.remove_class(instance.root, CLOSING_CLASS);
        for property in PLACEMENT_PROPERTIES {
            page.remove_style(instance.root, property);
        }
        if instance.injected {
            page.remove(instance.root);
        }
        instance.state = OverlayState::Closed;
        debug!(attorney = %instance.attorney_id, generation = instance.generation, "bio overlay closed");
    }

    /// Handle a scheduled overlay task; stale generations are ignored.
    pub fn handle_task(&mut self, page: &mut Page, task: Task) {
        match task {
            Task::OverlayResetEnter { generation } => {
                let Some(instance) = self.current.as_mut().filter(|i| i.generation == generation)
                else {
                    return;
                };
                if let Some(dialog) = instance.dialog {
                    page.remove_class(dialog, ANIMATE_IN_CLASS);
                    page.force_layout();
                    page.request_frame(Task::OverlayEnter { generation });
                } else {
                    warn!(attorney = %instance.attorney_id, "no dialog element for enter animation");
                    instance.state = OverlayState::Open;
                }
            }
            Task::OverlayEnter { generation } => {
                let Some(instance) = self.current.as_mut().filter(|i| i.generation == generation)
                else {
                    return;
                };
                if let Some(dialog) = instance.dialog {
                    page.add_class(dialog, ANIMATE_IN_CLASS);
                }
                instance.state = OverlayState::Open;
                debug!(attorney = %instance.attorney_id, "enter animation started");
            }
            Task::OverlayFinalize { generation } => {
                if self
                    .closing
                    .as_ref()
                    .is_some_and(|i| i.generation == generation)
                {
                    self.fallback = None;
                    self.finalize(page);
                }
            }
            _ => {}
        }
    }

    /// A transition ended on `node`; finalises the closing instance when it
    /// is that instance's dialog.
    pub fn handle_transition_end(&mut self, page: &mut Page, node: NodeId) {
        let is_closing_dialog = self
            .closing
            .as_ref()
            .is_some_and(|i| i.dialog == Some(node));
        if is_closing_dialog {
            self.finalize(page);
        }
    }

    /// Route a click inside the current overlay. Returns whether it closed it.
    ///
    /// Clicks inside links are left alone. Close buttons and the backdrop
    /// close; so does a click on the overlay root or one of its direct
    /// children.
    ///
    /// # Errors
    ///
    /// Propagates selector errors from the document.
    pub fn handle_click(&mut self, page: &mut Page, target: NodeId) -> SiteResult<bool> {
        let Some(root) = self.current.as_ref().map(|i| i.root) else {
            return Ok(false);
        };
        let doc = page.document();
        let inside = target == root || doc.ancestors(target).any(|a| a == root);
        if !inside {
            return Ok(false);
        }
        if doc.closest(target, "a")?.is_some() {
            return Ok(false);
        }
        let on_control = doc.closest(target, CLOSE_BUTTON_SELECTOR)?.is_some()
            || doc.closest(target, BACKDROP_SELECTOR)?.is_some();
        let outside_content = target == root || doc.parent(target) == Some(root);
        if on_control || outside_content {
            debug!(%target, "overlay dismissed by click");
            return Ok(self.close(page));
        }
        Ok(false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::breakpoint::DeviceProfile;
    use crate::dom::Document;
    use crate::page::PageEvent;
    use crate::template::ElementTemplate;
    use proptest::prelude::*;

    fn setup(profile: DeviceProfile) -> (Page, Roster) {
        let mut doc = Document::new();
        let card = |id: &str| {
            ElementTemplate::new("div")
                .attr("id", id)
                .style("height", "400px")
                .child(ElementTemplate::new("div").class("sdt-team__card").style("height", "400px"))
        };
        let body = ElementTemplate::new("body")
            .child(ElementTemplate::new("section").attr("id", "hero").style("height", "1000px"))
            .child(card("1kq6r0t"))
            .child(card("a2aut"))
            .child(card("1175ksh"))
            .instantiate(&mut doc);
        doc.append_child(doc.root(), body);
        (Page::new(doc, profile, "/"), Roster::builtin().unwrap())
    }

    fn run(page: &mut Page, ctl: &mut OverlayController, ms: u64) {
        let until = page.now() + ms;
        while let Some(event) = page.next_event(until) {
            match event {
                PageEvent::Task(t) => ctl.handle_task(page, t),
                PageEvent::TransitionEnd { node, .. } => ctl.handle_transition_end(page, node),
            }
        }
    }

    #[test]
    fn test_open_positions_and_animates() {
        let (mut page, roster) = setup(DeviceProfile::phone());
        let mut ctl = OverlayController::new(Timings::default());
        assert!(ctl.open(&mut page, &roster, "1kq6r0t").unwrap());

        let inst = ctl.current().unwrap().clone();
        assert!(inst.injected);
        assert_eq!(inst.state, OverlayState::Opening);
        assert_eq!(inst.placement, Placement { top: 963.0, left: 5.0, width: 380.0 });
        let doc = page.document();
        assert!(doc.has_class(inst.root, VISIBLE_CLASS));
        assert!(!doc.has_attribute(inst.root, "hidden"));
        assert_eq!(doc.style(inst.root, "z-index"), Some("100"));
        assert!(ctl.escape_installed());

        run(&mut page, &mut ctl, 40);
        assert_eq!(ctl.state(), OverlayState::Open);
        assert!(page.document().has_class(inst.dialog.unwrap(), ANIMATE_IN_CLASS));
    }

    #[test]
    fn test_unknown_attorney_is_noop() {
        let (mut page, roster) = setup(DeviceProfile::desktop());
        let mut ctl = OverlayController::new(Timings::default());
        let nodes = page.document().node_count();
        assert!(!ctl.open(&mut page, &roster, "zzz").unwrap());
        assert_eq!(ctl.state(), OverlayState::Closed);
        assert_eq!(page.document().node_count(), nodes);
    }

    #[test]
    fn test_close_when_closed_changes_nothing() {
        let (mut page, _) = setup(DeviceProfile::tablet());
        let mut ctl = OverlayController::new(Timings::default());
        assert!(!ctl.close(&mut page));
        assert_eq!(ctl.state(), OverlayState::Closed);
        assert!(page.key_listeners().is_empty());
    }

    #[test]
    fn test_close_finalises_on_transition_end() {
        let (mut page, roster) = setup(DeviceProfile::desktop());
        let mut ctl = OverlayController::new(Timings::default());
        ctl.open(&mut page, &roster, "a2aut").unwrap();
        run(&mut page, &mut ctl, 400);
        let root = ctl.current().unwrap().root;

        assert!(ctl.close(&mut page));
        assert_eq!(ctl.state(), OverlayState::Closing);
        assert!(page.document().has_class(root, CLOSING_CLASS));
        assert!(!ctl.escape_installed());

        // dialog transition (300ms) beats the 500ms fallback
        run(&mut page, &mut ctl, 320);
        assert_eq!(ctl.state(), OverlayState::Closed);
        assert!(!page.document().is_attached(root));
        // fallback was cancelled; nothing left to fire
        run(&mut page, &mut ctl, 1000);
        assert_eq!(ctl.state(), OverlayState::Closed);
    }

    #[test]
    fn test_fallback_finalises_without_dialog_transition() {
        let (mut page, roster) = setup(DeviceProfile::desktop());
        let timings = Timings::default().with_overlay_close_ms(200);
        let mut ctl = OverlayController::new(timings);
        ctl.open(&mut page, &roster, "a2aut").unwrap();
        run(&mut page, &mut ctl, 400);
        ctl.close(&mut page);
        run(&mut page, &mut ctl, 210);
        assert_eq!(ctl.state(), OverlayState::Closed);
    }

    #[test]
    fn test_open_b_replaces_a() {
        let (mut page, roster) = setup(DeviceProfile::phone());
        let mut ctl = OverlayController::new(Timings::default());
        ctl.open(&mut page, &roster, "1kq6r0t").unwrap();
        let a = ctl.current().unwrap().root;
        ctl.open(&mut page, &roster, "1175ksh").unwrap();
        run(&mut page, &mut ctl, 1000);

        assert_eq!(ctl.current().unwrap().attorney_id, "1175ksh");
        assert!(ctl.closing().is_none());
        assert!(!page.document().is_attached(a));
        let visible = page.document().query_selector_all(".bio-portal--visible").unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(page.key_listeners().len(), 1);
    }

    #[test]
    fn test_open_during_closing_finalises_immediately() {
        let (mut page, roster) = setup(DeviceProfile::phone());
        let mut ctl = OverlayController::new(Timings::default());
        ctl.open(&mut page, &roster, "1kq6r0t").unwrap();
        run(&mut page, &mut ctl, 100);
        ctl.close(&mut page);
        run(&mut page, &mut ctl, 50);
        ctl.open(&mut page, &roster, "a2aut").unwrap();
        assert!(ctl.closing().is_none());
        run(&mut page, &mut ctl, 1000);
        assert_eq!(ctl.state(), OverlayState::Open);
    }

    #[test]
    fn test_click_routing() {
        let (mut page, roster) = setup(DeviceProfile::phone());
        let mut ctl = OverlayController::new(Timings::default());
        ctl.open(&mut page, &roster, "1kq6r0t").unwrap();
        let root = ctl.current().unwrap().root;
        let doc = page.document();
        let link = doc.query_selector_from(root, "a").unwrap().unwrap();
        let para = doc.query_selector_from(root, ".bio-panel__body p").unwrap().unwrap();
        let close = doc.query_selector_from(root, ".sdt-bio-close").unwrap().unwrap();

        assert!(!ctl.handle_click(&mut page, link).unwrap());
        assert!(!ctl.handle_click(&mut page, para).unwrap());
        assert!(ctl.handle_click(&mut page, close).unwrap());
        assert_eq!(ctl.state(), OverlayState::Closing);
    }

    #[test]
    fn test_click_on_root_or_direct_child_closes() {
        let (mut page, roster) = setup(DeviceProfile::desktop());
        let mut ctl = OverlayController::new(Timings::default());
        ctl.open(&mut page, &roster, "1kq6r0t").unwrap();
        let root = ctl.current().unwrap().root;
        assert!(ctl.handle_click(&mut page, root).unwrap());

        ctl.open(&mut page, &roster, "1kq6r0t").unwrap();
        let backdrop = page
            .document()
            .query_selector(BACKDROP_SELECTOR)
            .unwrap()
            .unwrap();
        assert!(ctl.handle_click(&mut page, backdrop).unwrap());
    }

    #[test]
    fn test_fallback_card_top() {
        let p = Placement::compute(Breakpoint::Desktop, 1400.0, None);
        assert_eq!(p, Placement { top: 1709.0, left: 100.0, width: 1200.0 });
    }

    proptest! {
        #[test]
        fn prop_placement_is_centred(width in 300u32..2600, card_top in 0.0f64..10_000.0) {
            let bp = Breakpoint::from_width(width);
            let w = f64::from(width);
            let p = Placement::compute(bp, w, Some(card_top));
            prop_assert!((p.left * 2.0 + p.width - w).abs() < 1e-9);
            prop_assert!((card_top - p.top - bp.overlay_offset()).abs() < 1e-9);
        }
    }
}
