//! Simulated browser page.
//!
//! Owns the document, its layout, the window and the event loop. Layout is
//! recomputed after every mutation made through the page, so bounding boxes
//! read by the controllers are never stale.
//!
//! Two kinds of CSS transitions are modelled:
//!
//! - a `set_style` on a property listed in the element's inline `transition`
//!   animates numeric px values frame by frame and ends with a
//!   [`PageEvent::TransitionEnd`] for that property;
//! - adding or removing a class on an element with an inline
//!   `transition-duration` emits a transition-end after that duration, for the
//!   property named by `transition-property` (default `opacity`).

use crate::animation::{parse_duration_ms, Easing, TransitionSpec};
use crate::breakpoint::{Breakpoint, DeviceProfile, Viewport};
use crate::config::Timings;
use crate::dom::{Document, NodeId};
use crate::layout::{length, Layout, Rect};
use crate::scheduler::{Due, Scheduler, Task, TimerId};
use crate::window::{Behavior, Window};
use std::collections::VecDeque;
use tracing::trace;

/// Quiet period after load before the network counts as idle
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

/// Time after load at which web fonts report ready
pub const FONT_LOAD_MS: u64 = 120;

/// Something the page hands back to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// A scheduled controller task came due
    Task(Task),
    /// A transition on `node` finished
    TransitionEnd {
        /// Element whose transition ended
        node: NodeId,
        /// Transitioned property
        property: String,
    },
}

/// Document-level key listeners the controllers install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyListener {
    /// Escape closes the bio overlay and the mobile menu
    OverlayEscape,
}

/// Handle for removing a key listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Task(Task),
    AnimationTick,
}

#[derive(Debug, Clone)]
struct Transition {
    node: NodeId,
    property: String,
    /// Numeric endpoints; `None` for class-driven transitions
    values: Option<(f64, f64)>,
    start_ms: u64,
    duration_ms: u64,
    easing: Easing,
}

/// In-process page standing in for a browser tab
#[derive(Debug, Clone)]
pub struct Page {
    doc: Document,
    profile: DeviceProfile,
    window: Window,
    scheduler: Scheduler<Job>,
    layout: Layout,
    transitions: Vec<Transition>,
    events: VecDeque<PageEvent>,
    listeners: Vec<(ListenerId, KeyListener)>,
    next_listener: u64,
    tick_pending: bool,
    url: String,
    loaded_at: u64,
    focused: Option<NodeId>,
}

impl Page {
    /// Create a page with default timings
    #[must_use]
    pub fn new(doc: Document, profile: DeviceProfile, url: &str) -> Self {
        Self::with_timings(doc, profile, url, &Timings::default())
    }

    /// Create a page whose frame cadence and smooth scroll follow `timings`
    #[must_use]
    pub fn with_timings(doc: Document, profile: DeviceProfile, url: &str, timings: &Timings) -> Self {
        let window = Window::new(profile.viewport).with_smooth_duration(timings.smooth_scroll_ms);
        let layout = Layout::compute(&doc, profile.viewport);
        Self {
            doc,
            profile,
            window,
            scheduler: Scheduler::new(timings.frame_interval_ms),
            layout,
            transitions: Vec::new(),
            events: VecDeque::new(),
            listeners: Vec::new(),
            next_listener: 0,
            tick_pending: false,
            url: url.to_string(),
            loaded_at: 0,
            focused: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Read-only document
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.doc
    }

    /// Current layout
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Window state
    #[must_use]
    pub const fn window(&self) -> &Window {
        &self.window
    }

    /// Emulated device
    #[must_use]
    pub const fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Current viewport
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.window.viewport()
    }

    /// Breakpoint for the current viewport
    #[must_use]
    pub const fn breakpoint(&self) -> Breakpoint {
        self.window.breakpoint()
    }

    /// Vertical scroll offset
    #[must_use]
    pub const fn scroll_y(&self) -> f64 {
        self.window.scroll_y()
    }

    /// Virtual time in milliseconds
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.scheduler.now()
    }

    /// Address the page was loaded from
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Time at which the network goes idle
    #[must_use]
    pub const fn network_idle_at(&self) -> u64 {
        self.loaded_at + NETWORK_IDLE_THRESHOLD_MS
    }

    /// Time at which fonts are ready
    #[must_use]
    pub const fn fonts_ready_at(&self) -> u64 {
        self.loaded_at + FONT_LOAD_MS
    }

    /// Whether anything is still animating
    #[must_use]
    pub fn is_animating(&self) -> bool {
        !self.transitions.is_empty() || self.window.is_scrolling()
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Viewport-relative bounding box
    #[must_use]
    pub fn client_rect(&self, node: NodeId) -> Rect {
        if !self.doc.is_attached(node) {
            return Rect::default();
        }
        self.layout.client_rect(node, self.window.scroll_y())
    }

    /// Bounding box top plus scroll offset
    #[must_use]
    pub fn page_top(&self, node: NodeId) -> f64 {
        self.client_rect(node).y + self.window.scroll_y()
    }

    /// Whether the element has a non-empty box
    #[must_use]
    pub fn is_rendered(&self, node: NodeId) -> bool {
        self.client_rect(node).is_rendered()
    }

    /// Flush pending style changes.
    ///
    /// Layout is already eager; this only marks the point for tracing.
    pub fn force_layout(&mut self) {
        trace!(now = self.now(), "forced layout");
        self.relayout();
    }

    fn relayout(&mut self) {
        self.layout = Layout::compute(&self.doc, self.window.viewport());
        self.window.clamp(self.layout.document_height());
        let doc = &self.doc;
        self.transitions.retain(|t| doc.is_attached(t.node));
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Run an arbitrary document mutation, then relayout
    pub fn mutate<R>(&mut self, f: impl FnOnce(&mut Document) -> R) -> R {
        let out = f(&mut self.doc);
        self.relayout();
        out
    }

    /// Append `child` under `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.mutate(|doc| doc.append_child(parent, child));
    }

    /// Detach `node`; its transitions are dropped
    pub fn remove(&mut self, node: NodeId) {
        self.mutate(|doc| doc.remove(node));
        if self.focused.is_some_and(|f| !self.doc.is_attached(f)) {
            self.focused = None;
        }
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.mutate(|doc| doc.set_attribute(node, name, value));
    }

    /// Remove an attribute
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.mutate(|doc| doc.remove_attribute(node, name));
    }

    /// Add a class, starting a class transition when configured
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.mutate(|doc| doc.add_class(node, class)) {
            self.start_class_transition(node);
        }
    }

    /// Remove a class, starting a class transition when configured
    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if self.mutate(|doc| doc.remove_class(node, class)) {
            self.start_class_transition(node);
        }
    }

    /// Set an inline style property, animating it when the element's
    /// `transition` covers the property and both values are lengths
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        let spec = self
            .doc
            .style(node, "transition")
            .map(TransitionSpec::parse_list)
            .and_then(|specs| specs.into_iter().find(|s| s.applies_to(property)))
            .filter(|s| s.duration_ms > 0);

        let from = self.doc.style(node, property).and_then(|v| length(Some(v), 0.0));
        let to = length(Some(value), 0.0);

        match (spec, from, to) {
            (Some(spec), Some(from), Some(to)) if self.doc.is_attached(node) => {
                self.transitions
                    .retain(|t| !(t.node == node && t.property == property));
                trace!(%node, property, from, to, ms = spec.duration_ms, "transition start");
                self.transitions.push(Transition {
                    node,
                    property: property.to_string(),
                    values: Some((from, to)),
                    start_ms: self.now(),
                    duration_ms: spec.duration_ms,
                    easing: spec.easing,
                });
                self.schedule_tick();
            }
            _ => self.mutate(|doc| doc.set_style(node, property, value)),
        }
    }

    /// Clear an inline style property
    pub fn remove_style(&mut self, node: NodeId, property: &str) {
        self.mutate(|doc| doc.remove_style(node, property));
    }

    fn start_class_transition(&mut self, node: NodeId) {
        let Some(duration_ms) = self
            .doc
            .style(node, "transition-duration")
            .and_then(parse_duration_ms)
        else {
            return;
        };
        if duration_ms == 0 || !self.doc.is_attached(node) {
            return;
        }
        let property = self
            .doc
            .style(node, "transition-property")
            .unwrap_or("opacity")
            .to_string();
        self.transitions
            .retain(|t| !(t.node == node && t.property == property));
        self.transitions.push(Transition {
            node,
            property,
            values: None,
            start_ms: self.now(),
            duration_ms,
            easing: Easing::Linear,
        });
        self.schedule_tick();
    }

    // =========================================================================
    // Scrolling and viewport
    // =========================================================================

    /// Scroll the window to `top`
    pub fn scroll_to(&mut self, top: f64, behavior: Behavior) {
        let now = self.now();
        self.window
            .scroll_to(top, behavior, now, self.layout.document_height());
        if self.window.is_scrolling() {
            self.schedule_tick();
        }
    }

    /// Scroll so the element's top meets the viewport top
    pub fn scroll_into_view(&mut self, node: NodeId, behavior: Behavior) {
        let top = self.page_top(node);
        self.scroll_to(top, behavior);
    }

    /// Change the viewport size
    pub fn resize(&mut self, viewport: Viewport) {
        self.window.resize(viewport);
        self.profile.viewport = viewport;
        self.relayout();
    }

    // =========================================================================
    // Focus and key listeners
    // =========================================================================

    /// Focus an element
    pub fn focus(&mut self, node: NodeId) {
        self.focused = Some(node);
    }

    /// Focused element, if any
    #[must_use]
    pub const fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Install a document key listener
    pub fn add_key_listener(&mut self, listener: KeyListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a key listener; returns whether it was installed
    pub fn remove_key_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        self.listeners.len() != before
    }

    /// Installed key listeners in installation order
    #[must_use]
    pub fn key_listeners(&self) -> Vec<KeyListener> {
        self.listeners.iter().map(|(_, l)| *l).collect()
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Run `task` after `delay_ms`
    pub fn set_timeout(&mut self, delay_ms: u64, task: Task) -> TimerId {
        self.scheduler.set_timeout(delay_ms, Job::Task(task))
    }

    /// Cancel a timer
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.scheduler.clear_timeout(id)
    }

    /// Run `task` on the next animation frame
    pub fn request_frame(&mut self, task: Task) {
        self.scheduler.request_frame(Job::Task(task));
    }

    fn schedule_tick(&mut self) {
        if !self.tick_pending {
            self.tick_pending = true;
            self.scheduler.request_frame(Job::AnimationTick);
        }
    }

    /// Next event due at or before `until`, advancing virtual time.
    ///
    /// Returns `None` once nothing is left before `until`; the clock then
    /// reads `until`.
    pub fn next_event(&mut self, until: u64) -> Option<PageEvent> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Some(event);
            }
            match self.scheduler.pop_due(until)? {
                Due::Timer(Job::Task(task)) => return Some(PageEvent::Task(task)),
                Due::Timer(Job::AnimationTick) => {
                    self.tick_pending = false;
                    self.animate(false);
                }
                Due::Frame(jobs) => {
                    if jobs.contains(&Job::AnimationTick) {
                        self.tick_pending = false;
                        self.animate(false);
                    }
                    let ends: Vec<PageEvent> = self.events.drain(..).collect();
                    for job in jobs {
                        if let Job::Task(task) = job {
                            self.events.push_back(PageEvent::Task(task));
                        }
                    }
                    self.events.extend(ends);
                }
            }
        }
    }

    /// Jump every running transition and smooth scroll to its end.
    ///
    /// Transition-end events are queued for the next [`Page::next_event`].
    pub fn finish_animations(&mut self) {
        self.animate(true);
    }

    fn animate(&mut self, finish: bool) {
        let now = self.now();
        if finish {
            self.window.finish();
        } else {
            self.window.tick(now);
        }

        let mut done = Vec::new();
        for t in &self.transitions {
            let elapsed = now.saturating_sub(t.start_ms);
            let complete = finish || elapsed >= t.duration_ms;
            if let Some((from, to)) = t.values {
                let value = if complete {
                    to
                } else {
                    let p = t.easing.evaluate(elapsed as f64 / t.duration_ms as f64);
                    from + (to - from) * p
                };
                self.doc.set_style(t.node, &t.property, &format!("{value}px"));
            }
            if complete {
                done.push((t.node, t.property.clone()));
            }
        }
        self.transitions
            .retain(|t| !done.iter().any(|(n, p)| *n == t.node && *p == t.property));
        self.relayout();

        for (node, property) in done {
            trace!(%node, property = %property, now, "transition end");
            self.events
                .push_back(PageEvent::TransitionEnd { node, property });
        }
        if self.is_animating() {
            self.schedule_tick();
        }
    }
}
