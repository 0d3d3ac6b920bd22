//! Viewport and scroll state.

use crate::animation::Easing;
use crate::breakpoint::{Breakpoint, Viewport};

/// Default smooth-scroll duration in milliseconds
pub const DEFAULT_SMOOTH_SCROLL_MS: u64 = 400;

/// Scroll behaviour, as in `window.scrollTo({ behavior })`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Animate over the smooth-scroll duration
    Smooth,
    /// Jump immediately
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SmoothScroll {
    from: f64,
    to: f64,
    start_ms: u64,
    duration_ms: u64,
}

/// Browser window: viewport size and vertical scroll position
#[derive(Debug, Clone)]
pub struct Window {
    viewport: Viewport,
    scroll_y: f64,
    smooth: Option<SmoothScroll>,
    smooth_duration_ms: u64,
}

impl Window {
    /// Create a window scrolled to the top
    #[must_use]
    pub const fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            scroll_y: 0.0,
            smooth: None,
            smooth_duration_ms: DEFAULT_SMOOTH_SCROLL_MS,
        }
    }

    /// Set the smooth-scroll duration
    #[must_use]
    pub const fn with_smooth_duration(mut self, ms: u64) -> Self {
        self.smooth_duration_ms = ms;
        self
    }

    /// Current viewport
    #[must_use]
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Viewport width as f64
    #[must_use]
    pub fn inner_width(&self) -> f64 {
        f64::from(self.viewport.width)
    }

    /// Breakpoint for the current width
    #[must_use]
    pub const fn breakpoint(&self) -> Breakpoint {
        self.viewport.breakpoint()
    }

    /// Resize; the caller re-clamps after relayout
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Current scroll offset
    #[must_use]
    pub const fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    /// Largest valid scroll offset for a document of `document_height`
    #[must_use]
    pub fn max_scroll(&self, document_height: f64) -> f64 {
        (document_height - f64::from(self.viewport.height)).max(0.0)
    }

    /// Whether a smooth scroll is in flight
    #[must_use]
    pub const fn is_scrolling(&self) -> bool {
        self.smooth.is_some()
    }

    /// Start a scroll to `top`. A new request replaces one in flight.
    pub fn scroll_to(&mut self, top: f64, behavior: Behavior, now_ms: u64, document_height: f64) {
        let target = top.clamp(0.0, self.max_scroll(document_height));
        match behavior {
            Behavior::Instant => {
                self.smooth = None;
                self.scroll_y = target;
            }
            Behavior::Smooth => {
                if (target - self.scroll_y).abs() < f64::EPSILON || self.smooth_duration_ms == 0 {
                    self.smooth = None;
                    self.scroll_y = target;
                    return;
                }
                self.smooth = Some(SmoothScroll {
                    from: self.scroll_y,
                    to: target,
                    start_ms: now_ms,
                    duration_ms: self.smooth_duration_ms,
                });
            }
        }
    }

    /// Advance a smooth scroll to `now_ms`; returns whether it is still running
    pub fn tick(&mut self, now_ms: u64) -> bool {
        let Some(s) = self.smooth else {
            return false;
        };
        let elapsed = now_ms.saturating_sub(s.start_ms);
        if elapsed >= s.duration_ms {
            self.scroll_y = s.to;
            self.smooth = None;
            return false;
        }
        let t = elapsed as f64 / s.duration_ms as f64;
        self.scroll_y = s.from + (s.to - s.from) * Easing::EaseInOut.evaluate(t);
        true
    }

    /// Jump any smooth scroll to its end
    pub fn finish(&mut self) {
        if let Some(s) = self.smooth.take() {
            self.scroll_y = s.to;
        }
    }

    /// Keep the offset valid after the document changed height
    pub fn clamp(&mut self, document_height: f64) {
        let max = self.max_scroll(document_height);
        self.scroll_y = self.scroll_y.clamp(0.0, max);
        if let Some(s) = &mut self.smooth {
            s.to = s.to.clamp(0.0, max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_scroll_clamps() {
        let mut w = Window::new(Viewport::new(390, 844));
        w.scroll_to(10_000.0, Behavior::Instant, 0, 3000.0);
        assert!((w.scroll_y() - 2156.0).abs() < f64::EPSILON);
        w.scroll_to(-5.0, Behavior::Instant, 0, 3000.0);
        assert!(w.scroll_y().abs() < f64::EPSILON);
    }

    #[test]
    fn test_smooth_scroll_progresses_and_ends() {
        let mut w = Window::new(Viewport::new(390, 844)).with_smooth_duration(400);
        w.scroll_to(1000.0, Behavior::Smooth, 0, 5000.0);
        assert!(w.is_scrolling());
        assert!(w.tick(200));
        let mid = w.scroll_y();
        assert!(mid > 0.0 && mid < 1000.0);
        assert!(!w.tick(400));
        assert!((w.scroll_y() - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_new_request_replaces_in_flight() {
        let mut w = Window::new(Viewport::new(390, 844));
        w.scroll_to(1000.0, Behavior::Smooth, 0, 5000.0);
        w.tick(100);
        w.scroll_to(200.0, Behavior::Smooth, 100, 5000.0);
        w.finish();
        assert!((w.scroll_y() - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut w = Window::new(Viewport::new(1400, 900));
        w.scroll_to(2000.0, Behavior::Instant, 0, 4000.0);
        w.clamp(1500.0);
        assert!((w.scroll_y() - 600.0).abs() < f64::EPSILON);
    }
}
