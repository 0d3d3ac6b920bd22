//! Interaction timings.
//!
//! Every fixed delay the controllers rely on is named here so a caller can
//! shorten or lengthen them without touching controller code.

use serde::{Deserialize, Serialize};

/// Delays and distances used by the controllers and the simulated page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Overlay close fallback when no transition-end arrives
    pub overlay_close_ms: u64,
    /// Time the menu panel keeps `menu-opening`
    pub menu_opening_ms: u64,
    /// Height collapse duration of the closing menu
    pub menu_collapse_ms: u64,
    /// Collapse node removal fallback
    pub menu_collapse_fallback_ms: u64,
    /// Delay between closing the menu and scrolling for an in-menu link
    pub link_scroll_delay_ms: u64,
    /// Fixed header height subtracted from scroll targets
    pub header_offset_px: u32,
    /// Animation frame interval
    pub frame_interval_ms: u64,
    /// Smooth scroll duration
    pub smooth_scroll_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            overlay_close_ms: 500,
            menu_opening_ms: 300,
            menu_collapse_ms: 300,
            menu_collapse_fallback_ms: 350,
            link_scroll_delay_ms: 50,
            header_offset_px: 60,
            frame_interval_ms: 16,
            smooth_scroll_ms: 400,
        }
    }
}

impl Timings {
    /// Set the overlay close fallback
    #[must_use]
    pub const fn with_overlay_close_ms(mut self, ms: u64) -> Self {
        self.overlay_close_ms = ms;
        self
    }

    /// Set the smooth scroll duration
    #[must_use]
    pub const fn with_smooth_scroll_ms(mut self, ms: u64) -> Self {
        self.smooth_scroll_ms = ms;
        self
    }

    /// Header offset as f64
    #[must_use]
    pub fn header_offset(&self) -> f64 {
        f64::from(self.header_offset_px)
    }

    /// `transition` value for the menu collapse node
    #[must_use]
    pub fn collapse_transition(&self) -> String {
        format!(
            "height {}ms cubic-bezier(0.4, 0, 0.2, 1)",
            self.menu_collapse_ms
        )
    }
}
