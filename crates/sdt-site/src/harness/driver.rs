//! Page drivers: what the harness needs from a browser tab.
//!
//! ```text
//! ┌──────────────────────── PageDriver ────────────────────────┐
//! │                                                             │
//! │  ┌──────────────────────┐      ┌─────────────────────────┐  │
//! │  │  SimulatedDriver     │      │  CdpDriver (browser)    │  │
//! │  │  in-process fixtures │      │  chromiumoxide over CDP │  │
//! │  │  virtual clock       │      │  wall clock             │  │
//! │  └──────────────────────┘      └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Elements are addressed Playwright-style: a selector plus the index of the
//! match (`locator(selector).nth(index)`).

use crate::breakpoint::DeviceProfile;
use crate::config::Timings;
use crate::dom::NodeId;
use crate::fixture;
use crate::layout::Rect;
use crate::result::{SiteError, SiteResult};
use crate::runtime::SiteRuntime;
use crate::window::Behavior;
use async_trait::async_trait;
use tracing::debug;

/// Browser-tab operations used by the harness
#[async_trait]
pub trait PageDriver: Send {
    /// Load `url` (absolute, or a path on the configured base URL)
    async fn navigate(&mut self, url: &str) -> SiteResult<()>;

    /// Wait until no request has been in flight for the idle threshold
    async fn wait_for_network_idle(&mut self, timeout_ms: u64) -> SiteResult<()>;

    /// Wait for web fonts
    async fn wait_for_fonts(&mut self) -> SiteResult<()>;

    /// Let `ms` of page time pass
    async fn sleep(&mut self, ms: u64) -> SiteResult<()>;

    /// Wait for the next animation frame
    async fn next_frame(&mut self) -> SiteResult<()>;

    /// Page clock in milliseconds
    async fn now_ms(&mut self) -> SiteResult<u64>;

    /// Number of elements matching `selector`
    async fn count(&mut self, selector: &str) -> SiteResult<usize>;

    /// Viewport-relative box of match `index`; `None` when there is no such
    /// match
    async fn bounding_box(&mut self, selector: &str, index: usize) -> SiteResult<Option<Rect>>;

    /// Click the centre of match `index`
    async fn click(&mut self, selector: &str, index: usize) -> SiteResult<()>;

    /// Scroll match `index` to the viewport top unless it is fully visible
    async fn scroll_into_view_if_needed(&mut self, selector: &str, index: usize) -> SiteResult<()>;

    /// Jump the window to `top`
    async fn scroll_to(&mut self, top: f64) -> SiteResult<()>;

    /// `window.scrollY`
    async fn scroll_y(&mut self) -> SiteResult<f64>;

    /// Total scrollable height
    async fn document_height(&mut self) -> SiteResult<f64>;

    /// Press a key (`"Escape"`, `"Enter"`, ...)
    async fn press_key(&mut self, key: &str) -> SiteResult<()>;

    /// Whether the first match of `selector` carries `class`
    async fn has_class(&mut self, selector: &str, class: &str) -> SiteResult<bool>;

    /// PNG of the viewport with animations stopped
    async fn screenshot(&mut self) -> SiteResult<Vec<u8>>;

    /// Release the tab
    async fn close(&mut self) -> SiteResult<()>;
}

/// Driver over the in-process site fixtures
#[derive(Debug)]
pub struct SimulatedDriver {
    profile: DeviceProfile,
    timings: Timings,
    runtime: Option<SiteRuntime>,
    history: Vec<String>,
}

impl SimulatedDriver {
    /// Driver emulating `profile`
    #[must_use]
    pub fn new(profile: DeviceProfile) -> Self {
        Self::with_timings(profile, Timings::default())
    }

    /// Driver with custom interaction timings
    #[must_use]
    pub const fn with_timings(profile: DeviceProfile, timings: Timings) -> Self {
        Self {
            profile,
            timings,
            runtime: None,
            history: Vec::new(),
        }
    }

    /// Emulated device
    #[must_use]
    pub const fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Runtime of the loaded page
    #[must_use]
    pub const fn runtime(&self) -> Option<&SiteRuntime> {
        self.runtime.as_ref()
    }

    /// Calls made so far, `method:arg` style
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Whether `method` was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.history.iter().any(|c| c.starts_with(method))
    }

    fn loaded(&mut self) -> SiteResult<&mut SiteRuntime> {
        self.runtime
            .as_mut()
            .ok_or_else(|| SiteError::driver("no page loaded"))
    }

    fn nth(&mut self, selector: &str, index: usize) -> SiteResult<NodeId> {
        let runtime = self.loaded()?;
        runtime
            .page()
            .document()
            .query_selector_all(selector)?
            .get(index)
            .copied()
            .ok_or_else(|| SiteError::ElementNotFound {
                selector: selector.to_string(),
                index,
            })
    }

    fn advance_to(&mut self, at: u64) -> SiteResult<()> {
        let runtime = self.loaded()?;
        let now = runtime.page().now();
        if at > now {
            runtime.advance(at - now);
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for SimulatedDriver {
    async fn navigate(&mut self, url: &str) -> SiteResult<()> {
        self.history.push(format!("navigate:{url}"));
        let runtime = fixture::load_url(url, self.profile.clone(), self.timings)?;
        debug!(url, profile = %self.profile.name, "simulated page loaded");
        self.runtime = Some(runtime);
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, _timeout_ms: u64) -> SiteResult<()> {
        self.history.push("wait_for_network_idle".to_string());
        let at = self.loaded()?.page().network_idle_at();
        self.advance_to(at)
    }

    async fn wait_for_fonts(&mut self) -> SiteResult<()> {
        self.history.push("wait_for_fonts".to_string());
        let at = self.loaded()?.page().fonts_ready_at();
        self.advance_to(at)
    }

    async fn sleep(&mut self, ms: u64) -> SiteResult<()> {
        self.history.push(format!("sleep:{ms}"));
        self.loaded()?.advance(ms);
        Ok(())
    }

    async fn next_frame(&mut self) -> SiteResult<()> {
        let interval = self.timings.frame_interval_ms.max(1);
        let runtime = self.loaded()?;
        let now = runtime.page().now();
        let next = (now / interval + 1) * interval;
        runtime.advance(next - now);
        Ok(())
    }

    async fn now_ms(&mut self) -> SiteResult<u64> {
        Ok(self.loaded()?.page().now())
    }

    async fn count(&mut self, selector: &str) -> SiteResult<usize> {
        Ok(self
            .loaded()?
            .page()
            .document()
            .query_selector_all(selector)?
            .len())
    }

    async fn bounding_box(&mut self, selector: &str, index: usize) -> SiteResult<Option<Rect>> {
        let runtime = self.loaded()?;
        let page = runtime.page();
        Ok(page
            .document()
            .query_selector_all(selector)?
            .get(index)
            .map(|&n| page.client_rect(n)))
    }

    async fn click(&mut self, selector: &str, index: usize) -> SiteResult<()> {
        self.history.push(format!("click:{selector}[{index}]"));
        let node = self.nth(selector, index)?;
        self.loaded()?.click(node)
    }

    async fn scroll_into_view_if_needed(&mut self, selector: &str, index: usize) -> SiteResult<()> {
        self.history.push(format!("scroll_into_view:{selector}[{index}]"));
        let node = self.nth(selector, index)?;
        let page = self.loaded()?.page_mut();
        let rect = page.client_rect(node);
        let height = f64::from(page.viewport().height);
        if rect.y < 0.0 || rect.bottom() > height {
            page.scroll_into_view(node, Behavior::Instant);
        }
        Ok(())
    }

    async fn scroll_to(&mut self, top: f64) -> SiteResult<()> {
        self.history.push(format!("scroll_to:{top}"));
        self.loaded()?.page_mut().scroll_to(top, Behavior::Instant);
        Ok(())
    }

    async fn scroll_y(&mut self) -> SiteResult<f64> {
        Ok(self.loaded()?.page().scroll_y())
    }

    async fn document_height(&mut self) -> SiteResult<f64> {
        Ok(self.loaded()?.page().layout().document_height())
    }

    async fn press_key(&mut self, key: &str) -> SiteResult<()> {
        self.history.push(format!("press_key:{key}"));
        self.loaded()?.press_key(key)
    }

    async fn has_class(&mut self, selector: &str, class: &str) -> SiteResult<bool> {
        let runtime = self.loaded()?;
        let doc = runtime.page().document();
        Ok(doc
            .query_selector(selector)?
            .is_some_and(|n| doc.has_class(n, class)))
    }

    async fn screenshot(&mut self) -> SiteResult<Vec<u8>> {
        self.history.push("screenshot".to_string());
        self.loaded()?.screenshot()
    }

    async fn close(&mut self) -> SiteResult<()> {
        self.history.push("close".to_string());
        self.runtime = None;
        Ok(())
    }
}
