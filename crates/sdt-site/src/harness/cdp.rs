//! Chromium driver over the DevTools protocol.

use super::driver::PageDriver;
use crate::breakpoint::DeviceProfile;
use crate::layout::Rect;
use crate::result::{SiteError, SiteResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Stops CSS animations and transitions before a capture
const FREEZE_ANIMATIONS: &str = r"(() => {
    if (document.getElementById('__sdt_freeze')) return true;
    const s = document.createElement('style');
    s.id = '__sdt_freeze';
    s.textContent = '*, *::before, *::after { transition: none !important; animation: none !important; scroll-behavior: auto !important; }';
    document.head.appendChild(s);
    return true;
})()";

/// Resolves once the resource count has not changed for 500ms
const NETWORK_IDLE: &str = r"new Promise(resolve => {
    let last = -1;
    let since = performance.now();
    const tick = () => {
        const n = performance.getEntriesByType('resource').length;
        if (n !== last) { last = n; since = performance.now(); }
        if (performance.now() - since >= 500) { resolve(true); } else { setTimeout(tick, 50); }
    };
    tick();
})";

/// Options for launching Chromium
#[derive(Debug, Clone, Default)]
pub struct CdpOptions {
    /// Base URL relative paths resolve against
    pub base_url: String,
    /// Chromium executable; auto-detected when `None`
    pub chromium_path: Option<PathBuf>,
    /// Show the browser window
    pub headed: bool,
}

/// A Chromium tab emulating one device profile
#[derive(Debug)]
pub struct CdpDriver {
    browser: Browser,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
    base_url: String,
}

fn cdp_err(e: impl std::fmt::Display) -> SiteError {
    SiteError::driver(e.to_string())
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

impl CdpDriver {
    /// Launch Chromium and open a tab emulating `profile`.
    ///
    /// # Errors
    ///
    /// Returns an error if Chromium is missing or cannot be started.
    pub async fn launch(options: &CdpOptions, profile: &DeviceProfile) -> SiteResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(profile.viewport.width, profile.viewport.height)
            .no_sandbox();
        if options.headed {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chromium_path {
            if !path.exists() {
                return Err(SiteError::BrowserNotFound);
            }
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|message| SiteError::BrowserLaunch { message })?;

        let (browser, mut events) = Browser::launch(config).await.map_err(|e| {
            SiteError::BrowserLaunch {
                message: e.to_string(),
            }
        })?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(cdp_err)?;
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(profile.viewport.width))
            .height(i64::from(profile.viewport.height))
            .device_scale_factor(profile.device_scale_factor)
            .mobile(profile.is_mobile)
            .build()
            .map_err(cdp_err)?;
        page.execute(metrics).await.map_err(cdp_err)?;
        if profile.has_touch {
            page.execute(SetTouchEmulationEnabledParams::new(true))
                .await
                .map_err(cdp_err)?;
        }
        debug!(profile = %profile.name, "chromium tab ready");

        Ok(Self {
            browser,
            page,
            handler,
            base_url: options.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn absolute(&self, url: &str) -> String {
        if url.contains("://") {
            url.to_string()
        } else {
            format!("{}{url}", self.base_url)
        }
    }

    async fn eval<T: DeserializeOwned>(&self, expression: &str) -> SiteResult<T> {
        self.page
            .evaluate(expression)
            .await
            .map_err(cdp_err)?
            .into_value()
            .map_err(cdp_err)
    }

    fn nth(selector: &str, index: usize) -> String {
        format!("document.querySelectorAll({})[{index}]", quote(selector))
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn navigate(&mut self, url: &str) -> SiteResult<()> {
        let url = self.absolute(url);
        self.page
            .goto(url.as_str())
            .await
            .map_err(|e| SiteError::Navigation {
                url: url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, timeout_ms: u64) -> SiteResult<()> {
        let wait = self.eval::<bool>(NETWORK_IDLE);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), wait).await {
            Ok(done) => done.map(|_| ()),
            Err(_) => Err(SiteError::Timeout {
                ms: timeout_ms,
                waiting_for: "network idle".to_string(),
            }),
        }
    }

    async fn wait_for_fonts(&mut self) -> SiteResult<()> {
        self.eval::<bool>("document.fonts.ready.then(() => true)")
            .await
            .map(|_| ())
    }

    async fn sleep(&mut self, ms: u64) -> SiteResult<()> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(())
    }

    async fn next_frame(&mut self) -> SiteResult<()> {
        self.eval::<bool>("new Promise(r => requestAnimationFrame(() => r(true)))")
            .await
            .map(|_| ())
    }

    async fn now_ms(&mut self) -> SiteResult<u64> {
        let now: f64 = self.eval("performance.now()").await?;
        Ok(now.max(0.0) as u64)
    }

    async fn count(&mut self, selector: &str) -> SiteResult<usize> {
        self.eval(&format!("document.querySelectorAll({}).length", quote(selector)))
            .await
    }

    async fn bounding_box(&mut self, selector: &str, index: usize) -> SiteResult<Option<Rect>> {
        self.eval(&format!(
            "(() => {{ const el = {}; if (!el) return null; \
             const r = el.getBoundingClientRect(); \
             return {{ x: r.x, y: r.y, width: r.width, height: r.height }}; }})()",
            Self::nth(selector, index)
        ))
        .await
    }

    async fn click(&mut self, selector: &str, index: usize) -> SiteResult<()> {
        let elements = self.page.find_elements(selector).await.map_err(cdp_err)?;
        let element = elements.get(index).ok_or_else(|| SiteError::ElementNotFound {
            selector: selector.to_string(),
            index,
        })?;
        element.click().await.map_err(cdp_err)?;
        Ok(())
    }

    async fn scroll_into_view_if_needed(&mut self, selector: &str, index: usize) -> SiteResult<()> {
        let found: bool = self
            .eval(&format!(
                "(() => {{ const el = {}; if (!el) return false; \
                 const r = el.getBoundingClientRect(); \
                 if (r.top < 0 || r.bottom > window.innerHeight) \
                 el.scrollIntoView({{ behavior: 'instant', block: 'start' }}); \
                 return true; }})()",
                Self::nth(selector, index)
            ))
            .await?;
        if found {
            Ok(())
        } else {
            Err(SiteError::ElementNotFound {
                selector: selector.to_string(),
                index,
            })
        }
    }

    async fn scroll_to(&mut self, top: f64) -> SiteResult<()> {
        self.eval::<bool>(&format!(
            "(() => {{ window.scrollTo({{ top: {top}, behavior: 'instant' }}); return true; }})()"
        ))
        .await
        .map(|_| ())
    }

    async fn scroll_y(&mut self) -> SiteResult<f64> {
        self.eval("window.scrollY").await
    }

    async fn document_height(&mut self) -> SiteResult<f64> {
        self.eval("document.body.scrollHeight").await
    }

    async fn press_key(&mut self, key: &str) -> SiteResult<()> {
        let target = self.page.find_element("body").await.map_err(cdp_err)?;
        target.press_key(key).await.map_err(cdp_err)?;
        Ok(())
    }

    async fn has_class(&mut self, selector: &str, class: &str) -> SiteResult<bool> {
        self.eval(&format!(
            "(() => {{ const el = document.querySelector({}); \
             return !!el && el.classList.contains({}); }})()",
            quote(selector),
            quote(class)
        ))
        .await
    }

    async fn screenshot(&mut self) -> SiteResult<Vec<u8>> {
        self.eval::<bool>(FREEZE_ANIMATIONS).await?;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self
            .page
            .execute(params)
            .await
            .map_err(|e| SiteError::Screenshot {
                message: e.to_string(),
            })?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| SiteError::Screenshot {
                message: e.to_string(),
            })
    }

    async fn close(&mut self) -> SiteResult<()> {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        self.handler.abort();
        Ok(())
    }
}
