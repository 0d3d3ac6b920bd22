//! Wait mechanisms for captures.
//!
//! Every capture is preceded by the same readiness sequence: network idle,
//! fonts ready, then a fixed settle time. Animation-completion waits that run
//! out of time are logged and treated as done.

use super::driver::PageDriver;
use crate::result::{SiteError, SiteResult};
use tracing::{debug, warn};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for the network-idle wait (30 seconds)
pub const DEFAULT_NETWORK_TIMEOUT_MS: u64 = 30_000;

/// Default settle time after fonts are ready
pub const DEFAULT_SETTLE_MS: u64 = 500;

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Consecutive equal frame samples that count as a settled scroll
pub const SCROLL_STABLE_SAMPLES: u32 = 3;

/// Upper bound on the scroll-settle wait
pub const SCROLL_SETTLE_CAP_MS: u64 = 2000;

// =============================================================================
// OPTIONS
// =============================================================================

/// Timeout and polling for condition waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Give up after this long
    pub timeout_ms: u64,
    /// Check this often
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_NETWORK_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }
}

// =============================================================================
// WAITS
// =============================================================================

/// Network idle, fonts ready, then `settle_ms`.
///
/// # Errors
///
/// Returns driver errors; a network-idle timeout is logged and ignored.
pub async fn wait_for_ready<D: PageDriver + ?Sized>(driver: &mut D, settle_ms: u64) -> SiteResult<()> {
    match driver.wait_for_network_idle(DEFAULT_NETWORK_TIMEOUT_MS).await {
        Err(SiteError::Timeout { ms, .. }) => warn!(ms, "network never went idle, continuing"),
        other => other?,
    }
    driver.wait_for_fonts().await?;
    driver.sleep(settle_ms).await?;
    debug!(settle_ms, "page ready");
    Ok(())
}

/// Sample `scrollY` once per frame until it reads the same
/// [`SCROLL_STABLE_SAMPLES`] times in a row, or [`SCROLL_SETTLE_CAP_MS`]
/// passes. Returns whether the scroll settled before the cap.
///
/// # Errors
///
/// Returns driver errors.
pub async fn wait_for_scroll_to_settle<D: PageDriver + ?Sized>(driver: &mut D) -> SiteResult<bool> {
    let start = driver.now_ms().await?;
    let mut last = driver.scroll_y().await?;
    let mut stable = 0;
    loop {
        let current = driver.scroll_y().await?;
        if (current - last).abs() < f64::EPSILON {
            stable += 1;
            if stable >= SCROLL_STABLE_SAMPLES {
                debug!(scroll_y = current, "scroll settled");
                return Ok(true);
            }
        } else {
            stable = 0;
            last = current;
        }
        if driver.now_ms().await?.saturating_sub(start) >= SCROLL_SETTLE_CAP_MS {
            warn!(scroll_y = current, "scroll still moving at cap, continuing");
            return Ok(false);
        }
        driver.next_frame().await?;
    }
}

/// Poll until the first match of `selector` has every class in `present`
/// and none in `absent`. Returns `Ok(false)` on timeout.
///
/// # Errors
///
/// Returns driver errors.
pub async fn wait_for_classes<D: PageDriver + ?Sized>(
    driver: &mut D,
    selector: &str,
    present: &[&str],
    absent: &[&str],
    options: WaitOptions,
) -> SiteResult<bool> {
    let start = driver.now_ms().await?;
    loop {
        let mut ok = true;
        for class in present {
            ok &= driver.has_class(selector, class).await?;
        }
        for class in absent {
            ok &= !driver.has_class(selector, class).await?;
        }
        if ok {
            return Ok(true);
        }
        if driver.now_ms().await?.saturating_sub(start) >= options.timeout_ms {
            warn!(selector, timeout_ms = options.timeout_ms, "class wait timed out, continuing");
            return Ok(false);
        }
        driver.sleep(options.poll_interval_ms.max(1)).await?;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::breakpoint::DeviceProfile;
    use crate::harness::driver::SimulatedDriver;

    #[tokio::test]
    async fn test_ready_sequence() {
        let mut driver = SimulatedDriver::new(DeviceProfile::tablet());
        driver.navigate("/").await.unwrap();
        wait_for_ready(&mut driver, 300).await.unwrap();
        assert_eq!(driver.now_ms().await.unwrap(), 800);
        let calls: Vec<&str> = driver.history().iter().map(String::as_str).collect();
        assert_eq!(
            calls,
            vec!["navigate:/", "wait_for_network_idle", "wait_for_fonts", "sleep:300"]
        );
    }

    #[tokio::test]
    async fn test_scroll_settles_after_smooth_scroll() {
        let mut driver = SimulatedDriver::new(DeviceProfile::desktop());
        driver.navigate("/").await.unwrap();
        let link = r##"a[href="#team"]"##;
        // tablet header, desktop header, then the hidden phone menu
        driver.click(link, 1).await.unwrap();
        assert!(wait_for_scroll_to_settle(&mut driver).await.unwrap());
        assert!(driver.scroll_y().await.unwrap() > 1000.0);
    }

    #[tokio::test]
    async fn test_class_wait_times_out_quietly() {
        let mut driver = SimulatedDriver::new(DeviceProfile::phone());
        driver.navigate("/").await.unwrap();
        let options = WaitOptions::new().with_timeout(200);
        let done = wait_for_classes(&mut driver, ".sdt-mobile-menu", &["is-open"], &[], options)
            .await
            .unwrap();
        assert!(!done);
    }
}
