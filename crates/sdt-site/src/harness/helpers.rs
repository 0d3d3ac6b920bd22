//! Scene preparation helpers.
//!
//! Both markups repeat every section once per breakpoint, so every helper
//! works on the first *visible* match rather than the first match.

use super::driver::PageDriver;
use super::wait::{wait_for_classes, wait_for_scroll_to_settle, WaitOptions};
use crate::attorney::AttorneyRecord;
use crate::layout::Rect;
use crate::menu::{MenuSelectors, OPENING_CLASS, OPEN_CLASS};
use crate::result::{SiteError, SiteResult};
use tracing::{debug, info};

/// Wait after clicking a card
pub const BIO_OPEN_WAIT_MS: u64 = 1000;
/// Wait after each close attempt
pub const BIO_CLOSE_WAIT_MS: u64 = 500;
/// Time allowed for the menu to finish opening
pub const MENU_OPEN_TIMEOUT_MS: u64 = 1000;
/// Extra wait after the menu-driven scroll settles
pub const MENU_NAV_SETTLE_MS: u64 = 200;
/// Menu links start scrolling after the collapse has been armed
pub const MENU_SCROLL_START_MS: u64 = 100;

const TEAM_SELECTOR: &str = "#team";
const FOOTER_SELECTOR: &str = ".sdt-footer";
const FIRM_LINK_SELECTOR: &str = r##"a[href="#firm"]"##;
const MENU_FIRM_LINK_SELECTOR: &str =
    r##".sdt-mobile-menu a[href="#firm"], .framer-lxsbpu a[href="#firm"]"##;
const CLOSE_BUTTON_SELECTOR: &str = ".bio-panel__close";
const BACKDROP_SELECTOR: &str = ".bio-portal__backdrop";

/// One rendered match of a selector
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRef {
    /// Selector the element was found with
    pub selector: String,
    /// Index among the selector's matches
    pub index: usize,
    /// Viewport-relative box when found
    pub rect: Rect,
}

/// First match of `selector` with a non-empty box.
///
/// # Errors
///
/// Returns driver errors.
pub async fn find_visible<D: PageDriver + ?Sized>(
    driver: &mut D,
    selector: &str,
) -> SiteResult<Option<ElementRef>> {
    let count = driver.count(selector).await?;
    for index in 0..count {
        if let Some(rect) = driver.bounding_box(selector, index).await? {
            if rect.is_rendered() {
                return Ok(Some(ElementRef {
                    selector: selector.to_string(),
                    index,
                    rect,
                }));
            }
        }
    }
    Ok(None)
}

async fn require_visible<D: PageDriver + ?Sized>(
    driver: &mut D,
    selector: &str,
) -> SiteResult<ElementRef> {
    find_visible(driver, selector)
        .await?
        .ok_or_else(|| SiteError::ElementNotFound {
            selector: selector.to_string(),
            index: 0,
        })
}

async fn click_visible<D: PageDriver + ?Sized>(driver: &mut D, selector: &str) -> SiteResult<bool> {
    match find_visible(driver, selector).await? {
        Some(el) => {
            driver.click(&el.selector, el.index).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Bring the team section to the top of the viewport.
///
/// The first `#team` is scrolled into view when it renders; otherwise the
/// window jumps to the first copy that does.
///
/// # Errors
///
/// Returns [`SiteError::ElementNotFound`] when no copy renders.
pub async fn scroll_to_team<D: PageDriver + ?Sized>(driver: &mut D) -> SiteResult<()> {
    let first = driver.bounding_box(TEAM_SELECTOR, 0).await?;
    if first.is_some_and(|r| r.is_rendered()) {
        return driver.scroll_into_view_if_needed(TEAM_SELECTOR, 0).await;
    }
    let team = require_visible(driver, TEAM_SELECTOR).await?;
    let top = driver.scroll_y().await? + team.rect.y;
    debug!(index = team.index, top, "scrolling to visible team copy");
    driver.scroll_to(top).await
}

/// Bring the footer into view, or scroll to the bottom when the markup has
/// no semantic footer.
///
/// # Errors
///
/// Returns driver errors.
pub async fn scroll_to_footer<D: PageDriver + ?Sized>(driver: &mut D) -> SiteResult<()> {
    if let Some(footer) = find_visible(driver, FOOTER_SELECTOR).await? {
        return driver
            .scroll_into_view_if_needed(&footer.selector, footer.index)
            .await;
    }
    let bottom = driver.document_height().await?;
    driver.scroll_to(bottom).await
}

/// Selector of `record`'s card in either markup
#[must_use]
pub fn card_selectors(record: &AttorneyRecord) -> [String; 2] {
    [
        format!(".framer-{}-container .framer-74g9dq", record.id),
        format!(r#"[id="{}"] .sdt-team__card"#, record.semantic_id),
    ]
}

/// Click `record`'s visible card and give the overlay time to open.
///
/// # Errors
///
/// Returns [`SiteError::ElementNotFound`] when neither markup's card is
/// visible.
pub async fn open_bio<D: PageDriver + ?Sized>(driver: &mut D, record: &AttorneyRecord) -> SiteResult<()> {
    for selector in card_selectors(record) {
        if click_visible(driver, &selector).await? {
            info!(attorney = %record.short_name, "bio card clicked");
            return driver.sleep(BIO_OPEN_WAIT_MS).await;
        }
    }
    Err(SiteError::ElementNotFound {
        selector: card_selectors(record).join(", "),
        index: 0,
    })
}

/// Dismiss the open bio: close button, else backdrop, else Escape.
///
/// # Errors
///
/// Returns driver errors.
pub async fn close_bio<D: PageDriver + ?Sized>(driver: &mut D) -> SiteResult<()> {
    for selector in [CLOSE_BUTTON_SELECTOR, BACKDROP_SELECTOR] {
        if click_visible(driver, selector).await? {
            debug!(selector, "bio dismissed by click");
            return driver.sleep(BIO_CLOSE_WAIT_MS).await;
        }
    }
    debug!("bio dismissed with Escape");
    driver.press_key("Escape").await?;
    driver.sleep(BIO_CLOSE_WAIT_MS).await
}

/// Follow the header link to the firm section.
///
/// # Errors
///
/// Returns [`SiteError::ElementNotFound`] when no header link renders
/// (phone).
pub async fn navigate_to_firm<D: PageDriver + ?Sized>(driver: &mut D) -> SiteResult<()> {
    let link = require_visible(driver, FIRM_LINK_SELECTOR).await?;
    driver.click(&link.selector, link.index).await?;
    wait_for_scroll_to_settle(driver).await?;
    Ok(())
}

/// Open the phone menu and wait for its opening animation to end.
///
/// # Errors
///
/// Returns [`SiteError::ElementNotFound`] when the toggle does not render.
pub async fn open_phone_menu<D: PageDriver + ?Sized>(driver: &mut D) -> SiteResult<()> {
    let selectors = MenuSelectors::default();
    let toggle = require_visible(driver, &selectors.toggle).await?;
    driver.click(&toggle.selector, toggle.index).await?;
    let options = WaitOptions::new().with_timeout(MENU_OPEN_TIMEOUT_MS);
    wait_for_classes(driver, &selectors.panel, &[OPEN_CLASS], &[OPENING_CLASS], options).await?;
    Ok(())
}

/// Reach the firm section through the phone menu.
///
/// # Errors
///
/// Returns [`SiteError::ElementNotFound`] when the toggle or the menu link
/// does not render.
pub async fn navigate_via_phone_menu<D: PageDriver + ?Sized>(driver: &mut D) -> SiteResult<()> {
    open_phone_menu(driver).await?;
    let link = require_visible(driver, MENU_FIRM_LINK_SELECTOR).await?;
    driver.click(&link.selector, link.index).await?;
    driver.sleep(MENU_SCROLL_START_MS).await?;
    wait_for_scroll_to_settle(driver).await?;
    driver.sleep(MENU_NAV_SETTLE_MS).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attorney::Roster;
    use crate::breakpoint::DeviceProfile;
    use crate::harness::driver::SimulatedDriver;
    use crate::overlay::OverlayState;

    async fn loaded(profile: DeviceProfile, url: &str) -> SimulatedDriver {
        let mut driver = SimulatedDriver::new(profile);
        driver.navigate(url).await.unwrap();
        driver
    }

    fn overlay_state(driver: &SimulatedDriver) -> OverlayState {
        driver.runtime().unwrap().overlay().state()
    }

    #[tokio::test]
    async fn test_find_visible_skips_hidden_copies() {
        let mut driver = loaded(DeviceProfile::tablet(), "/").await;
        let team = find_visible(&mut driver, "#team").await.unwrap().unwrap();
        assert_eq!(team.index, 1);
        assert!(find_visible(&mut driver, ".nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scroll_to_team_uses_visible_copy() {
        for profile in DeviceProfile::standard() {
            let mut driver = loaded(profile.clone(), "/_baseline/").await;
            scroll_to_team(&mut driver).await.unwrap();
            let team = find_visible(&mut driver, "#team").await.unwrap().unwrap();
            // short pages clamp the scroll before the section reaches the top
            assert!(driver.scroll_y().await.unwrap() > 0.0);
            assert!((-1.0..500.0).contains(&team.rect.y), "{}", profile.name);
        }
    }

    #[tokio::test]
    async fn test_footer_fallback_reaches_bottom() {
        let mut semantic = loaded(DeviceProfile::desktop(), "/").await;
        let mut export = loaded(DeviceProfile::desktop(), "/_baseline/").await;
        scroll_to_footer(&mut semantic).await.unwrap();
        scroll_to_footer(&mut export).await.unwrap();
        assert!(!export.was_called("scroll_into_view"));
        let a = semantic.scroll_y().await.unwrap();
        let b = export.scroll_y().await.unwrap();
        assert!(a > 0.0);
        assert!((a - b).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_open_and_close_bio_with_backdrop() {
        let roster = Roster::builtin().unwrap();
        let tammy = roster.get("1kq6r0t").unwrap();
        let mut driver = loaded(DeviceProfile::desktop(), "/").await;
        open_bio(&mut driver, tammy).await.unwrap();
        assert_eq!(overlay_state(&driver), OverlayState::Open);
        close_bio(&mut driver).await.unwrap();
        assert_eq!(overlay_state(&driver), OverlayState::Closed);
        assert!(driver.was_called("click:.bio-portal__backdrop"));
    }

    #[tokio::test]
    async fn test_open_and_close_bio_with_button_on_export() {
        let roster = Roster::builtin().unwrap();
        let heidi = roster.get("a2aut").unwrap();
        let mut driver = loaded(DeviceProfile::phone(), "/_baseline/").await;
        open_bio(&mut driver, heidi).await.unwrap();
        assert_eq!(overlay_state(&driver), OverlayState::Open);
        assert!(driver.was_called("click:.framer-a2aut-container"));
        close_bio(&mut driver).await.unwrap();
        assert_eq!(overlay_state(&driver), OverlayState::Closed);
        assert!(driver.was_called("click:.bio-panel__close"));
    }

    #[tokio::test]
    async fn test_close_bio_falls_back_to_escape() {
        let mut driver = loaded(DeviceProfile::tablet(), "/").await;
        close_bio(&mut driver).await.unwrap();
        assert!(driver.was_called("press_key:Escape"));
    }

    #[tokio::test]
    async fn test_firm_link_missing_on_phone() {
        let mut driver = loaded(DeviceProfile::phone(), "/").await;
        let err = navigate_to_firm(&mut driver).await;
        assert!(matches!(err, Err(SiteError::ElementNotFound { .. })));
    }

    #[tokio::test]
    async fn test_navigate_to_firm_on_tablet() {
        let mut driver = loaded(DeviceProfile::tablet(), "/").await;
        navigate_to_firm(&mut driver).await.unwrap();
        let firm = find_visible(&mut driver, "#firm").await.unwrap().unwrap();
        assert!(firm.rect.y.abs() < 1.0);
    }

    #[tokio::test]
    async fn test_open_phone_menu_waits_for_opening() {
        let mut driver = loaded(DeviceProfile::phone(), "/").await;
        open_phone_menu(&mut driver).await.unwrap();
        let panel = ".sdt-mobile-menu";
        assert!(driver.has_class(panel, OPEN_CLASS).await.unwrap());
        assert!(!driver.has_class(panel, OPENING_CLASS).await.unwrap());
        assert!(driver.now_ms().await.unwrap() < MENU_OPEN_TIMEOUT_MS);
    }

    #[tokio::test]
    async fn test_phone_menu_navigation() {
        let mut driver = loaded(DeviceProfile::phone(), "/_baseline/").await;
        let panel = ".framer-lxsbpu";
        navigate_via_phone_menu(&mut driver).await.unwrap();
        assert!(!driver.has_class(panel, OPEN_CLASS).await.unwrap());
        let firm = find_visible(&mut driver, "#firm").await.unwrap().unwrap();
        assert!((firm.rect.y - 60.0).abs() < 1.0, "firm at {}", firm.rect.y);
    }
}
