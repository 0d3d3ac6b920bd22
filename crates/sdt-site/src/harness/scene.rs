//! Snapshot scenes and capture targets.

use super::driver::PageDriver;
use super::helpers::{
    navigate_to_firm, navigate_via_phone_menu, open_bio, open_phone_menu, scroll_to_footer,
    scroll_to_team,
};
use super::wait::wait_for_ready;
use crate::attorney::{AttorneyRecord, Roster};
use crate::breakpoint::Breakpoint;
use crate::fixture::Markup;
use crate::result::{SiteError, SiteResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Page a suite captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// The semantic rebuild
    Current,
    /// The page-builder export
    Baseline,
    /// The alternate export
    Baseline2,
}

impl Target {
    /// Every target
    pub const ALL: [Self; 3] = [Self::Baseline, Self::Baseline2, Self::Current];

    /// URL path the target is served at
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Current => "/",
            Self::Baseline => "/_baseline/",
            Self::Baseline2 => "/_baseline2/",
        }
    }

    /// Snapshot file prefix
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Baseline => "baseline",
            Self::Baseline2 => "baseline2",
        }
    }

    /// Markup served for the target
    #[must_use]
    pub const fn markup(self) -> Markup {
        match self {
            Self::Current => Markup::Semantic,
            Self::Baseline | Self::Baseline2 => Markup::Export,
        }
    }

    /// Parse a prefix
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.prefix() == name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// What a scene does before the capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "attorney", rename_all = "kebab-case")]
pub enum SceneKind {
    /// Top of the page as loaded
    Hero,
    /// Team section at the top of the viewport
    Team,
    /// Bottom of the page
    Footer,
    /// Header link to the firm section
    FirmNavigation,
    /// Phone menu link to the firm section
    FirmNavigationPhoneMenu,
    /// Phone menu opened
    MenuOpen,
    /// Bio overlay of one attorney (export id)
    Bio(String),
}

/// One named capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scene {
    /// Scene name, used in file names
    pub name: String,
    /// Preparation
    #[serde(flatten)]
    pub kind: SceneKind,
    /// Only captured at this breakpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only: Option<Breakpoint>,
    /// Never captured at this breakpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<Breakpoint>,
}

impl Scene {
    fn new(name: impl Into<String>, kind: SceneKind) -> Self {
        Self {
            name: name.into(),
            kind,
            only: None,
            skip: None,
        }
    }

    const fn only_on(mut self, breakpoint: Breakpoint) -> Self {
        self.only = Some(breakpoint);
        self
    }

    const fn skip_on(mut self, breakpoint: Breakpoint) -> Self {
        self.skip = Some(breakpoint);
        self
    }

    /// Every scene, bios in roster order
    #[must_use]
    pub fn all(roster: &Roster) -> Vec<Self> {
        let mut scenes = vec![
            Self::new("hero", SceneKind::Hero),
            Self::new("team", SceneKind::Team),
            Self::new("footer", SceneKind::Footer),
            Self::new("firm-navigation", SceneKind::FirmNavigation).skip_on(Breakpoint::Phone),
            Self::new("firm-navigation-phone-menu", SceneKind::FirmNavigationPhoneMenu)
                .only_on(Breakpoint::Phone),
            Self::new("menu-open", SceneKind::MenuOpen).only_on(Breakpoint::Phone),
        ];
        scenes.extend(roster.records().iter().map(Self::bio));
        scenes
    }

    /// Bio scene for `record`
    #[must_use]
    pub fn bio(record: &AttorneyRecord) -> Self {
        Self::new(
            format!("bio-{}", record.short_name.to_lowercase()),
            SceneKind::Bio(record.id.clone()),
        )
    }

    /// Whether the scene is captured at `breakpoint`
    #[must_use]
    pub fn applies_to(&self, breakpoint: Breakpoint) -> bool {
        self.only.map_or(true, |b| b == breakpoint) && self.skip != Some(breakpoint)
    }

    /// `<prefix>-<scene>.png`
    #[must_use]
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{prefix}-{}.png", self.name)
    }

    /// Drive the loaded page into the scene's state.
    ///
    /// # Errors
    ///
    /// Returns driver errors and missing elements.
    pub async fn prepare<D: PageDriver + ?Sized>(&self, driver: &mut D, roster: &Roster) -> SiteResult<()> {
        debug!(scene = %self.name, "preparing scene");
        match &self.kind {
            SceneKind::Hero => Ok(()),
            SceneKind::Team => scroll_to_team(driver).await,
            SceneKind::Footer => scroll_to_footer(driver).await,
            SceneKind::FirmNavigation => navigate_to_firm(driver).await,
            SceneKind::FirmNavigationPhoneMenu => navigate_via_phone_menu(driver).await,
            SceneKind::MenuOpen => open_phone_menu(driver).await,
            SceneKind::Bio(id) => {
                let record = roster
                    .get(id)
                    .ok_or_else(|| SiteError::config(format!("unknown attorney `{id}`")))?;
                scroll_to_team(driver).await?;
                open_bio(driver, record).await
            }
        }
    }

    /// Navigate to `url`, wait for readiness, prepare, and screenshot.
    ///
    /// # Errors
    ///
    /// Returns driver errors and missing elements.
    pub async fn capture<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        roster: &Roster,
        url: &str,
        settle_ms: u64,
    ) -> SiteResult<Vec<u8>> {
        driver.navigate(url).await?;
        wait_for_ready(driver, settle_ms).await?;
        self.prepare(driver, roster).await?;
        driver.screenshot().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::breakpoint::DeviceProfile;
    use crate::harness::driver::SimulatedDriver;

    #[test]
    fn test_scene_table() {
        let roster = Roster::builtin().unwrap();
        let scenes = Scene::all(&roster);
        let names: Vec<&str> = scenes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "hero",
                "team",
                "footer",
                "firm-navigation",
                "firm-navigation-phone-menu",
                "menu-open",
                "bio-tammy",
                "bio-heidi",
                "bio-phyllis",
            ]
        );
        let phone: Vec<&str> = scenes
            .iter()
            .filter(|s| s.applies_to(Breakpoint::Phone))
            .map(|s| s.name.as_str())
            .collect();
        assert!(!phone.contains(&"firm-navigation"));
        assert!(phone.contains(&"menu-open"));
        let desktop = scenes.iter().filter(|s| s.applies_to(Breakpoint::Desktop)).count();
        assert_eq!(desktop, 7);
    }

    #[test]
    fn test_targets() {
        assert_eq!(Target::Baseline.path(), "/_baseline/");
        assert_eq!(Target::Baseline2.prefix(), "baseline2");
        assert_eq!(Target::Current.markup(), Markup::Semantic);
        assert_eq!(Target::parse("current"), Some(Target::Current));
        assert_eq!(Target::parse("nope"), None);
        let roster = Roster::builtin().unwrap();
        let hero = &Scene::all(&roster)[0];
        assert_eq!(hero.file_name(Target::Baseline2.prefix()), "baseline2-hero.png");
    }

    #[test]
    fn test_scene_serializes_kind() {
        let roster = Roster::builtin().unwrap();
        let bio = Scene::bio(roster.get("a2aut").unwrap());
        let json = serde_json::to_string(&bio).unwrap();
        assert!(json.contains(r#""kind":"bio""#));
        assert!(json.contains(r#""attorney":"a2aut""#));
    }

    #[tokio::test]
    async fn test_capture_menu_open() {
        let roster = Roster::builtin().unwrap();
        let scene = Scene::all(&roster)
            .into_iter()
            .find(|s| s.name == "menu-open")
            .unwrap();
        let mut driver = SimulatedDriver::new(DeviceProfile::phone());
        let png = scene.capture(&mut driver, &roster, "/", 500).await.unwrap();
        assert!(!png.is_empty());
        assert!(driver.runtime().unwrap().menu().is_open());
        let calls = driver.history();
        assert_eq!(calls[0], "navigate:/");
        assert_eq!(calls.last().unwrap(), "screenshot");
    }
}
