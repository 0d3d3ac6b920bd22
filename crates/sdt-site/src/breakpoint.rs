//! Responsive breakpoints and the viewport profiles the snapshots run under.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width at which the tablet layout takes over from the phone layout
pub const TABLET_MIN_WIDTH: u32 = 810;

/// Width at which the desktop layout takes over from the tablet layout
pub const DESKTOP_MIN_WIDTH: u32 = 1200;

/// Responsive layout class, derived purely from viewport width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    /// Width below 810
    Phone,
    /// Width 810 through 1199
    Tablet,
    /// Width 1200 and above
    Desktop,
}

impl Breakpoint {
    /// All breakpoints, narrowest first
    pub const ALL: [Self; 3] = [Self::Phone, Self::Tablet, Self::Desktop];

    /// Classify a viewport width
    #[must_use]
    pub const fn from_width(width: u32) -> Self {
        if width < TABLET_MIN_WIDTH {
            Self::Phone
        } else if width < DESKTOP_MIN_WIDTH {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }

    /// Lowercase name used in class names and snapshot paths
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }

    /// Parse a lowercase breakpoint name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == name)
    }

    /// Fixed pixel width of the bio overlay at this breakpoint
    #[must_use]
    pub const fn overlay_width(self) -> f64 {
        match self {
            Self::Phone => 380.0,
            Self::Tablet => 810.0,
            Self::Desktop => 1200.0,
        }
    }

    /// Distance the overlay sits above the first card row
    #[must_use]
    pub const fn overlay_offset(self) -> f64 {
        match self {
            Self::Phone => 37.0,
            Self::Tablet => 191.0,
            Self::Desktop => 291.0,
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a new viewport
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Breakpoint for this viewport's width
    #[must_use]
    pub const fn breakpoint(&self) -> Breakpoint {
        Breakpoint::from_width(self.width)
    }
}

/// A named browser profile: viewport plus device emulation flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Profile name ("phone", "tablet", "desktop")
    pub name: String,
    /// Viewport dimensions
    pub viewport: Viewport,
    /// Device pixel ratio
    #[serde(default = "default_scale")]
    pub device_scale_factor: f64,
    /// Emulate a mobile device
    #[serde(default)]
    pub is_mobile: bool,
    /// Emulate touch input
    #[serde(default)]
    pub has_touch: bool,
}

const fn default_scale() -> f64 {
    1.0
}

impl DeviceProfile {
    /// Create a desktop-style profile with scale 1 and no touch
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            viewport: Viewport::new(width, height),
            device_scale_factor: 1.0,
            is_mobile: false,
            has_touch: false,
        }
    }

    /// Set device scale factor
    #[must_use]
    pub const fn with_device_scale_factor(mut self, factor: f64) -> Self {
        self.device_scale_factor = factor;
        self
    }

    /// Set mobile and touch emulation together
    #[must_use]
    pub const fn with_mobile_touch(mut self, enabled: bool) -> Self {
        self.is_mobile = enabled;
        self.has_touch = enabled;
        self
    }

    /// 390x844 at 2x, mobile with touch
    #[must_use]
    pub fn phone() -> Self {
        Self::new("phone", 390, 844)
            .with_device_scale_factor(2.0)
            .with_mobile_touch(true)
    }

    /// 900x1200
    #[must_use]
    pub fn tablet() -> Self {
        Self::new("tablet", 900, 1200)
    }

    /// 1400x900
    #[must_use]
    pub fn desktop() -> Self {
        Self::new("desktop", 1400, 900)
    }

    /// The three standard profiles
    #[must_use]
    pub fn standard() -> Vec<Self> {
        vec![Self::phone(), Self::tablet(), Self::desktop()]
    }

    /// Look up a standard profile by name
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        Self::standard().into_iter().find(|p| p.name == name)
    }

    /// Breakpoint the profile's viewport falls into
    #[must_use]
    pub const fn breakpoint(&self) -> Breakpoint {
        self.viewport.breakpoint()
    }

    /// Whether this is the phone profile
    #[must_use]
    pub fn is_phone(&self) -> bool {
        self.name == "phone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_breakpoint_thresholds() {
        assert_eq!(Breakpoint::from_width(0), Breakpoint::Phone);
        assert_eq!(Breakpoint::from_width(809), Breakpoint::Phone);
        assert_eq!(Breakpoint::from_width(810), Breakpoint::Tablet);
        assert_eq!(Breakpoint::from_width(1199), Breakpoint::Tablet);
        assert_eq!(Breakpoint::from_width(1200), Breakpoint::Desktop);
    }

    #[test]
    fn test_overlay_geometry_table() {
        assert!((Breakpoint::Phone.overlay_width() - 380.0).abs() < f64::EPSILON);
        assert!((Breakpoint::Tablet.overlay_width() - 810.0).abs() < f64::EPSILON);
        assert!((Breakpoint::Desktop.overlay_width() - 1200.0).abs() < f64::EPSILON);
        assert!((Breakpoint::Phone.overlay_offset() - 37.0).abs() < f64::EPSILON);
        assert!((Breakpoint::Tablet.overlay_offset() - 191.0).abs() < f64::EPSILON);
        assert!((Breakpoint::Desktop.overlay_offset() - 291.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_standard_profiles() {
        let phone = DeviceProfile::phone();
        assert_eq!(phone.viewport, Viewport::new(390, 844));
        assert!((phone.device_scale_factor - 2.0).abs() < f64::EPSILON);
        assert!(phone.is_mobile && phone.has_touch);
        assert_eq!(phone.breakpoint(), Breakpoint::Phone);

        assert_eq!(DeviceProfile::tablet().breakpoint(), Breakpoint::Tablet);
        assert_eq!(DeviceProfile::desktop().breakpoint(), Breakpoint::Desktop);
        assert!(DeviceProfile::named("tablet").is_some());
        assert!(DeviceProfile::named("watch").is_none());
    }

    #[test]
    fn test_parse_roundtrip_names() {
        for bp in Breakpoint::ALL {
            assert_eq!(Breakpoint::parse(bp.as_str()), Some(bp));
        }
        assert_eq!(Breakpoint::parse("mobile"), None);
    }

    proptest! {
        #[test]
        fn prop_breakpoint_is_monotonic(a in 0u32..4000, b in 0u32..4000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Breakpoint::from_width(lo) <= Breakpoint::from_width(hi));
        }
    }
}
