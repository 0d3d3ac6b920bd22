//! Snapshot harness configuration.
//!
//! Read from `sdt-snap.yaml` when present; every field has a default, so an
//! empty file (or no file) is a valid configuration. A few environment
//! variables override the file.

use super::scene::Target;
use super::visual::{CompareConfig, DEFAULT_COLOR_THRESHOLD, DEFAULT_MAX_DIFF_PIXEL_RATIO};
use super::wait::DEFAULT_SETTLE_MS;
use crate::breakpoint::DeviceProfile;
use crate::config::Timings;
use crate::result::{SiteError, SiteResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file name
pub const CONFIG_FILE: &str = "sdt-snap.yaml";

/// Default base URL of the local static server
pub const DEFAULT_BASE_URL: &str = "http://localhost:9753";

/// Retries per scene when `CI` is set
pub const CI_RETRIES: u32 = 2;

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Where the site is served
    pub base_url: String,
    /// Snapshot root
    pub snapshot_dir: PathBuf,
    /// Diff image root
    pub diff_dir: PathBuf,
    /// Share of pixels allowed to differ
    pub max_diff_pixel_ratio: f64,
    /// Per-pixel tolerance
    pub color_threshold: u8,
    /// Settle time after fonts are ready
    pub settle_ms: u64,
    /// Profile names to run (`phone`, `tablet`, `desktop`)
    pub profiles: Vec<String>,
    /// Write missing or mismatching snapshots instead of failing
    pub update: bool,
    /// Extra attempts per scene
    pub retries: u32,
    /// Run the alternate-export suites
    pub baseline2: bool,
    /// Chromium executable
    pub chromium_path: Option<PathBuf>,
    /// Site interaction timings
    pub timings: Timings,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            snapshot_dir: PathBuf::from("snapshots"),
            diff_dir: PathBuf::from("target/sdt-snap/diffs"),
            max_diff_pixel_ratio: DEFAULT_MAX_DIFF_PIXEL_RATIO,
            color_threshold: DEFAULT_COLOR_THRESHOLD,
            settle_ms: DEFAULT_SETTLE_MS,
            profiles: DeviceProfile::standard().into_iter().map(|p| p.name).collect(),
            update: false,
            retries: 0,
            baseline2: false,
            chromium_path: None,
            timings: Timings::default(),
        }
    }
}

impl SnapConfig {
    /// Parse YAML.
    ///
    /// # Errors
    ///
    /// Returns YAML errors and invalid values.
    pub fn from_yaml(text: &str) -> SiteResult<Self> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns I/O, YAML and validation errors.
    pub fn load(path: &Path) -> SiteResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns YAML errors.
    pub fn to_yaml(&self) -> SiteResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply `ENABLE_BASELINE2`, `CI` and `CHROMIUM_PATH` from the process
    /// environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply the environment overrides from `lookup`
    #[must_use]
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if lookup("ENABLE_BASELINE2").as_deref() == Some("1") {
            self.baseline2 = true;
        }
        if lookup("CI").is_some_and(|v| !v.is_empty()) {
            self.retries = self.retries.max(CI_RETRIES);
        }
        if let Some(path) = lookup("CHROMIUM_PATH").filter(|v| !v.is_empty()) {
            self.chromium_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Check value ranges and profile names.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Config`] for the first invalid value.
    pub fn validate(&self) -> SiteResult<()> {
        if !(0.0..=1.0).contains(&self.max_diff_pixel_ratio) {
            return Err(SiteError::config(format!(
                "max_diff_pixel_ratio must be within 0..=1, got {}",
                self.max_diff_pixel_ratio
            )));
        }
        if self.profiles.is_empty() {
            return Err(SiteError::config("at least one profile is required"));
        }
        self.device_profiles().map(|_| ())
    }

    /// Resolve profile names.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Config`] for an unknown name.
    pub fn device_profiles(&self) -> SiteResult<Vec<DeviceProfile>> {
        self.profiles
            .iter()
            .map(|name| {
                DeviceProfile::named(name)
                    .ok_or_else(|| SiteError::config(format!("unknown profile `{name}`")))
            })
            .collect()
    }

    /// Whether suites may capture or read `target`'s snapshots. The
    /// alternate export is opt-in.
    #[must_use]
    pub fn allows(&self, target: Target) -> bool {
        target != Target::Baseline2 || self.baseline2
    }

    /// Comparison tolerances
    #[must_use]
    pub const fn compare(&self) -> CompareConfig {
        CompareConfig {
            max_diff_pixel_ratio: self.max_diff_pixel_ratio,
            color_threshold: self.color_threshold,
        }
    }

    /// Absolute URL of `path`
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SnapConfig::default();
        assert_eq!(config.base_url, "http://localhost:9753");
        assert_eq!(config.profiles, vec!["phone", "tablet", "desktop"]);
        assert!((config.max_diff_pixel_ratio - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.settle_ms, 500);
        assert_eq!(config.url("/_baseline/"), "http://localhost:9753/_baseline/");
        assert_eq!(SnapConfig::from_yaml("").unwrap(), config);
    }

    #[test]
    fn test_partial_yaml() {
        let config = SnapConfig::from_yaml(
            "base_url: http://localhost:3000/\nprofiles: [desktop]\ntimings:\n  overlay_close_ms: 200\n",
        )
        .unwrap();
        assert_eq!(config.url("/"), "http://localhost:3000/");
        assert_eq!(config.device_profiles().unwrap().len(), 1);
        assert_eq!(config.timings.overlay_close_ms, 200);
        assert_eq!(config.timings.menu_opening_ms, 300);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            SnapConfig::from_yaml("profiles: [watch]"),
            Err(SiteError::Config { .. })
        ));
        assert!(matches!(
            SnapConfig::from_yaml("max_diff_pixel_ratio: 1.5"),
            Err(SiteError::Config { .. })
        ));
        assert!(matches!(
            SnapConfig::from_yaml("retries: [1]"),
            Err(SiteError::Yaml(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env = |key: &str| match key {
            "ENABLE_BASELINE2" => Some("1".to_string()),
            "CI" => Some("true".to_string()),
            "CHROMIUM_PATH" => Some("/usr/bin/chromium".to_string()),
            _ => None,
        };
        let config = SnapConfig::default().with_env_from(env);
        assert!(config.baseline2);
        assert_eq!(config.retries, 2);
        assert_eq!(config.chromium_path, Some(PathBuf::from("/usr/bin/chromium")));

        let config = SnapConfig::default().with_env_from(|key| {
            (key == "ENABLE_BASELINE2").then(|| "true".to_string())
        });
        assert!(!config.baseline2);
        assert_eq!(config.retries, 0);
        assert!(!config.allows(Target::Baseline2));
        assert!(config.allows(Target::Baseline));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SnapConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, SnapConfig::default());

        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, config.to_yaml().unwrap()).unwrap();
        assert_eq!(SnapConfig::load(&path).unwrap(), config);
    }
}
