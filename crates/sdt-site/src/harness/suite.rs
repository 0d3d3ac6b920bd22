//! Capture and compare suites.
//!
//! A suite runs every applicable scene of one target on every configured
//! profile. Profiles run concurrently, each on its own driver; scenes within
//! a profile run in order.

use super::config::SnapConfig;
use super::driver::{PageDriver, SimulatedDriver};
use super::scene::{Scene, Target};
use super::visual::{SnapshotComparator, SnapshotStore};
use crate::attorney::Roster;
use crate::breakpoint::DeviceProfile;
use crate::config::Timings;
use crate::result::{SiteError, SiteResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

// =============================================================================
// DRIVER FACTORIES
// =============================================================================

/// Opens one driver per profile
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// A driver emulating `profile`
    async fn create(&self, profile: &DeviceProfile) -> SiteResult<Box<dyn PageDriver>>;
}

/// Drivers over the in-process fixtures
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedFactory {
    timings: Timings,
}

impl SimulatedFactory {
    /// Factory with `timings`
    #[must_use]
    pub const fn new(timings: Timings) -> Self {
        Self { timings }
    }
}

#[async_trait]
impl DriverFactory for SimulatedFactory {
    async fn create(&self, profile: &DeviceProfile) -> SiteResult<Box<dyn PageDriver>> {
        Ok(Box::new(SimulatedDriver::with_timings(profile.clone(), self.timings)))
    }
}

/// Chromium tabs over CDP
#[cfg(feature = "browser")]
#[derive(Debug, Clone, Default)]
pub struct CdpFactory {
    options: super::cdp::CdpOptions,
}

#[cfg(feature = "browser")]
impl CdpFactory {
    /// Factory launching Chromium with `options`
    #[must_use]
    pub const fn new(options: super::cdp::CdpOptions) -> Self {
        Self { options }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl DriverFactory for CdpFactory {
    async fn create(&self, profile: &DeviceProfile) -> SiteResult<Box<dyn PageDriver>> {
        let driver = super::cdp::CdpDriver::launch(&self.options, profile).await?;
        Ok(Box::new(driver))
    }
}

// =============================================================================
// PLANS
// =============================================================================

/// What a suite does with each capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SuiteMode {
    /// Store `<target>-<scene>.png`
    Capture,
    /// Store the capture and compare it with `<against>-<scene>.png`
    Compare {
        /// Snapshot set compared against
        against: Target,
    },
}

/// One suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuitePlan {
    /// Suite name
    pub name: String,
    /// Page captured
    pub target: Target,
    /// Capture or compare
    #[serde(flatten)]
    pub mode: SuiteMode,
}

impl SuitePlan {
    /// Capture `target`
    #[must_use]
    pub fn capture(target: Target) -> Self {
        Self {
            name: format!("{target}-capture"),
            target,
            mode: SuiteMode::Capture,
        }
    }

    /// Compare `target` with the `against` snapshots
    #[must_use]
    pub fn compare(target: Target, against: Target) -> Self {
        Self {
            name: format!("{target}-vs-{against}"),
            target,
            mode: SuiteMode::Compare { against },
        }
    }

    /// The regular suites: baseline capture, then the current page against
    /// the baseline. With the alternate export enabled, three more suites
    /// follow: its capture, the alternate against the baseline, and the
    /// current page against the alternate.
    #[must_use]
    pub fn standard(config: &SnapConfig) -> Vec<Self> {
        let mut plans = vec![
            Self::capture(Target::Baseline),
            Self::compare(Target::Current, Target::Baseline),
        ];
        if config.baseline2 {
            plans.extend([
                Self::capture(Target::Baseline2),
                Self::compare(Target::Baseline2, Target::Baseline),
                Self::compare(Target::Current, Target::Baseline2),
            ]);
        }
        plans
    }

    /// Pages whose snapshots the suite reads or writes
    #[must_use]
    pub fn targets(&self) -> Vec<Target> {
        match self.mode {
            SuiteMode::Capture => vec![self.target],
            SuiteMode::Compare { against } => vec![self.target, against],
        }
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Outcome of one scene on one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// Snapshot written
    Captured {
        /// File written
        path: PathBuf,
    },
    /// Within tolerance
    Matched {
        /// Share of differing pixels
        ratio: f64,
    },
    /// Over tolerance
    Mismatch {
        /// Share of differing pixels
        ratio: f64,
        /// Allowed share
        limit: f64,
        /// Diff image
        diff: Option<PathBuf>,
    },
    /// Not applicable at this breakpoint
    Skipped,
    /// Preparation, capture or comparison error
    Failed {
        /// Error text
        message: String,
    },
}

impl Outcome {
    /// Counts as passed
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Captured { .. } | Self::Matched { .. })
    }

    /// Counts as failed
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Mismatch { .. } | Self::Failed { .. })
    }

    /// Short label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Captured { .. } => "captured",
            Self::Matched { .. } => "matched",
            Self::Mismatch { .. } => "mismatch",
            Self::Skipped => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// One scene on one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneResult {
    /// Profile name
    pub profile: String,
    /// Scene name
    pub scene: String,
    /// Snapshot file name
    pub file: String,
    /// Result of the last attempt
    pub outcome: Outcome,
    /// Attempts made
    pub attempts: u32,
    /// Time spent, all attempts
    pub duration: Duration,
}

/// Results of one suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Run identifier
    pub id: Uuid,
    /// Suite that ran
    pub plan: SuitePlan,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub finished_at: DateTime<Utc>,
    /// Results, profile order then scene order
    pub results: Vec<SceneResult>,
}

impl SuiteReport {
    /// Captured or matched
    #[must_use]
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_pass()).count()
    }

    /// Mismatched or errored
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_failure()).count()
    }

    /// Not applicable
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == Outcome::Skipped)
            .count()
    }

    /// Nothing failed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Results that failed
    pub fn failures(&self) -> impl Iterator<Item = &SceneResult> {
        self.results.iter().filter(|r| r.outcome.is_failure())
    }

    /// Pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns serialization errors.
    pub fn to_json(&self) -> SiteResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} passed, {} failed, {} skipped",
            self.plan.name,
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// Runs suites with drivers from `F`
#[derive(Debug)]
pub struct SuiteRunner<F> {
    factory: Arc<F>,
    config: Arc<SnapConfig>,
    roster: Arc<Roster>,
    store: SnapshotStore,
    comparator: SnapshotComparator,
}

impl<F> Clone for SuiteRunner<F> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            config: Arc::clone(&self.config),
            roster: Arc::clone(&self.roster),
            store: self.store.clone(),
            comparator: self.comparator.clone(),
        }
    }
}

impl<F: DriverFactory + 'static> SuiteRunner<F> {
    /// Runner over `config`
    #[must_use]
    pub fn new(factory: F, config: SnapConfig, roster: Roster) -> Self {
        let store = SnapshotStore::new(&config.snapshot_dir, &config.diff_dir);
        let comparator = SnapshotComparator::new(config.compare());
        Self {
            factory: Arc::new(factory),
            config: Arc::new(config),
            roster: Arc::new(roster),
            store,
            comparator,
        }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// Snapshot storage
    #[must_use]
    pub const fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run `plan` on every configured profile concurrently.
    ///
    /// # Errors
    ///
    /// Returns configuration errors (including a plan that touches the
    /// alternate export while it is disabled) and driver start-up failures;
    /// scene errors are reported as [`Outcome::Failed`].
    pub async fn run(&self, plan: &SuitePlan) -> SiteResult<SuiteReport> {
        if let Some(target) = plan.targets().into_iter().find(|t| !self.config.allows(*t)) {
            return Err(SiteError::config(format!(
                "suite `{}` uses the {target} page, which is disabled; set ENABLE_BASELINE2=1 or `baseline2: true`",
                plan.name
            )));
        }
        let profiles = self.config.device_profiles()?;
        let started_at = Utc::now();
        info!(suite = %plan.name, profiles = profiles.len(), "suite started");

        let mut tasks = JoinSet::new();
        for (order, profile) in profiles.into_iter().enumerate() {
            let runner = self.clone();
            let plan = plan.clone();
            tasks.spawn(async move {
                let results = runner.run_profile(&plan, &profile).await;
                (order, results)
            });
        }

        let mut per_profile = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (order, results) =
                joined.map_err(|e| SiteError::driver(format!("profile task failed: {e}")))?;
            per_profile.push((order, results?));
        }
        per_profile.sort_by_key(|(order, _)| *order);

        let report = SuiteReport {
            id: Uuid::new_v4(),
            plan: plan.clone(),
            started_at,
            finished_at: Utc::now(),
            results: per_profile.into_iter().flat_map(|(_, r)| r).collect(),
        };
        info!(%report, "suite finished");
        Ok(report)
    }

    /// Run `plan` on one profile.
    ///
    /// # Errors
    ///
    /// Returns an error when the driver cannot be created.
    pub async fn run_profile(&self, plan: &SuitePlan, profile: &DeviceProfile) -> SiteResult<Vec<SceneResult>> {
        let mut driver = self.factory.create(profile).await?;
        let url = self.config.url(plan.target.path());
        let breakpoint = profile.breakpoint();
        let mut results = Vec::new();

        for scene in Scene::all(&self.roster) {
            let file = scene.file_name(plan.target.prefix());
            if !scene.applies_to(breakpoint) {
                results.push(SceneResult {
                    profile: profile.name.clone(),
                    scene: scene.name.clone(),
                    file,
                    outcome: Outcome::Skipped,
                    attempts: 0,
                    duration: Duration::ZERO,
                });
                continue;
            }

            let started = Instant::now();
            let mut attempts = 0;
            let outcome = loop {
                attempts += 1;
                let outcome = self
                    .attempt(driver.as_mut(), plan, profile, &scene, &url)
                    .await
                    .unwrap_or_else(|e| Outcome::Failed {
                        message: e.to_string(),
                    });
                if !outcome.is_failure() || attempts > self.config.retries {
                    break outcome;
                }
                warn!(scene = %scene.name, profile = %profile.name, attempts, "retrying scene");
            };
            debug!(scene = %scene.name, profile = %profile.name, outcome = outcome.label(), "scene done");
            results.push(SceneResult {
                profile: profile.name.clone(),
                scene: scene.name.clone(),
                file,
                outcome,
                attempts,
                duration: started.elapsed(),
            });
        }

        driver.close().await?;
        Ok(results)
    }

    async fn attempt(
        &self,
        driver: &mut dyn PageDriver,
        plan: &SuitePlan,
        profile: &DeviceProfile,
        scene: &Scene,
        url: &str,
    ) -> SiteResult<Outcome> {
        let png = scene
            .capture(driver, &self.roster, url, self.config.settle_ms)
            .await?;
        let file = scene.file_name(plan.target.prefix());
        let path = self.store.write(&profile.name, &file, &png)?;

        let SuiteMode::Compare { against } = plan.mode else {
            return Ok(Outcome::Captured { path });
        };
        let expected_file = scene.file_name(against.prefix());
        if !self.store.exists(&profile.name, &expected_file) {
            if self.config.update {
                let path = self.store.write(&profile.name, &expected_file, &png)?;
                return Ok(Outcome::Captured { path });
            }
            return Err(SiteError::SnapshotMissing {
                path: self.store.path(&profile.name, &expected_file).display().to_string(),
            });
        }

        let expected = self.store.read(&profile.name, &expected_file)?;
        let diff = self.comparator.compare(&png, &expected)?;
        if diff.matches {
            return Ok(Outcome::Matched {
                ratio: diff.diff_ratio,
            });
        }
        if self.config.update {
            let path = self.store.write(&profile.name, &expected_file, &png)?;
            return Ok(Outcome::Captured { path });
        }
        let diff_path = match &diff.diff_image {
            Some(bytes) => Some(self.store.write_diff(&profile.name, &file, bytes)?),
            None => None,
        };
        Ok(Outcome::Mismatch {
            ratio: diff.diff_ratio,
            limit: self.comparator.config().max_diff_pixel_ratio,
            diff: diff_path,
        })
    }
}
