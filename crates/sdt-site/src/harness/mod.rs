//! Visual snapshot harness.
//!
//! Drives a page (simulated or Chromium) through the snapshot scenes at each
//! device profile, stores the captures and compares them against a stored
//! snapshot set.

#[cfg(feature = "browser")]
pub mod cdp;
pub mod config;
pub mod driver;
pub mod helpers;
pub mod scene;
pub mod suite;
pub mod visual;
pub mod wait;

#[cfg(feature = "browser")]
pub use cdp::{CdpDriver, CdpOptions};
pub use config::{SnapConfig, CONFIG_FILE, DEFAULT_BASE_URL};
pub use driver::{PageDriver, SimulatedDriver};
pub use scene::{Scene, SceneKind, Target};
#[cfg(feature = "browser")]
pub use suite::CdpFactory;
pub use suite::{
    DriverFactory, Outcome, SceneResult, SimulatedFactory, SuiteMode, SuitePlan, SuiteReport,
    SuiteRunner,
};
pub use visual::{CompareConfig, ImageDiff, SnapshotComparator, SnapshotStore};
pub use wait::WaitOptions;
