//! sdt-snap CLI library
//!
//! Command-line front end for the SD&T Law visual regression harness in
//! `sdt-site`: capture snapshot suites, compare them against stored
//! snapshots, and inspect scenes, device profiles and configuration.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    CaptureArgs, Cli, ColorArg, Commands, CompareArgs, ConfigArgs, ProfilesArgs, RunAllArgs,
    RunArgs, ScenesArgs, TargetArg,
};
pub use config::{ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{describe, ProgressReporter};
