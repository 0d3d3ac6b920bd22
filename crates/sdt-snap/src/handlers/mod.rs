//! Command handlers - extracted from main.rs for testability

pub mod config;
pub mod run;
pub mod scenes;

pub use config::{effective_config, execute_config, init_config};
pub use run::{execute_capture, execute_compare, execute_run, resolve_config};
pub use scenes::{describe_profile, execute_profiles, execute_scenes, list_scenes};
