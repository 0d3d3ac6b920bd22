//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use sdt_site::harness::{Target, CONFIG_FILE};
use std::path::PathBuf;

/// sdt-snap: capture and compare SD&T Law site snapshots across breakpoints
#[derive(Parser, Debug)]
#[command(name = "sdt-snap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorArg::Auto, global = true)]
    pub color: ColorArg,

    /// Configuration file
    #[arg(long, env = "SDT_SNAP_CONFIG", default_value = CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture snapshots of a target page
    Capture(CaptureArgs),

    /// Capture a target page and compare it with stored snapshots
    Compare(CompareArgs),

    /// Run the standard suites: baseline capture, then current against
    /// baseline, plus the baseline2 suites when ENABLE_BASELINE2=1
    Run(RunAllArgs),

    /// List snapshot scenes
    Scenes(ScenesArgs),

    /// List device profiles
    Profiles(ProfilesArgs),

    /// Show or initialise configuration
    Config(ConfigArgs),
}

/// Page a suite captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    /// Semantic rebuild at `/`
    Current,
    /// Page-builder export at `/_baseline/`
    Baseline,
    /// Alternate export at `/_baseline2/`
    Baseline2,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Current => Self::Current,
            TargetArg::Baseline => Self::Baseline,
            TargetArg::Baseline2 => Self::Baseline2,
        }
    }
}

/// Options shared by capture and compare
#[derive(Args, Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Base URL the site is served at
    #[arg(long, env = "SDT_BASE_URL")]
    pub base_url: Option<String>,

    /// Snapshot directory
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Diff image directory
    #[arg(long)]
    pub diff_dir: Option<PathBuf>,

    /// Profiles to run (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    pub profile: Vec<String>,

    /// Extra attempts per failing scene
    #[arg(long)]
    pub retries: Option<u32>,

    /// Settle time after fonts are ready, in milliseconds
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Run against the in-process site fixtures instead of Chromium
    #[arg(long)]
    pub simulate: bool,

    /// Chromium executable
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Write the JSON report here
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print the JSON report to stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the capture command
#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Page to capture
    #[arg(short, long, value_enum, default_value_t = TargetArg::Baseline)]
    pub target: TargetArg,

    /// Shared run options
    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the compare command
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Page to capture
    #[arg(short, long, value_enum, default_value_t = TargetArg::Current)]
    pub target: TargetArg,

    /// Snapshot set to compare against
    #[arg(short, long, value_enum, default_value_t = TargetArg::Baseline)]
    pub against: TargetArg,

    /// Write missing or mismatching snapshots instead of failing
    #[arg(short, long)]
    pub update: bool,

    /// Share of pixels allowed to differ (0.0-1.0)
    #[arg(long)]
    pub max_diff_pixel_ratio: Option<f64>,

    /// Shared run options
    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunAllArgs {
    /// Write missing or mismatching snapshots instead of failing
    #[arg(short, long)]
    pub update: bool,

    /// Share of pixels allowed to differ (0.0-1.0)
    #[arg(long)]
    pub max_diff_pixel_ratio: Option<f64>,

    /// Shared run options
    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the scenes command
#[derive(Args, Debug)]
pub struct ScenesArgs {
    /// Only scenes captured at this profile
    #[arg(short, long)]
    pub profile: Option<String>,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the profiles command
#[derive(Args, Debug)]
pub struct ProfilesArgs {
    /// JSON output
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print the effective configuration as YAML
    #[arg(long)]
    pub show: bool,

    /// Write a default configuration file
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file with --init
    #[arg(long)]
    pub force: bool,
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compare() {
        let cli = Cli::try_parse_from([
            "sdt-snap",
            "-vv",
            "compare",
            "--against",
            "baseline2",
            "--profile",
            "phone,desktop",
            "--simulate",
            "--update",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.target, TargetArg::Current);
        assert_eq!(Target::from(args.against), Target::Baseline2);
        assert_eq!(args.run.profile, vec!["phone", "desktop"]);
        assert!(args.run.simulate);
        assert!(args.update);
    }

    #[test]
    fn test_capture_defaults_to_baseline() {
        let cli = Cli::try_parse_from(["sdt-snap", "capture"]).unwrap();
        let Commands::Capture(args) = cli.command else {
            panic!("expected capture");
        };
        assert_eq!(args.target, TargetArg::Baseline);
        assert!(!args.run.simulate);
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["sdt-snap", "run", "--simulate", "-u"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.update);
        assert!(args.run.simulate);
    }

    #[test]
    fn test_unknown_target_rejected() {
        assert!(Cli::try_parse_from(["sdt-snap", "capture", "--target", "prod"]).is_err());
    }
}
