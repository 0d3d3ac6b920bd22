//! sdt-snap: SD&T Law site snapshot CLI
//!
//! Usage:
//!   sdt-snap capture --simulate          # baseline snapshots from the fixtures
//!   sdt-snap compare                     # current page against the baseline
//!   sdt-snap run --simulate              # every standard suite
//!   sdt-snap scenes --profile phone      # scenes captured on the phone profile

use clap::Parser;
use sdt_snap::{
    handlers, logging, Cli, CliResult, ColorChoice, Commands, ProgressReporter, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let use_color = ColorChoice::from(cli.color).should_color();
    logging::init(verbosity, use_color);

    let mut reporter = ProgressReporter::new(use_color, verbosity.is_quiet());

    match cli.command {
        Commands::Capture(args) => {
            handlers::execute_capture(&cli.config, &args, &mut reporter)?;
        }
        Commands::Compare(args) => {
            handlers::execute_compare(&cli.config, &args, &mut reporter)?;
        }
        Commands::Run(args) => {
            handlers::execute_run(&cli.config, &args, &mut reporter)?;
        }
        Commands::Scenes(args) => handlers::execute_scenes(&args)?,
        Commands::Profiles(args) => handlers::execute_profiles(&args)?,
        Commands::Config(args) => handlers::execute_config(&cli.config, &args)?,
    }
    Ok(())
}
