//! Capture, compare and run command handlers

use crate::commands::{CaptureArgs, CompareArgs, RunAllArgs, RunArgs};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use sdt_site::harness::{
    DriverFactory, SimulatedFactory, SnapConfig, SuitePlan, SuiteReport, SuiteRunner, Target,
};
use sdt_site::Roster;
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Execute the capture command
pub fn execute_capture(
    config_path: &Path,
    args: &CaptureArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<SuiteReport> {
    let config = resolve_config(config_path, &args.run)?;
    let plan = SuitePlan::capture(args.target.into());
    single(run_plans(config, &[plan], &args.run, reporter)?)
}

/// Execute the compare command
pub fn execute_compare(
    config_path: &Path,
    args: &CompareArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<SuiteReport> {
    let target = Target::from(args.target);
    let against = Target::from(args.against);
    if target == against {
        return Err(CliError::invalid_argument(format!(
            "cannot compare {target} against itself"
        )));
    }

    let config = comparing(
        resolve_config(config_path, &args.run)?,
        args.update,
        args.max_diff_pixel_ratio,
    )?;
    let plan = SuitePlan::compare(target, against);
    single(run_plans(config, &[plan], &args.run, reporter)?)
}

/// Execute the run command: every standard suite, in order
pub fn execute_run(
    config_path: &Path,
    args: &RunAllArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<Vec<SuiteReport>> {
    let config = comparing(
        resolve_config(config_path, &args.run)?,
        args.update,
        args.max_diff_pixel_ratio,
    )?;
    let plans = SuitePlan::standard(&config);
    if !config.baseline2 {
        reporter.info("baseline2 suites skipped (set ENABLE_BASELINE2=1 to run them)");
    }
    run_plans(config, &plans, &args.run, reporter)
}

/// Load the config file, apply the environment, then the flags in `run`
pub fn resolve_config(config_path: &Path, run: &RunArgs) -> CliResult<SnapConfig> {
    let mut config = SnapConfig::load(config_path)?.with_env();
    if let Some(url) = &run.base_url {
        config.base_url.clone_from(url);
    }
    if let Some(dir) = &run.snapshot_dir {
        config.snapshot_dir.clone_from(dir);
    }
    if let Some(dir) = &run.diff_dir {
        config.diff_dir.clone_from(dir);
    }
    if !run.profile.is_empty() {
        config.profiles.clone_from(&run.profile);
    }
    if let Some(retries) = run.retries {
        config.retries = retries;
    }
    if let Some(ms) = run.settle_ms {
        config.settle_ms = ms;
    }
    if run.chromium_path.is_some() {
        config.chromium_path.clone_from(&run.chromium_path);
    }
    config.validate()?;
    debug!(?config, "resolved configuration");
    Ok(config)
}

fn comparing(mut config: SnapConfig, update: bool, ratio: Option<f64>) -> CliResult<SnapConfig> {
    config.update |= update;
    if let Some(ratio) = ratio {
        config.max_diff_pixel_ratio = ratio;
    }
    config.validate()?;
    Ok(config)
}

fn single(mut reports: Vec<SuiteReport>) -> CliResult<SuiteReport> {
    reports
        .pop()
        .ok_or_else(|| CliError::runtime("no suite was run"))
}

fn run_plans(
    config: SnapConfig,
    plans: &[SuitePlan],
    run: &RunArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<Vec<SuiteReport>> {
    let rt = Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create runtime: {e}")))?;
    let roster = Roster::builtin()?;

    let reports = if run.simulate {
        let runner = SuiteRunner::new(SimulatedFactory::new(config.timings), config, roster);
        run_each(&rt, &runner, plans, run, reporter)?
    } else {
        run_in_browser(&rt, config, roster, plans, run, reporter)?
    };

    if let Some(path) = &run.report {
        write_report(path, &reports)?;
    }
    if run.json {
        println!("{}", reports_json(&reports)?);
    }

    let failed: usize = reports.iter().map(SuiteReport::failed).sum();
    if failed == 0 {
        Ok(reports)
    } else {
        Err(CliError::SuiteFailed {
            failed,
            total: reports.iter().map(|r| r.results.len()).sum(),
        })
    }
}

fn run_each<F: DriverFactory + 'static>(
    rt: &Runtime,
    runner: &SuiteRunner<F>,
    plans: &[SuitePlan],
    run: &RunArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<Vec<SuiteReport>> {
    let mut reports = Vec::with_capacity(plans.len());
    for plan in plans {
        info!(suite = %plan.name, simulate = run.simulate, "running suite");
        reporter.start_spinner(&plan.name);
        let report = rt.block_on(runner.run(plan));
        reporter.finish();
        let report = report?;

        if !run.json {
            reporter.header(&plan.name);
            reporter.scene_results(&report);
        }
        reporter.summary(&report);
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(feature = "browser")]
fn run_in_browser(
    rt: &Runtime,
    config: SnapConfig,
    roster: Roster,
    plans: &[SuitePlan],
    run: &RunArgs,
    reporter: &mut ProgressReporter,
) -> CliResult<Vec<SuiteReport>> {
    use sdt_site::harness::{CdpFactory, CdpOptions};

    let options = CdpOptions {
        base_url: config.base_url.clone(),
        chromium_path: config.chromium_path.clone(),
        headed: run.headed,
    };
    let runner = SuiteRunner::new(CdpFactory::new(options), config, roster);
    run_each(rt, &runner, plans, run, reporter)
}

#[cfg(not(feature = "browser"))]
fn run_in_browser(
    _rt: &Runtime,
    _config: SnapConfig,
    _roster: Roster,
    _plans: &[SuitePlan],
    _run: &RunArgs,
    _reporter: &mut ProgressReporter,
) -> CliResult<Vec<SuiteReport>> {
    Err(CliError::invalid_argument(
        "sdt-snap was built without the `browser` feature; rerun with --simulate",
    ))
}

/// One suite as an object, several as an array
fn reports_json(reports: &[SuiteReport]) -> CliResult<String> {
    Ok(match reports {
        [report] => report.to_json()?,
        _ => serde_json::to_string_pretty(reports)?,
    })
}

fn write_report(path: &Path, reports: &[SuiteReport]) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, reports_json(reports)?)?;
    debug!(path = %path.display(), "report written");
    Ok(())
}
