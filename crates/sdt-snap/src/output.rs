//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use sdt_site::harness::{Outcome, SceneResult, SuiteReport};
use std::time::Duration;

/// Progress reporter for suite runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a spinner while a suite runs
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Stop and clear the spinner
    pub fn finish(&mut self) {
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(self.prefix("✓", "PASS", &Style::new().green().bold()), message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // failures print even in quiet mode
        self.line(self.prefix("✗", "FAIL", &Style::new().red().bold()), message);
    }

    /// Print a skip message
    pub fn skipped(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(self.prefix("-", "SKIP", &Style::new().dim()), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(self.prefix("⚠", "WARN", &Style::new().yellow().bold()), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(self.prefix("ℹ", "INFO", &Style::new().blue().bold()), message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print one line per scene result
    pub fn scene_results(&self, report: &SuiteReport) {
        for result in &report.results {
            let message = describe(result);
            match result.outcome {
                Outcome::Captured { .. } | Outcome::Matched { .. } => self.success(&message),
                Outcome::Skipped => self.skipped(&message),
                Outcome::Mismatch { .. } | Outcome::Failed { .. } => self.failure(&message),
            }
        }
    }

    /// Print the suite summary
    pub fn summary(&self, report: &SuiteReport) {
        let failed = report.failed();
        if self.quiet && failed == 0 {
            return;
        }

        let passed = report.passed();
        let skipped = report.skipped();
        let total = report.results.len();
        let secs = (report.finished_at - report.started_at)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64();

        let _ = self.term.write_line("");
        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            let _ = self.term.write_line(&format!(
                "{status} {} {total} scenes in {secs:.2}s ({} passed, {} failed, {} skipped)",
                report.plan.name,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                Style::new().yellow().apply_to(skipped)
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {} {total} scenes in {secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)",
                report.plan.name
            ));
        }
    }

    fn prefix(&self, symbol: &str, word: &str, styled: &Style) -> String {
        if self.use_color {
            styled.apply_to(symbol).to_string()
        } else {
            word.to_string()
        }
    }

    fn line(&self, prefix: String, message: &str) {
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }
}

/// One-line description of a scene result
#[must_use]
pub fn describe(result: &SceneResult) -> String {
    let name = format!("{}/{}", result.profile, result.scene);
    match &result.outcome {
        Outcome::Captured { path } => format!("{name} captured {}", path.display()),
        Outcome::Matched { ratio } => format!("{name} matched ({:.3}% differ)", ratio * 100.0),
        Outcome::Mismatch { ratio, limit, diff } => {
            let mut text = format!(
                "{name} mismatch: {:.3}% differ, limit {:.3}%",
                ratio * 100.0,
                limit * 100.0
            );
            if let Some(diff) = diff {
                text.push_str(&format!(" (diff {})", diff.display()));
            }
            text
        }
        Outcome::Skipped => format!("{name} skipped at this breakpoint"),
        Outcome::Failed { message } if result.attempts > 1 => {
            format!("{name} failed after {} attempts: {message}", result.attempts)
        }
        Outcome::Failed { message } => format!("{name} failed: {message}"),
    }
}
