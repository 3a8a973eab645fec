use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::ui::icons::{CHECK, CROSS, RUNNING, SPARKLE, WARN};
use crate::workflow::{RunEvent, RunObserver, StageRecord, WorkflowRun};

/// Terminal progress for one workflow run, rendered via `indicatif`.
///
/// Two bars are stacked: the stage bar counts completed stages and the
/// spinner shows the stage currently running. Driven entirely by
/// [`RunEvent`]s, so it can be registered on a controller as an observer.
pub struct WorkflowUI {
    multi: MultiProgress,
    stage_bar: ProgressBar,
    spinner: ProgressBar,
    verbose: bool,
}

impl WorkflowUI {
    pub fn new(total_stages: u64, verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let stage_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let stage_bar = multi.add(ProgressBar::new(total_stages));
        stage_bar.set_style(stage_style);
        stage_bar.set_prefix("Stages");

        let spinner_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg} {elapsed:.dim}")
            .expect("progress bar template is a valid static string");

        let spinner = multi.add(ProgressBar::new_spinner());
        spinner.set_style(spinner_style);
        spinner.set_prefix("   Now");

        Self {
            multi,
            stage_bar,
            spinner,
            verbose,
        }
    }

    /// Hidden UI for `--json`/non-interactive output.
    pub fn hidden() -> Self {
        let ui = Self::new(0, false);
        ui.multi
            .set_draw_target(indicatif::ProgressDrawTarget::hidden());
        ui
    }

    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn print_header(&self, query: &str) {
        self.print_line(format!("{}", style("═".repeat(60)).cyan()));
        self.print_line(format!(
            "{} {}",
            style("Analyzing:").green().bold(),
            style(query).yellow()
        ));
        self.print_line(format!("{}", style("═".repeat(60)).cyan()));
    }

    fn stage_started(&self, stage: &StageRecord) {
        self.stage_bar.set_message(format!("{}", style(stage.name()).yellow()));
        self.spinner.reset_elapsed();
        self.spinner.set_message(format!(
            "{}{} {}",
            RUNNING,
            stage.name(),
            style(format!("({})", stage.description())).dim()
        ));
        self.spinner.enable_steady_tick(Duration::from_millis(100));
    }

    fn stage_completed(&self, stage: &StageRecord) {
        self.stage_bar.inc(1);
        let secs = stage
            .duration()
            .map(|d| d.num_milliseconds() as f64 / 1000.0)
            .unwrap_or_default();
        self.print_line(format!(
            "  {}{} {}",
            CHECK,
            style(stage.name()).green(),
            style(format!(
                "({} chars, {:.1}s)",
                stage.output_length().unwrap_or_default(),
                secs
            ))
            .dim()
        ));
        if self.verbose
            && let Some(output) = stage.output()
        {
            let preview: String = output.chars().take(200).collect();
            self.print_line(format!("    {}", style(preview).dim()));
        }
    }

    fn stage_failed(&self, stage_name: &str, message: &str) {
        self.spinner.finish_and_clear();
        self.print_line(format!(
            "  {}{} failed: {}",
            CROSS,
            style(stage_name).red().bold(),
            message
        ));
    }

    fn finished(&self, degraded: bool) {
        self.spinner.finish_and_clear();
        self.stage_bar.finish_with_message(format!("{}", style("done").green()));
        if degraded {
            self.print_line(format!(
                "\n{}{}\n",
                WARN,
                style("Report synthesis unavailable; showing combined stage outputs").yellow()
            ));
        } else {
            self.print_line(format!("\n{}{}\n", SPARKLE, style("Report ready").green().bold()));
        }
    }

    fn aborted(&self) {
        self.spinner.finish_and_clear();
        self.stage_bar.abandon();
    }
}

impl RunObserver for WorkflowUI {
    fn observe(&self, event: &RunEvent, run: &WorkflowRun) {
        match event {
            RunEvent::RunStarted => self.stage_bar.set_length(run.stages().len() as u64),
            RunEvent::StageStarted { stage_id } => {
                if let Some(stage) = run.stage(stage_id) {
                    self.stage_started(stage);
                }
            }
            RunEvent::StageCompleted { stage_id } => {
                if let Some(stage) = run.stage(stage_id) {
                    self.stage_completed(stage);
                }
            }
            RunEvent::StageFailed { stage_id, message } => {
                let name = run
                    .stage(stage_id)
                    .map(|s| s.name())
                    .unwrap_or(stage_id.as_str());
                self.stage_failed(name, message);
            }
            RunEvent::ReportAssembled { degraded } => self.finished(*degraded),
            RunEvent::RunFailed { .. } | RunEvent::Reset => self.aborted(),
        }
    }
}
