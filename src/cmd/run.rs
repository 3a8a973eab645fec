//! End-to-end analysis run: `finsight run` and `finsight health`.

use anyhow::{Context, Result, bail};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::super::Cli;
use finsight::config::Config;
use finsight::document::{
    RenderOptions, ReportMeta, TerminalStyle, render_report, resolve_export_path, write_report,
};
use finsight::errors::WorkflowError;
use finsight::service::HttpAnalysisService;
use finsight::stage::load_stages_or_default;
use finsight::ui::WorkflowUI;
use finsight::ui::icons::REPORT;
use finsight::workflow::{StateManager, WorkflowController, WorkflowRun};

pub struct RunOptions {
    /// `Some("")` means "export to the configured directory"
    pub export: Option<PathBuf>,
    pub json: bool,
    pub raw: bool,
}

fn load_config(cli: &Cli, project_dir: &Path) -> Result<Config> {
    let config = Config::with_cli_args(project_dir.to_path_buf(), cli.verbose, cli.base_url.clone())?;
    config.ensure_directories()?;
    Ok(config)
}

fn print_json(run: &WorkflowRun) -> Result<()> {
    let json = serde_json::to_string_pretty(run).context("Failed to serialize run")?;
    println!("{}", json);
    Ok(())
}

pub async fn cmd_run(cli: &Cli, project_dir: &Path, query: &str, opts: &RunOptions) -> Result<()> {
    let config = load_config(cli, project_dir)?;
    let _guard = super::init_logging_for(&config)?;
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let stages = load_stages_or_default(Some(config.stages_file().as_path()))?;
    let service = Arc::new(HttpAnalysisService::new(config.endpoints())?);
    let ui = Arc::new(if opts.json {
        WorkflowUI::hidden()
    } else {
        WorkflowUI::new(stages.len() as u64, cli.verbose)
    });
    let state = Arc::new(StateManager::new(config.state_file()));

    let mut controller = WorkflowController::for_service(service, stages.clone())
        .with_title(config.report_title())
        .with_observer(ui.clone())
        .with_observer(state);

    if !opts.json {
        ui.print_header(query.trim());
    }

    let run = match controller.run(query).await {
        Ok(run) => run,
        Err(WorkflowError::EmptyQuery) => bail!("Query is required"),
        Err(e) => {
            if opts.json {
                print_json(&controller.snapshot())?;
            }
            return Err(e.into());
        }
    };

    let Some(report) = run.final_report() else {
        bail!("Run finished without a report");
    };

    if opts.json {
        print_json(&run)?;
    } else if opts.raw {
        println!("{}", report.text);
    } else {
        let meta = ReportMeta {
            title: config.report_title().to_string(),
            query: run.query().to_string(),
            team: stages.iter().map(|s| s.name.clone()).collect(),
            generated_at: report.generated_at,
        };
        let rendered = render_report(
            &meta,
            &report.document(),
            &TerminalStyle,
            &RenderOptions::for_terminal(),
        );
        println!("{}", rendered);
    }

    if let Some(target) = &opts.export {
        let target = (!target.as_os_str().is_empty()).then_some(target.as_path());
        let path = resolve_export_path(target, &config.export_dir(), report.generated_at);
        write_report(&path, &report.text)?;
        if !opts.json {
            println!("{}{} {}", REPORT, style("Report exported to").green(), path.display());
        }
    }

    Ok(())
}

pub async fn cmd_health(cli: &Cli, project_dir: &Path) -> Result<()> {
    let config = load_config(cli, project_dir)?;
    let _guard = super::init_logging_for(&config)?;

    let service = HttpAnalysisService::new(config.endpoints())?;
    let url = service.endpoints().health_url();
    match service.health().await {
        Ok(status) => {
            println!("{} {} ({})", style("Service:").bold(), style(&status).green(), url);
            if status != "healthy" {
                bail!("Service reported status '{}'", status);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} {} ({})", style("Service:").bold(), style("unreachable").red(), url);
            Err(e).context("Health check failed")
        }
    }
}
