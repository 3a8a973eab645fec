//! Stage catalog and run history commands: `finsight stages`, `status`, `reset`.

use anyhow::Result;
use console::style;
use std::path::Path;

use finsight::config::Config;
use finsight::stage::load_stages_or_default;
use finsight::workflow::{StageStatus, StateManager};

pub fn cmd_stages(project_dir: &Path) -> Result<()> {
    let config = Config::new(project_dir.to_path_buf())?;
    let stages_file = config.stages_file();
    let stages = load_stages_or_default(Some(stages_file.as_path()))?;

    println!();
    println!("Analysis Stages");
    println!("===============");
    if stages_file.exists() {
        println!("Source: {}", stages_file.display());
    } else {
        println!("Source: built-in");
    }
    println!();

    for (i, stage) in stages.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            style(&stage.name).bold(),
            style(format!("[{}]", stage.id)).dim()
        );
        if !stage.description.is_empty() {
            println!("     {}", stage.description);
        }
        if !stage.capabilities.is_empty() {
            println!("     {}", style(stage.capabilities.join(", ")).dim());
        }
    }
    println!();
    Ok(())
}

pub fn cmd_status(project_dir: &Path) -> Result<()> {
    let config = Config::new(project_dir.to_path_buf())?;
    let state = StateManager::new(config.state_file());

    println!();
    println!("Run Status");
    println!("==========");
    println!();

    let Some(run_id) = state.last_run_id()? else {
        println!("No runs recorded.");
        println!();
        println!("Run 'finsight run \"<query>\"' to start an analysis.");
        println!();
        return Ok(());
    };

    let entries = state.get_run_entries(&run_id)?;
    println!("Last run: {}", run_id);
    if let Some(first) = entries.first() {
        println!("Started:  {}", first.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();

    // Latest status per stage, in first-seen order.
    let mut latest: Vec<(&str, StageStatus)> = Vec::new();
    for entry in &entries {
        match latest.iter_mut().find(|(id, _)| *id == entry.stage_id) {
            Some(slot) => slot.1 = entry.status,
            None => latest.push((entry.stage_id.as_str(), entry.status)),
        }
    }

    for (stage_id, status) in &latest {
        let label = match status {
            StageStatus::Completed => style(status.as_str()).green(),
            StageStatus::Failed => style(status.as_str()).red(),
            StageStatus::Running => style(status.as_str()).yellow(),
            StageStatus::Pending => style(status.as_str()).dim(),
        };
        println!("  {:<16} {}", stage_id, label);
    }
    println!();

    if let Some(failed) = state.last_failed_stage()? {
        println!("Result: failed at stage '{}'", failed);
    } else if latest.iter().any(|(_, s)| *s == StageStatus::Running) {
        println!("Result: interrupted");
    } else {
        println!("Result: all recorded stages completed");
    }
    println!();
    Ok(())
}

pub fn cmd_reset(project_dir: &Path, force: bool) -> Result<()> {
    use dialoguer::Confirm;

    let config = Config::new(project_dir.to_path_buf())?;

    if !force {
        let confirm = Confirm::new()
            .with_prompt("This will clear the recorded run history. Are you sure?")
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    let state = StateManager::new(config.state_file());
    state.reset()?;

    let log_dir = config.log_dir();
    if log_dir.exists() {
        std::fs::remove_dir_all(&log_dir).ok();
    }

    println!("Reset complete");
    Ok(())
}
