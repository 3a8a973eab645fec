//! Configuration view and validation commands: `finsight config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use finsight::config::{CONFIG_DIR, CONFIG_FILE, Config, FinsightToml};

    let config_dir = project_dir.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("finsight Configuration");
            println!("======================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                FinsightToml::load(&config_path)?
            } else {
                println!("No finsight.toml found at {}", config_path.display());
                println!("Using default configuration.");
                FinsightToml::default()
            };
            println!();

            println!("[service]");
            println!("  base_url = \"{}\"", toml.service.base_url);
            println!("  stage_path = \"{}\"", toml.service.stage_path);
            println!("  report_path = \"{}\"", toml.service.report_path);
            println!("  health_path = \"{}\"", toml.service.health_path);
            println!("  timeout_secs = {}", toml.service.timeout_secs);
            println!();
            println!("[report]");
            println!("  title = \"{}\"", toml.report.title);
            println!("  export_dir = \"{}\"", toml.report.export_dir);
            println!();
            println!("[logging]");
            println!("  level = \"{}\"", toml.logging.level);
            println!("  json = {}", toml.logging.json);
            println!("  file = {}", toml.logging.file);
            println!();

            // Show effective values (including env overrides)
            let config = Config::new(project_dir.to_path_buf())?;
            let endpoints = config.endpoints();
            println!("Effective values (with env overrides):");
            println!("  base_url = \"{}\"", endpoints.base_url);
            println!("  timeout_secs = {}", endpoints.timeout.as_secs());
            println!(
                "  synthesis = {}",
                if endpoints.report_path.is_some() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("  log_level = \"{}\"", config.log_filter());
            println!();

            if !config_path.exists() {
                println!("Run 'finsight config init' to create a finsight.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = Config::new(project_dir.to_path_buf())?;
            if !config_path.exists() {
                println!("No finsight.toml found. Using defaults.");
            }

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("finsight.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config_dir.exists() {
                std::fs::create_dir_all(&config_dir)?;
            }

            let toml = FinsightToml::default();
            toml.save(&config_path)?;

            println!("Created finsight.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [service] base_url, endpoint paths, timeout_secs");
            println!("  - [report] title, export_dir");
            println!("  - [logging] level, json, file");
            println!();
        }
    }

    Ok(())
}
