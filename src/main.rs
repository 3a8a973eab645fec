use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "finsight")]
#[command(version, about = "Multi-agent financial analysis orchestrator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Analysis service base URL. Overrides finsight.toml and FINSIGHT_BASE_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run research, analysis and recommendation for a query and print the report
    Run {
        query: String,

        /// Write the plain-text report; optional file or directory
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        export: Option<PathBuf>,

        /// Print the final run as JSON instead of the rendered report
        #[arg(long, conflicts_with = "raw")]
        json: bool,

        /// Print the report text without rendering
        #[arg(long)]
        raw: bool,
    },
    /// List the analysis stages
    Stages,
    /// Show stage transitions of the last run
    Status,
    /// Clear the recorded run history
    Reset {
        #[arg(long)]
        force: bool,
    },
    /// Parse a text file and print it as a structured document
    Render {
        file: PathBuf,

        /// Include the table of contents
        #[arg(long)]
        toc: bool,
    },
    /// Check that the analysis service is reachable
    Health,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default finsight.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Run {
            query,
            export,
            json,
            raw,
        } => {
            let opts = cmd::RunOptions {
                export: export.clone(),
                json: *json,
                raw: *raw,
            };
            cmd::cmd_run(&cli, &project_dir, query, &opts).await?
        }
        Commands::Stages => cmd::cmd_stages(&project_dir)?,
        Commands::Status => cmd::cmd_status(&project_dir)?,
        Commands::Reset { force } => cmd::cmd_reset(&project_dir, *force)?,
        Commands::Render { file, toc } => cmd::cmd_render(file, *toc)?,
        Commands::Health => cmd::cmd_health(&cli, &project_dir).await?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
