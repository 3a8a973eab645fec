//! CLI command implementations.
//!
//! | Module    | Commands handled            |
//! |-----------|-----------------------------|
//! | `run`     | `Run`, `Health`             |
//! | `stages`  | `Stages`, `Status`, `Reset` |
//! | `render`  | `Render`                    |
//! | `config`  | `Config`                    |

pub mod config;
pub mod render;
pub mod run;
pub mod stages;

pub use config::cmd_config;
pub use render::cmd_render;
pub use run::{RunOptions, cmd_health, cmd_run};
pub use stages::{cmd_reset, cmd_stages, cmd_status};

use anyhow::Result;
use finsight::config::Config;
use finsight::logging::{LogSettings, init_logging};
use tracing_appender::non_blocking::WorkerGuard;

/// Install logging per the resolved config. Hold the guard until exit.
pub fn init_logging_for(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = config.log_filter();
    let log_dir = config.log_dir();
    init_logging(&LogSettings {
        filter: &filter,
        json: config.toml.logging.json,
        file_dir: config.toml.logging.file.then_some(log_dir.as_path()),
    })
}
