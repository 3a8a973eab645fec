//! Tracing subscriber setup for the `finsight` binary.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

pub const LOG_FILE: &str = "finsight.log";

#[derive(Debug, Clone)]
pub struct LogSettings<'a> {
    /// `EnvFilter` directive, e.g. `info` or `finsight=debug,reqwest=warn`
    pub filter: &'a str,
    pub json: bool,
    /// Directory for `finsight.log`; `None` logs to stderr only
    pub file_dir: Option<&'a Path>,
}

pub fn build_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive).with_context(|| format!("Invalid log filter '{}'", directive))
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process, or buffered
/// file output is lost.
pub fn init_logging(settings: &LogSettings<'_>) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(settings.filter)?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if settings.json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    let guard = match settings.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt::layer().with_ansi(false).with_writer(writer).boxed());
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_levels_and_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("finsight=debug,reqwest=warn").is_ok());
    }

    #[test]
    fn test_build_filter_rejects_bad_level() {
        let err = build_filter("finsight=shouty").unwrap_err();
        assert!(err.to_string().contains("finsight=shouty"));
    }
}
