//! Logging setup.
//!
//! The TUI owns the terminal, so events go to a log file instead of stderr.
//! `SCHOOL_MANAGER_LOG` takes precedence over the configured filter.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "SCHOOL_MANAGER_LOG";

/// Install the global subscriber, appending to `log_path`. Calling this twice
/// is an error from `tracing_subscriber`, so `main` does it once at startup.
pub fn init(log_path: &Path, default_filter: &str) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}
