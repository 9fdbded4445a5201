//! # Logging
//!
//! Tracing setup. Verbosity picks the level; the log goes to the file named
//! with `-l`, else the configured log file, else the default log file once
//! verbose output is asked for. Without any of those it goes to stderr.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use jirrit_core::config::DEFAULT_LOG_NAME;
use tracing::{Level, debug};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Tracing level for a `-v` count
pub const fn level_for(verbose: u8) -> Level {
  match verbose {
    0 => Level::WARN,
    1 => Level::INFO,
    2 => Level::DEBUG,
    _ => Level::TRACE,
  }
}

/// Where log lines are written, `None` meaning stderr
pub fn log_target(verbose: u8, flag: Option<&Path>, configured: &str) -> Option<PathBuf> {
  if let Some(path) = flag {
    return Some(path.to_path_buf());
  }
  if !configured.trim().is_empty() {
    return Some(PathBuf::from(configured.trim()));
  }
  (verbose > 0).then(|| PathBuf::from(DEFAULT_LOG_NAME))
}

/// Install the global subscriber
pub fn init(verbose: u8, flag: Option<&Path>, configured: &str) -> Result<()> {
  let level = level_for(verbose);
  let target = log_target(verbose, flag, configured);

  let file_layer = match &target {
    Some(path) => {
      let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
      Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
    }
    None => None,
  };
  let stderr_layer = target.is_none().then(|| fmt::layer().with_writer(std::io::stderr));

  tracing_subscriber::registry()
    .with(file_layer)
    .with(stderr_layer)
    .with(EnvFilter::from_default_env().add_directive(level.into()))
    .try_init()
    .context("Failed to initialize logging")?;

  debug!("Tracing initialized with level: {}", level);
  Ok(())
}
