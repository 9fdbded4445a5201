//! # Update Check
//!
//! A background thread started with the session. When the configured interval
//! has passed since the previous check it fetches the published version and
//! compares it with this build; the session waits for it before exiting and
//! records when the check happened.

use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use jirrit_core::config::{AppConfig, UpdateSettings, save_config};
use jirrit_core::output::print_info;
use jirrit_core::rest::USER_AGENT;
use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::consts::UPDATE_TIMEOUT_SECS;

/// How a check ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
  /// Disabled, or the interval has not passed
  NotDue,
  UpToDate,
  /// A newer version is published
  Available(String),
  Failed(String),
}

/// Whether a check is due at `now`
pub fn is_due(settings: &UpdateSettings, now: DateTime<Utc>) -> bool {
  if settings.interval == 0 || settings.url.trim().is_empty() {
    return false;
  }
  match DateTime::parse_from_rfc3339(settings.previous.trim()) {
    Ok(previous) => now.signed_duration_since(previous) > TimeDelta::days(i64::from(settings.interval)),
    Err(_) => true,
  }
}

fn version_parts(version: &str) -> Vec<u64> {
  version
    .trim()
    .trim_start_matches('v')
    .split(['.', '-', '+'])
    .map_while(|part| part.parse().ok())
    .collect()
}

/// Whether `candidate` is a later dotted version than `current`
pub fn is_newer(candidate: &str, current: &str) -> bool {
  let candidate = version_parts(candidate);
  !candidate.is_empty() && candidate > version_parts(current)
}

/// Fetch the published version: the first non-empty line at `url`
fn probe(url: &str) -> Result<String> {
  let client = Client::builder()
    .user_agent(USER_AGENT)
    .timeout(Duration::from_secs(UPDATE_TIMEOUT_SECS))
    .build()
    .context("Failed to construct HTTP client")?;
  let body = client
    .get(url)
    .send()
    .with_context(|| format!("Failed to reach {}", url))?
    .error_for_status()
    .context("Update server refused the request")?
    .text()
    .context("Failed to read the published version")?;
  body
    .lines()
    .map(str::trim)
    .find(|line| !line.is_empty())
    .map(|line| line.trim_start_matches('v').to_string())
    .context("The published version is empty")
}

fn check(url: &str) -> UpdateStatus {
  match probe(url) {
    Ok(latest) if is_newer(&latest, env!("CARGO_PKG_VERSION")) => UpdateStatus::Available(latest),
    Ok(latest) => {
      debug!("Published version {} is not newer", latest);
      UpdateStatus::UpToDate
    }
    Err(err) => UpdateStatus::Failed(format!("{:#}", err)),
  }
}

/// A running or skipped check
#[derive(Debug)]
pub struct UpdateCheck {
  handle: Option<JoinHandle<UpdateStatus>>,
}

impl UpdateCheck {
  /// Start a check when one is due
  pub fn start(settings: Option<&UpdateSettings>) -> Self {
    let Some(settings) = settings.filter(|settings| is_due(settings, Utc::now())) else {
      return Self { handle: None };
    };

    let url = settings.url.trim().to_string();
    debug!("Checking {} for updates", url);
    let handle = thread::Builder::new()
      .name("update-check".to_string())
      .spawn(move || check(&url));
    match handle {
      Ok(handle) => Self { handle: Some(handle) },
      Err(err) => {
        debug!("Could not start the update check: {}", err);
        Self { handle: None }
      }
    }
  }

  /// Wait for the check to finish
  pub fn wait(self) -> UpdateStatus {
    match self.handle {
      None => UpdateStatus::NotDue,
      Some(handle) => handle
        .join()
        .unwrap_or_else(|_| UpdateStatus::Failed("the update check panicked".to_string())),
    }
  }
}

/// Report a finished check and store when it happened
pub fn record_check(config: &mut AppConfig, path: &Path, status: &UpdateStatus) -> Result<()> {
  if let UpdateStatus::Available(version) = status {
    print_info(&format!(
      "jirrit {} is available (this is {})",
      version,
      env!("CARGO_PKG_VERSION")
    ));
  }
  let Some(settings) = config.appup.as_mut().filter(|settings| settings.interval > 0) else {
    return Ok(());
  };
  settings.previous = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
  info!("Update checked at {}", settings.previous);
  save_config(path, config)
}
