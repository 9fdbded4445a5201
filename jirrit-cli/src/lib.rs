//! # Jirrit CLI Library
//!
//! Flag parsing, the per-category action catalog, dispatch onto the service
//! adapters, result rendering and the interactive session driver behind the
//! `jirrit` binary.

pub mod catalog;
pub mod cli;
pub mod consts;
pub mod dispatch;
pub mod driver;
pub mod logging;
pub mod render;
pub mod servers;
pub mod update;

use chrono::DateTime;
use jirrit_core::ActionError;

/// Version, commit, build time and target of this binary
pub fn version_info() -> String {
  let commit = option_env!("GIT_HASH").filter(|hash| !hash.is_empty()).unwrap_or("unknown");
  let built = option_env!("BUILD_TIMESTAMP")
    .and_then(|stamp| stamp.parse::<i64>().ok())
    .and_then(|secs| DateTime::from_timestamp(secs, 0))
    .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    .unwrap_or_else(|| "unknown".to_string());
  let target = option_env!("TARGET").filter(|target| !target.is_empty()).unwrap_or("unknown");
  format!(
    "jirrit {} (commit {}, built {}, {})",
    env!("CARGO_PKG_VERSION"),
    commit,
    built,
    target
  )
}

/// Process exit code for an error that ended the run.
///
/// The first [`ActionError`] in the chain decides; anything else is a
/// configuration-level failure.
pub fn exit_code_of(err: &anyhow::Error) -> u8 {
  err
    .chain()
    .find_map(|cause| cause.downcast_ref::<ActionError>())
    .map(ActionError::exit_code)
    .and_then(|code| u8::try_from(code).ok())
    .unwrap_or(1)
}

#[cfg(test)]
mod tests {
  use anyhow::Context;
  use jirrit_core::RestError;

  use super::*;

  #[test]
  fn test_version_info_names_the_package() {
    let info = version_info();
    assert!(info.starts_with(&format!("jirrit {}", env!("CARGO_PKG_VERSION"))));
    assert!(info.contains("commit "));
  }

  #[test]
  fn test_exit_code_looks_through_context() {
    let err = anyhow::Error::from(ActionError::invalid_input("id")).context("running show details");
    assert_eq!(exit_code_of(&err), 4);

    let auth: anyhow::Result<()> = Err(ActionError::from(RestError::Auth {
      status: 401,
      body: String::new(),
    }))
    .context("listing");
    assert_eq!(auth.map_err(|err| exit_code_of(&err)), Err(2));

    assert_eq!(exit_code_of(&anyhow::anyhow!("broken config")), 1);
  }
}
