//! Environment overrides for tests that exercise config lookup
//!
//! Both guards point a directory variable at a fresh temporary directory and
//! put the previous value back when dropped.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use jirrit_core::config::CONFIG_FILE_NAME;
use tempfile::TempDir;

/// Sets one variable to a temporary directory until dropped
struct VarOverride {
  name: &'static str,
  original: Option<OsString>,
  dir: TempDir,
}

impl VarOverride {
  fn new(name: &'static str) -> Self {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let original = env::var_os(name);
    unsafe {
      env::set_var(name, dir.path());
    }
    Self { name, original, dir }
  }
}

impl Drop for VarOverride {
  fn drop(&mut self) {
    match self.original.take() {
      Some(value) => unsafe {
        env::set_var(self.name, value);
      },
      None => unsafe {
        env::remove_var(self.name);
      },
    }
  }
}

/// Points `XDG_CONFIG_HOME` at a temporary directory
pub struct EnvTestGuard {
  config_home: VarOverride,
}

impl Default for EnvTestGuard {
  fn default() -> Self {
    Self::new()
  }
}

impl EnvTestGuard {
  pub const XDG_CONFIG_HOME: &'static str = "XDG_CONFIG_HOME";

  pub fn new() -> Self {
    let config_home = VarOverride::new(Self::XDG_CONFIG_HOME);
    std::fs::create_dir_all(config_home.dir.path().join("jirrit")).expect("Failed to create config directory");
    Self { config_home }
  }

  /// The overridden `XDG_CONFIG_HOME`
  pub fn config_dir(&self) -> &Path {
    self.config_home.dir.path()
  }

  /// Directory jirrit resolves as its platform config directory
  pub fn jirrit_config_dir(&self) -> PathBuf {
    self.config_dir().join("jirrit")
  }

  /// Config file path inside [`EnvTestGuard::jirrit_config_dir`]
  pub fn config_path(&self) -> PathBuf {
    self.jirrit_config_dir().join(CONFIG_FILE_NAME)
  }
}

/// Points `HOME` at a temporary directory, so lookups never see the
/// developer's own `~/jirrit.xml`
pub struct HomeEnvTestGuard {
  home: VarOverride,
}

impl Default for HomeEnvTestGuard {
  fn default() -> Self {
    Self::new()
  }
}

impl HomeEnvTestGuard {
  pub fn new() -> Self {
    Self {
      home: VarOverride::new("HOME"),
    }
  }

  pub fn home_dir(&self) -> &Path {
    self.home.dir.path()
  }

  /// Config file path directly under HOME
  pub fn config_path(&self) -> PathBuf {
    self.home_dir().join(CONFIG_FILE_NAME)
  }
}
