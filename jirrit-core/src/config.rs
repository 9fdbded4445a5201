//! # Configuration Management
//!
//! Loads and saves the XML configuration file and resolves where it lives:
//! an explicit path, the working directory, the home directory, or the
//! platform config directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::server::{PasswordBlock, ServerDescriptor};

/// File name looked up in each candidate directory
pub const CONFIG_FILE_NAME: &str = "jirrit.xml";

/// Default log file name when verbose logging has no configured path
pub const DEFAULT_LOG_NAME: &str = "jirrit.log";

/// Represents the configuration directories for the jirrit application
#[derive(Debug, Clone)]
pub struct ConfigDirs {
  pub config_dir: PathBuf,
}

impl ConfigDirs {
  /// Create a new ConfigDirs instance
  pub fn new() -> Result<Self> {
    let proj_dirs = ProjectDirs::from("", "", "jirrit").context("Failed to determine project directories")?;

    Ok(Self {
      config_dir: proj_dirs.config_dir().to_path_buf(),
    })
  }

  /// Get the config directory
  pub fn config_dir(&self) -> &PathBuf {
    &self.config_dir
  }

  /// Path of the config file inside the config directory
  pub fn config_path(&self) -> PathBuf {
    self.config_dir.join(CONFIG_FILE_NAME)
  }
}

/// Self-update polling settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSettings {
  /// Days between checks; 0 disables checking
  #[serde(default)]
  pub interval: u32,
  /// RFC 3339 time of the last check
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub previous: String,
  /// Where the latest version tag is published
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub url: String,
}

/// Root of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "jirrit")]
pub struct AppConfig {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub log: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub user: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pass: Option<PasswordBlock>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub appup: Option<UpdateSettings>,
  #[serde(rename = "server", default)]
  pub servers: Vec<ServerDescriptor>,
}

impl AppConfig {
  /// Parse configuration XML
  pub fn from_xml(xml: &str) -> Result<Self> {
    quick_xml::de::from_str(xml).context("Failed to parse configuration XML")
  }

  /// Render configuration XML
  pub fn to_xml(&self) -> Result<String> {
    let mut buffer = String::new();
    let mut serializer =
      quick_xml::se::Serializer::with_root(&mut buffer, Some("jirrit")).context("Failed to start XML writer")?;
    serializer.indent(' ', 2);
    self.serialize(serializer).context("Failed to serialize configuration")?;
    buffer.push('\n');
    Ok(buffer)
  }

  /// Find a server by name
  pub fn server(&self, name: &str) -> Option<&ServerDescriptor> {
    self.servers.iter().find(|server| server.name == name)
  }
}

/// Candidate config locations, most specific first
pub fn candidate_paths(cwd: Option<&Path>, home: Option<&Path>, config_dir: Option<&Path>) -> Vec<PathBuf> {
  [cwd, home, config_dir]
    .into_iter()
    .flatten()
    .map(|dir| dir.join(CONFIG_FILE_NAME))
    .collect()
}

/// Resolve the configuration file path.
///
/// An explicit path is used as given. Otherwise the first existing candidate
/// wins; if none exists the platform config path is returned so a new file
/// can be created there.
pub fn locate_config(explicit: Option<&Path>) -> Result<PathBuf> {
  if let Some(path) = explicit {
    return Ok(path.to_path_buf());
  }

  let cwd = std::env::current_dir().ok();
  let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
  let dirs = ConfigDirs::new()?;
  let candidates = candidate_paths(cwd.as_deref(), home.as_deref(), Some(dirs.config_dir()));

  match candidates.iter().find(|path| path.is_file()) {
    Some(found) => Ok(found.clone()),
    None => Ok(dirs.config_path()),
  }
}

/// Load configuration from `path`
pub fn load_config(path: &Path) -> Result<AppConfig> {
  debug!("Loading configuration from {}", path.display());
  let content =
    fs::read_to_string(path).with_context(|| format!("Failed to read configuration from {}", path.display()))?;
  AppConfig::from_xml(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
}

/// Save configuration to `path`, creating parent directories
pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {}", parent.display()))?;
  }
  let xml = config.to_xml()?;
  fs::write(path, xml).with_context(|| format!("Failed to write configuration to {}", path.display()))
}
