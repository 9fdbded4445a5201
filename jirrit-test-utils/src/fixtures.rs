//! Server, credential and configuration fixtures
//!
//! Adapter tests point a [`ServerDescriptor`] at a wiremock server and talk to
//! it with the fixed credentials below.

use std::path::{Path, PathBuf};

use jirrit_core::config::{AppConfig, CONFIG_FILE_NAME, save_config};
use jirrit_core::server::{Category, PasswordBlock, ServerDescriptor};
use jirrit_core::{AuthInfo, RestClient};

/// User every fixture authenticates as
pub const TEST_USER: &str = "alice";

/// Password every fixture authenticates with
pub const TEST_PASS: &str = "s3cret";

/// Basic credentials for [`TEST_USER`]
pub fn test_auth() -> AuthInfo {
  AuthInfo::basic(TEST_USER, TEST_PASS)
}

/// A server of `category` rooted at `uri`
pub fn test_server(category: Category, uri: &str) -> ServerDescriptor {
  let name = format!("test-{}", category.as_str().to_ascii_lowercase());
  ServerDescriptor::new(category, name, uri)
}

/// REST client authenticated with [`test_auth`]
pub fn test_rest(server: &ServerDescriptor) -> RestClient {
  RestClient::new(test_auth(), &server.magic)
}

/// A configuration holding `servers` with basic credentials for [`TEST_USER`]
pub fn test_config(servers: Vec<ServerDescriptor>) -> AppConfig {
  AppConfig {
    user: TEST_USER.to_string(),
    pass: Some(PasswordBlock::new(Some("basic"), TEST_PASS)),
    servers,
    ..AppConfig::default()
  }
}

/// Write `config` as `jirrit.xml` inside `dir`
pub fn write_config(dir: &Path, config: &AppConfig) -> anyhow::Result<PathBuf> {
  let path = dir.join(CONFIG_FILE_NAME);
  save_config(&path, config)?;
  Ok(path)
}
