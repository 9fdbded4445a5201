//! # Authentication Resolution
//!
//! Derives the credentials used for one server from its own `<pass>` block
//! and the global defaults.

use crate::errors::{ActionError, ActionResult};
use crate::server::{PasswordBlock, ServerDescriptor};

/// How credentials travel to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthKind {
  /// No header; Bugzilla carries the secret as an API key parameter
  #[default]
  None,
  Basic,
  /// Secret is sent verbatim as a basic authorization value
  Plain,
  /// Sent as basic credentials; no challenge-response negotiation
  Digest,
}

/// Resolved credentials for a server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthInfo {
  pub user: String,
  pub kind: AuthKind,
  pub secret: String,
}

impl AuthInfo {
  pub fn basic(user: impl Into<String>, secret: impl Into<String>) -> Self {
    Self {
      user: user.into(),
      kind: AuthKind::Basic,
      secret: secret.into(),
    }
  }

  pub fn none() -> Self {
    Self::default()
  }
}

/// Resolve the credentials for `server` given the global user and password
pub fn resolve_auth(
  server: &ServerDescriptor,
  global_user: &str,
  global_pass: Option<&PasswordBlock>,
) -> ActionResult<AuthInfo> {
  let block = match &server.pass {
    Some(pass) if !pass.secret.is_empty() => Some(pass),
    _ => global_pass,
  };
  let user = if server.user.is_empty() { global_user } else { &server.user };

  let (kind, secret) = match block {
    None => (AuthKind::None, String::new()),
    Some(block) => match block.kind.as_deref().map(|k| k.trim().to_ascii_lowercase()) {
      Some(kind) if kind == "basic" => (AuthKind::Basic, block.secret.clone()),
      Some(kind) if kind == "plain" => (AuthKind::Plain, block.secret.clone()),
      Some(kind) if kind == "digest" => (AuthKind::Digest, block.secret.clone()),
      // API key carried as a URL parameter
      Some(kind) if kind == "none" || kind == "token" => (AuthKind::None, block.secret.clone()),
      _ => (AuthKind::None, String::new()),
    },
  };

  if kind != AuthKind::None && secret.is_empty() {
    return Err(ActionError::Config(format!("no password configured for server {}", server.name)));
  }

  Ok(AuthInfo {
    user: user.to_string(),
    kind,
    secret,
  })
}
