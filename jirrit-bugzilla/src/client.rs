use anyhow::{Result, bail};
use jirrit_core::server::{Category, ServerDescriptor};
use jirrit_core::{ActionError, ActionResult, AuthInfo, AuthKind, RestClient};
use serde_json::Value;
use url::form_urlencoded;

use crate::consts::{API_KEY_PARAM, BUG_API};

/// Represents a Bugzilla REST client
#[derive(Debug, Clone)]
pub struct BugzillaClient {
  pub(crate) rest: RestClient,
  pub(crate) base_url: String,
  /// Account used for "my" queries and the CC list
  pub(crate) user: String,
  /// API key appended to every URL, empty when headers carry the credentials
  api_key: String,
  /// Field dictionary and state bindings of the server
  pub(crate) server: ServerDescriptor,
}

impl BugzillaClient {
  /// Create a new Bugzilla client for `server` using an authenticated REST client
  pub fn new(server: &ServerDescriptor, rest: RestClient) -> Self {
    let auth = rest.auth();
    let api_key = if auth.kind == AuthKind::None { auth.secret.clone() } else { String::new() };
    Self {
      user: auth.user.clone(),
      api_key,
      rest,
      base_url: server.base_url().to_string(),
      server: server.clone(),
    }
  }

  /// Absolute URL of a path below the server root, API key included
  pub(crate) fn url(&self, path: &str) -> String {
    let mut url = format!("{}/{}", self.base_url, path);
    if !self.api_key.is_empty() {
      let separator = if path.contains('?') { '&' } else { '?' };
      url.push(separator);
      let param = form_urlencoded::Serializer::new(String::new())
        .append_pair(API_KEY_PARAM, &self.api_key)
        .finish();
      url.push_str(&param);
    }
    url
  }

  /// Absolute URL of a bug resource, `suffix` included verbatim
  pub(crate) fn bug_url(&self, id: &str, suffix: &str) -> String {
    self.url(&format!("{}{}{}", BUG_API, id, suffix))
  }
}

pub(crate) fn require_id(id: &str) -> ActionResult<()> {
  if id.trim().is_empty() {
    return Err(ActionError::invalid_input("a bug ID is required"));
  }
  Ok(())
}

/// Bugzilla wants numeric bug IDs as numbers; aliases stay strings
pub(crate) fn id_value(id: &str) -> Value {
  id.trim().parse::<u64>().map(Value::from).unwrap_or_else(|_| Value::from(id))
}

/// Create a Bugzilla client from a server descriptor and resolved credentials
pub fn create_bugzilla_client(server: &ServerDescriptor, auth: AuthInfo) -> Result<BugzillaClient> {
  if server.category != Category::Bugzilla {
    bail!("Server {} is not a Bugzilla server", server.name);
  }
  let rest = RestClient::new(auth, &server.magic);
  Ok(BugzillaClient::new(server, rest))
}
