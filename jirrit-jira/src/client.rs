use anyhow::{Result, bail};
use jirrit_core::server::{Category, ServerDescriptor};
use jirrit_core::{ActionError, ActionResult, AuthInfo, RestClient};
use url::form_urlencoded;

use crate::consts::ISSUE_API;

/// Represents a Jira REST client
#[derive(Debug, Clone)]
pub struct JiraClient {
  pub(crate) rest: RestClient,
  pub(crate) base_url: String,
  /// Account used for "my" queries and watching
  pub(crate) user: String,
  /// Field dictionary and state bindings of the server
  pub(crate) server: ServerDescriptor,
}

impl JiraClient {
  /// Create a new Jira client for `server` using an authenticated REST client
  pub fn new(server: &ServerDescriptor, rest: RestClient) -> Self {
    Self {
      user: rest.auth().user.clone(),
      rest,
      base_url: server.base_url().to_string(),
      server: server.clone(),
    }
  }

  /// Absolute URL of a path below the server root
  pub(crate) fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path)
  }

  /// Absolute URL of an issue resource, `suffix` included verbatim
  pub(crate) fn issue_url(&self, id: &str, suffix: &str) -> String {
    self.url(&format!("{}{}{}", ISSUE_API, id, suffix))
  }
}

pub(crate) fn require_id(id: &str) -> ActionResult<()> {
  if id.trim().is_empty() {
    return Err(ActionError::invalid_input("an issue ID is required"));
  }
  Ok(())
}

/// Query-escape a search term or parameter value
pub(crate) fn escape(value: &str) -> String {
  form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Create a Jira client from a server descriptor and resolved credentials
pub fn create_jira_client(server: &ServerDescriptor, auth: AuthInfo) -> Result<JiraClient> {
  if server.category != Category::Jira {
    bail!("Server {} is not a Jira server", server.name);
  }
  let rest = RestClient::new(auth, &server.magic);
  Ok(JiraClient::new(server, rest))
}
