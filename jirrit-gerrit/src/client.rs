use anyhow::{Result, bail};
use jirrit_core::server::{Category, ServerDescriptor};
use jirrit_core::{AuthInfo, RestClient};
use url::form_urlencoded;

/// Represents a Gerrit REST client
#[derive(Debug, Clone)]
pub struct GerritClient {
  pub(crate) rest: RestClient,
  pub(crate) base_url: String,
  /// Account used for "my" queries
  pub(crate) user: String,
  /// Extra label scored besides Code-Review and Verified
  pub(crate) score_label: String,
}

impl GerritClient {
  /// Create a new Gerrit client for `server` using an authenticated REST client
  pub fn new(server: &ServerDescriptor, rest: RestClient) -> Self {
    Self {
      user: rest.auth().user.clone(),
      rest,
      base_url: server.base_url().to_string(),
      score_label: server.score.clone(),
    }
  }

  /// Absolute URL of an API path
  pub(crate) fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path)
  }

  /// The configured extra score label, if any
  pub fn score_label(&self) -> Option<&str> {
    Some(self.score_label.as_str()).filter(|label| !label.is_empty())
  }
}

/// Query-escape one path segment or search value
pub(crate) fn escape(value: &str) -> String {
  form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Create a Gerrit client from a server descriptor and resolved credentials
pub fn create_gerrit_client(server: &ServerDescriptor, auth: AuthInfo) -> Result<GerritClient> {
  if server.category != Category::Gerrit {
    bail!("Server {} is not a Gerrit server", server.name);
  }
  let rest = RestClient::new(auth, &server.magic);
  Ok(GerritClient::new(server, rest))
}

#[cfg(test)]
mod tests {
  use jirrit_test_utils::{test_auth, test_server};

  use super::*;

  #[test]
  fn test_gerrit_client_creation() -> Result<()> {
    let mut server = test_server(Category::Gerrit, "https://review.example.com/a/");
    server.score = "Sanity-Review".to_string();
    let client = create_gerrit_client(&server, test_auth())?;

    assert_eq!(client.base_url, "https://review.example.com/a");
    assert_eq!(client.user, "alice");
    assert_eq!(client.url("changes/"), "https://review.example.com/a/changes/");
    assert_eq!(client.score_label(), Some("Sanity-Review"));
    Ok(())
  }

  #[test]
  fn test_wrong_category_is_rejected() {
    let server = test_server(Category::Jira, "https://jira.example.com");
    assert!(create_gerrit_client(&server, test_auth()).is_err());
  }

  #[test]
  fn test_escape() {
    assert_eq!(escape("src/main.rs"), "src%2Fmain.rs");
    assert_eq!(escape("platform/build"), "platform%2Fbuild");
  }
}
