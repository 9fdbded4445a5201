use jirrit_core::fields::{parse_list, project_paths};
use jirrit_core::server::StateType;
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, keys};
use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::client::{JiraClient, escape, require_id};
use crate::consts::{ISSUE_PATHS, LINK_BLOCKS, SEARCH_API};

impl JiraClient {
  /// Raw issue document
  pub(crate) async fn issue_document(&self, id: &str) -> ActionResult<Map<String, Value>> {
    require_id(id)?;
    Ok(self.rest.rest_map(Method::GET, &self.issue_url(id, ""), None).await?)
  }

  /// Summary, description, status, project and assignee of an issue
  pub async fn detail(&self, id: &str) -> ActionResult<IssueSet> {
    let document = self.issue_document(id).await?;
    let record = project_paths(&Value::Object(document), ISSUE_PATHS);
    if record.is_empty() {
      return Err(ActionError::no_valid_results(format!("no details of {}", id)));
    }
    Ok(vec![record])
  }

  /// Issues assigned to me that are not in a "not open" state
  pub async fn my_open(&self) -> ActionResult<IssueSet> {
    let mut jql = format!("assignee={}", self.user);
    for state in self.server.make_states(&StateType::NotOpen) {
      jql.push_str(&format!(" AND status != \"{}\"", state));
    }
    debug!("Searching {}", jql);

    let url = self.url(&format!("{}{}", SEARCH_API, escape(&jql)));
    let found = self.rest.rest_map(Method::GET, &url, None).await?;
    parse_list(&found, "issues", |issue| {
      Some(project_paths(&Value::Object(issue.clone()), ISSUE_PATHS)).filter(|record| !record.is_empty())
    })
  }

  /// Assign an issue to the user named in `summary`, optionally moving it to
  /// the component named in `component`
  pub async fn transfer(&self, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let assignee = issue.get(keys::SUMMARY);
    if assignee.is_empty() {
      return Err(ActionError::invalid_input("a new assignee is required"));
    }

    let mut update = Map::new();
    update.insert("assignee".to_string(), json!([{ "set": { "name": assignee } }]));
    if issue.has(keys::COMPONENT) {
      update.insert(
        "components".to_string(),
        json!([{ "set": [{ "name": issue.get(keys::COMPONENT) }] }]),
      );
    }
    let body = json!({ "update": update });
    self.rest.rest_sth(Method::PUT, &self.issue_url(issue.id(), ""), Some(&body)).await?;
    Ok(vec![issue.clone()])
  }

  /// Mark the issue as blocking the one named in `link`
  pub async fn link(&self, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let target = issue.get(keys::LINK);
    if target.is_empty() || target == issue.id() {
      return Err(ActionError::invalid_input("a different issue to link to is required"));
    }

    let (name, inward, outward) = LINK_BLOCKS;
    let body = json!({
      "update": {
        "issuelinks": [{
          "add": {
            "type": { "name": name, "inward": inward, "outward": outward },
            "inwardIssue": { "key": target }
          }
        }]
      }
    });
    self.rest.rest_sth(Method::PUT, &self.issue_url(issue.id(), ""), Some(&body)).await?;
    Ok(vec![IssueRecord::with_id(issue.id()).field(keys::LINK, target)])
  }

  /// PUT a `fields` update on an issue
  pub(crate) async fn edit_fields(&self, id: &str, fields: Map<String, Value>) -> ActionResult<()> {
    let body = json!({ "fields": fields });
    self.rest.rest_sth(Method::PUT, &self.issue_url(id, ""), Some(&body)).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use jirrit_core::ids::loop_issues;
  use jirrit_core::server::StateBinding;
  use jirrit_core::{Category, RestError};
  use jirrit_test_utils::{test_rest, test_server};
  use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  fn client(mock_server: &MockServer) -> JiraClient {
    let server = test_server(Category::Jira, &mock_server.uri());
    JiraClient::new(&server, test_rest(&server))
  }

  fn issue_json(key: &str) -> Value {
    json!({
      "key": key,
      "fields": {
        "summary": format!("summary of {}", key),
        "status": {"name": "Open"},
        "project": {"key": "X"},
        "assignee": {"displayName": "Alice"}
      }
    })
  }

  #[tokio::test]
  async fn test_detail() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-1"))
      .and(basic_auth("alice", "s3cret"))
      .respond_with(ResponseTemplate::new(200).set_body_json(issue_json("X-1")))
      .mount(&mock_server)
      .await;

    let detail = client(&mock_server).detail("X-1").await?;
    assert_eq!(detail[0].id(), "X-1");
    assert_eq!(detail[0].get(keys::STATUS), "Open");
    assert_eq!(detail[0].get(keys::PROJECT), "X");
    assert_eq!(detail[0].get(keys::DISPLAY_NAME), "Alice");
    Ok(())
  }

  #[tokio::test]
  async fn test_id_range_stops_at_first_failure() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(issue_json("X-1")))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-2"))
      .respond_with(ResponseTemplate::new(404).set_body_string("Issue Does Not Exist"))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-3"))
      .respond_with(ResponseTemplate::new(200).set_body_json(issue_json("X-3")))
      .expect(0)
      .mount(&mock_server)
      .await;

    let client = client(&mock_server);
    let mut prefix = None;
    let mut visited = Vec::new();
    let result = loop_issues(&mut prefix, &IssueRecord::with_id("X-1,,3"), async |issue| {
      visited.push(issue.id().to_string());
      client.detail(issue.id()).await.map(|_| ())
    })
    .await;

    assert_eq!(visited, vec!["X-1", "X-2"]);
    assert!(matches!(result, Err(ActionError::Rest(RestError::NotFound { .. }))));
    assert_eq!(prefix.as_deref(), Some("X"));
    Ok(())
  }

  #[tokio::test]
  async fn test_my_open_excludes_closed_states() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let mut server = test_server(Category::Jira, &mock_server.uri());
    server.states = vec![
      StateBinding::new(StateType::NotOpen, "Closed"),
      StateBinding::new(StateType::NotOpen, "Resolved"),
    ];
    let client = JiraClient::new(&server, test_rest(&server));

    Mock::given(method("GET"))
      .and(path("/rest/api/latest/search"))
      .and(query_param(
        "jql",
        "assignee=alice AND status != \"Closed\" AND status != \"Resolved\"",
      ))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "issues": [issue_json("X-1"), issue_json("X-9")]
      })))
      .mount(&mock_server)
      .await;

    let open = client.my_open().await?;
    assert_eq!(open.len(), 2);
    assert_eq!(open[1].id(), "X-9");
    Ok(())
  }

  #[tokio::test]
  async fn test_transfer_with_component() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/rest/api/latest/issue/X-1"))
      .and(body_json(json!({
        "update": {
          "assignee": [{"set": {"name": "bob"}}],
          "components": [{"set": [{"name": "Kernel"}]}]
        }
      })))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;

    let seed = IssueRecord::with_id("X-1")
      .field(keys::SUMMARY, "bob")
      .field(keys::COMPONENT, "Kernel");
    client(&mock_server).transfer(&seed).await?;
    Ok(())
  }

  #[tokio::test]
  async fn test_link_refuses_self() {
    let mock_server = MockServer::start().await;
    let seed = IssueRecord::with_id("X-1").field(keys::LINK, "X-1");
    let result = client(&mock_server).link(&seed).await;
    assert!(matches!(result, Err(ActionError::InvalidInput(_))));
  }

  #[tokio::test]
  async fn test_link_blocks() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/rest/api/latest/issue/X-1"))
      .and(body_json(json!({
        "update": {"issuelinks": [{"add": {
          "type": {"name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
          "inwardIssue": {"key": "X-2"}
        }}]}
      })))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;

    let seed = IssueRecord::with_id("X-1").field(keys::LINK, "X-2");
    let linked = client(&mock_server).link(&seed).await?;
    assert_eq!(linked[0].get(keys::LINK), "X-2");
    Ok(())
  }
}
