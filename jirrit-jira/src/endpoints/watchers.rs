use jirrit_core::fields::{parse_list, project_paths, scalar_text};
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, keys};
use reqwest::Method;
use serde_json::Value;

use crate::client::{JiraClient, escape, require_id};
use crate::consts::WATCHER_PATHS;

impl JiraClient {
  /// Users watching an issue
  pub async fn watchers(&self, id: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let body = self.rest.rest_map(Method::GET, &self.issue_url(id, "/watchers"), None).await?;
    parse_list(&body, "watchers", |watcher| {
      Some(project_paths(&Value::Object(watcher.clone()), WATCHER_PATHS)).filter(|record| !record.is_empty())
    })
  }

  /// Whether I am watching an issue, as `status=true|false`
  pub async fn is_watching(&self, id: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let body = self.rest.rest_map(Method::GET, &self.issue_url(id, "/watchers"), None).await?;
    let watching = body
      .get("isWatching")
      .filter(|value| value.is_boolean())
      .and_then(scalar_text)
      .ok_or_else(|| ActionError::out_of_bound("no isWatching flag in response"))?;
    Ok(vec![IssueRecord::with_id(id).field(keys::STATUS, watching)])
  }

  /// Start watching an issue
  pub async fn watch(&self, id: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let body = Value::String(self.user.clone());
    self
      .rest
      .rest_sth(Method::POST, &self.issue_url(id, "/watchers"), Some(&body))
      .await?;
    Ok(vec![IssueRecord::with_id(id).field(keys::NAME, self.user.as_str())])
  }

  /// Stop watching an issue
  pub async fn unwatch(&self, id: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let url = self.issue_url(id, &format!("/watchers?username={}", escape(&self.user)));
    self.rest.rest_sth(Method::DELETE, &url, None).await?;
    Ok(vec![IssueRecord::with_id(id).field(keys::NAME, self.user.as_str())])
  }
}
