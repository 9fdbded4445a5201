use jirrit_core::fields::{project_paths, scalar_text};
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, keys};
use reqwest::Method;
use serde_json::{Value, json};

use crate::client::{BugzillaClient, require_id};
use crate::consts::COMMENT_PATHS;

impl BugzillaClient {
  /// Comments on a bug, oldest first
  pub async fn comments(&self, id: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let body = Value::Object(self.rest.rest_map(Method::GET, &self.bug_url(id, "/comment"), None).await?);
    let Some(Value::Array(comments)) = body.pointer(&format!("/bugs/{}/comments", id.trim())) else {
      return Err(ActionError::out_of_bound(format!("no comment list for {}", id)));
    };
    Ok(
      comments
        .iter()
        .map(|comment| project_paths(comment, COMMENT_PATHS).field(keys::ID, id))
        .collect(),
    )
  }

  /// Post the text in `comments` on the bug
  pub async fn add_comment(&self, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    if !issue.has(keys::COMMENTS) {
      return Err(ActionError::invalid_input("a comment is required"));
    }
    let body = json!({ "comment": issue.get(keys::COMMENTS) });
    let posted = self
      .rest
      .rest_map(Method::POST, &self.bug_url(issue.id(), "/comment"), Some(&body))
      .await?;
    let mut record = IssueRecord::with_id(issue.id()).field(keys::COMMENTS, issue.get(keys::COMMENTS));
    if let Some(key) = posted.get("id").and_then(scalar_text) {
      record.set(keys::KEY, key);
    }
    Ok(vec![record])
  }
}
