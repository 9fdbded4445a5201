use jirrit_core::fields::{parse_list, project_paths};
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, Prompter, keys};
use reqwest::Method;
use serde_json::{Value, json};

use crate::client::{JiraClient, require_id};
use crate::consts::COMMENT_PATHS;

impl JiraClient {
  /// Comments on an issue, oldest first
  pub async fn comments(&self, id: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let body = self.rest.rest_map(Method::GET, &self.issue_url(id, "/comment"), None).await?;
    parse_list(&body, keys::COMMENTS, |comment| {
      let record = project_paths(&Value::Object(comment.clone()), COMMENT_PATHS);
      Some(record.field(keys::ID, id))
    })
  }

  /// Post the text in `comments` on the issue
  pub async fn add_comment(&self, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    if !issue.has(keys::COMMENTS) {
      return Err(ActionError::invalid_input("a comment is required"));
    }
    let body = json!({ "body": issue.get(keys::COMMENTS) });
    let posted = self
      .rest
      .rest_map(Method::POST, &self.issue_url(issue.id(), "/comment"), Some(&body))
      .await?;
    let record = project_paths(&Value::Object(posted), COMMENT_PATHS).field(keys::ID, issue.id());
    Ok(vec![record])
  }

  /// Replace the text of the comment named in `key`, or one picked from the
  /// issue's comments
  pub async fn change_comment(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    if !issue.has(keys::COMMENTS) {
      return Err(ActionError::invalid_input("a comment is required"));
    }
    let key = self.comment_key(prompter, issue).await?;
    let body = json!({ "body": issue.get(keys::COMMENTS) });
    let url = self.issue_url(issue.id(), &format!("/comment/{}", key));
    let changed = self.rest.rest_map(Method::PUT, &url, Some(&body)).await?;
    let record = project_paths(&Value::Object(changed), COMMENT_PATHS).field(keys::ID, issue.id());
    Ok(vec![record])
  }

  /// Delete the comment named in `key`, or one picked from the issue's comments
  pub async fn delete_comment(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let key = self.comment_key(prompter, issue).await?;
    let url = self.issue_url(issue.id(), &format!("/comment/{}", key));
    self.rest.rest_sth(Method::DELETE, &url, None).await?;
    Ok(vec![IssueRecord::with_id(issue.id()).field(keys::KEY, key)])
  }

  async fn comment_key(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<String> {
    if issue.has(keys::KEY) {
      return Ok(issue.get(keys::KEY).to_string());
    }
    if !prompter.is_interactive() {
      return Err(ActionError::invalid_input("a comment key is required"));
    }

    let comments = self.comments(issue.id()).await?;
    if comments.is_empty() {
      return Err(ActionError::no_valid_results(format!("{} has no comments", issue.id())));
    }
    let labels: Vec<String> = comments
      .iter()
      .map(|comment| format!("{} ({})", comment.get(keys::COMMENTS), comment.get(keys::KEY)))
      .collect();
    let index = prompter.select("Comment", &labels)?.ok_or(ActionError::Cancelled)?;
    let key = comments[index].get(keys::KEY);
    if key.is_empty() {
      return Err(ActionError::no_valid_results("the chosen comment has no key"));
    }
    Ok(key.to_string())
  }
}
