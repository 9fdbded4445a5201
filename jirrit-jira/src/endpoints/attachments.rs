use std::path::Path;

use jirrit_core::fields::project_paths;
use jirrit_core::payload::{read_payload, resolve_target, write_payload};
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, Prompter, keys};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::client::{JiraClient, require_id};
use crate::consts::{ATTACHMENT_API, ATTACHMENT_PATHS};

/// Header Jira requires on attachment uploads
const NO_CHECK: (&str, &str) = ("x-atlassian-token", "nocheck");

fn attachment_record(id: &str, attachment: &Value) -> IssueRecord {
  project_paths(attachment, ATTACHMENT_PATHS).field(keys::ID, id)
}

impl JiraClient {
  /// Upload the local file named in `file`
  pub async fn add_file(&self, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let file = issue.get(keys::FILE);
    if file.is_empty() {
      return Err(ActionError::invalid_input("a file to attach is required"));
    }
    let path = Path::new(file);
    let content = read_payload(path)?;
    let file_name = path
      .file_name()
      .map(|name| name.to_string_lossy().to_string())
      .unwrap_or_else(|| file.to_string());

    let url = self.issue_url(issue.id(), "/attachments");
    let uploaded = self.rest.upload(&url, &file_name, content, &[NO_CHECK]).await?;
    Ok(
      uploaded
        .into_maps()
        .into_iter()
        .map(|attachment| attachment_record(issue.id(), &Value::Object(attachment)))
        .collect(),
    )
  }

  /// Attachments of an issue
  pub async fn list_files(&self, id: &str) -> ActionResult<IssueSet> {
    let document = Value::Object(self.issue_document(id).await?);
    let Some(attachments) = document.pointer("/fields/attachment").and_then(Value::as_array) else {
      debug!("{} has no attachment list", id);
      return Ok(IssueSet::new());
    };
    Ok(attachments.iter().map(|attachment| attachment_record(id, attachment)).collect())
  }

  /// The attachment named in `key`, or one picked from the issue's list
  async fn choose_file(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueRecord> {
    let files = self.list_files(issue.id()).await?;
    if files.is_empty() {
      return Err(ActionError::no_valid_results(format!("{} has no attachments", issue.id())));
    }

    if issue.has(keys::KEY) {
      return files
        .into_iter()
        .find(|file| file.get(keys::KEY) == issue.get(keys::KEY))
        .ok_or_else(|| ActionError::no_valid_results(format!("no attachment {}", issue.get(keys::KEY))));
    }
    if !prompter.is_interactive() {
      return Err(ActionError::invalid_input("an attachment key is required"));
    }
    let labels: Vec<String> = files
      .iter()
      .map(|file| format!("{} ({})", file.get(keys::FILE), file.get(keys::SIZE)))
      .collect();
    let index = prompter.select("Attachment", &labels)?.ok_or(ActionError::Cancelled)?;
    Ok(files[index].clone())
  }

  /// Download an attachment to the path in `file`
  pub async fn get_file(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let chosen = self.choose_file(prompter, issue).await?;
    let link = chosen.get(keys::LINK);
    if link.is_empty() {
      return Err(ActionError::no_valid_results("the attachment has no content link"));
    }

    let content = self.rest.rest_bytes(Method::GET, link).await?;
    let path = resolve_target(issue.get(keys::FILE), chosen.get(keys::FILE))?;
    write_payload(&path, &content)?;
    Ok(vec![
      chosen
        .clone()
        .field(keys::FILE, path.to_string_lossy())
        .field(keys::SIZE, content.len().to_string()),
    ])
  }

  /// Delete the attachment named in `key`, or one picked from the issue's list
  pub async fn remove_file(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    let chosen = if issue.has(keys::KEY) {
      issue.clone()
    } else {
      require_id(issue.id())?;
      self.choose_file(prompter, issue).await?
    };

    let url = self.url(&format!("{}{}", ATTACHMENT_API, chosen.get(keys::KEY)));
    self.rest.rest_sth(Method::DELETE, &url, None).await?;
    Ok(vec![chosen])
  }
}
