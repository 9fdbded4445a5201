use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jirrit_core::fields::{pick_text, project_paths, scalar_text};
use jirrit_core::payload::{read_payload, resolve_target, write_payload};
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, Prompter, keys};
use reqwest::Method;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{BugzillaClient, id_value, require_id};
use crate::consts::{ATTACHMENT_API, ATTACHMENT_PATHS};

fn attachment_record(id: &str, attachment: &Value) -> IssueRecord {
  project_paths(attachment, ATTACHMENT_PATHS).field(keys::ID, id)
}

impl BugzillaClient {
  /// Upload the local file named in `file`, described by `key` or the file name
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
    let summary = if issue.has(keys::KEY) { issue.get(keys::KEY) } else { file_name.as_str() };
    let content_type = mime_guess::from_path(path).first_or_octet_stream();

    let body = json!({
      "ids": [id_value(issue.id())],
      "summary": summary,
      "file_name": file_name,
      "data": STANDARD.encode(&content),
      "content_type": content_type.essence_str(),
    });
    let created = self
      .rest
      .rest_map(Method::POST, &self.bug_url(issue.id(), "/attachment"), Some(&body))
      .await?;

    let mut record = IssueRecord::with_id(issue.id())
      .field(keys::FILE, file_name.as_str())
      .field(keys::SIZE, content.len().to_string());
    if let Some(Value::Array(ids)) = created.get("ids")
      && let Some(key) = ids.first().and_then(scalar_text)
    {
      record.set(keys::KEY, key);
    }
    Ok(vec![record])
  }

  /// Attachment metadata of a bug
  pub async fn list_files(&self, id: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let url = self.bug_url(id, "/attachment?exclude_fields=data");
    let body = Value::Object(self.rest.rest_map(Method::GET, &url, None).await?);
    let Some(Value::Array(attachments)) = body.pointer(&format!("/bugs/{}", id.trim())) else {
      debug!("{} has no attachment list", id);
      return Ok(IssueSet::new());
    };
    Ok(attachments.iter().map(|attachment| attachment_record(id, attachment)).collect())
  }

  /// The attachment named in `key`, or one picked from the bug's list
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
    let key = chosen.get(keys::KEY);

    let url = self.url(&format!("{}{}", ATTACHMENT_API, key));
    let body = Value::Object(self.rest.rest_map(Method::GET, &url, None).await?);
    let attachment = body
      .pointer(&format!("/attachments/{}", key))
      .ok_or_else(|| ActionError::out_of_bound(format!("no attachment {} in response", key)))?;
    let data = pick_text(attachment, "data")
      .ok_or_else(|| ActionError::out_of_bound(format!("attachment {} has no data", key)))?;
    let content = STANDARD
      .decode(data.trim())
      .map_err(|err| ActionError::out_of_bound(format!("attachment {} is not base64: {}", key, err)))?;

    let file_name = pick_text(attachment, "file_name").unwrap_or_else(|| chosen.get(keys::FILE).to_string());
    let path = resolve_target(issue.get(keys::FILE), &file_name)?;
    write_payload(&path, &content)?;
    Ok(vec![
      chosen
        .clone()
        .field(keys::FILE, path.to_string_lossy())
        .field(keys::SIZE, content.len().to_string()),
    ])
  }
}

#[cfg(test)]
mod tests {
  use jirrit_core::{Answer, Category, ScriptedPrompter};
  use jirrit_test_utils::{test_rest, test_server};
  use tempfile::TempDir;
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  fn client(mock_server: &MockServer) -> BugzillaClient {
    let server = test_server(Category::Bugzilla, &mock_server.uri());
    BugzillaClient::new(&server, test_rest(&server))
  }

  async fn mount_download(mock_server: &MockServer, content: &[u8]) {
    Mock::given(method("GET"))
      .and(path("/rest/bug/7/attachment"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "bugs": {"7": [{"id": 12, "file_name": "a.log", "size": 42, "summary": "boot log"}]},
        "attachments": {}
      })))
      .mount(mock_server)
      .await;
    Mock::given(method("GET"))
      .and(path("/rest/bug/attachment/12"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "attachments": {"12": {"id": 12, "file_name": "a.log", "data": STANDARD.encode(content)}},
        "bugs": {}
      })))
      .mount(mock_server)
      .await;
  }

  #[tokio::test]
  async fn test_get_file_by_pick_decodes_payload() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_download(&mock_server, b"hello\n").await;

    let temp = TempDir::new()?;
    let target = temp.path().join("saved.log");
    let seed = IssueRecord::with_id("7").field(keys::FILE, target.to_string_lossy());
    let prompter = ScriptedPrompter::with_answers([Answer::Select(0)]);
    let fetched = client(&mock_server).get_file(&prompter, &seed).await?;

    assert_eq!(std::fs::read(&target)?, b"hello\n");
    assert_eq!(fetched[0].get(keys::KEY), "12");
    assert_eq!(fetched[0].get(keys::SIZE), "6");
    Ok(())
  }

  #[tokio::test]
  async fn test_get_file_needs_key_when_silent() {
    let mock_server = MockServer::start().await;
    mount_download(&mock_server, b"hello\n").await;

    let result = client(&mock_server)
      .get_file(&ScriptedPrompter::silent(), &IssueRecord::with_id("7"))
      .await;
    assert!(matches!(result, Err(ActionError::InvalidInput(_))));
  }

  #[tokio::test]
  async fn test_uploaded_bytes_come_back_unchanged() -> anyhow::Result<()> {
    let content: Vec<u8> = (0u8..=255).chain(b"\r\n\0tail".iter().copied()).collect();
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/rest/bug/7/attachment"))
      .and(body_json(json!({
        "ids": [7],
        "summary": "dump.bin",
        "file_name": "dump.bin",
        "data": STANDARD.encode(&content),
        "content_type": "application/octet-stream"
      })))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ids": [12]})))
      .expect(1)
      .mount(&mock_server)
      .await;
    mount_download(&mock_server, &content).await;

    let temp = TempDir::new()?;
    let local = temp.path().join("dump.bin");
    std::fs::write(&local, &content)?;
    let client = client(&mock_server);

    let added = client
      .add_file(&IssueRecord::with_id("7").field(keys::FILE, local.to_string_lossy()))
      .await?;
    assert_eq!(added[0].get(keys::KEY), "12");

    let download_dir = temp.path().join("download");
    std::fs::create_dir(&download_dir)?;
    let seed = IssueRecord::with_id("7")
      .field(keys::KEY, "12")
      .field(keys::FILE, download_dir.to_string_lossy());
    client.get_file(&ScriptedPrompter::silent(), &seed).await?;
    assert_eq!(std::fs::read(download_dir.join("a.log"))?, content);
    Ok(())
  }
}
