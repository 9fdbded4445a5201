
use jirrit_core::fields::{array_at, pick, project_fields, project_paths, scalar_text};
use jirrit_core::payload::{resolve_target, write_payload};
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, Prompter, keys};
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::{GerritClient, escape};
use crate::consts::{FILE_INFO, ISSUE_DETAILS, ISSUE_INFO, PROJECT_CONFIG, RELATED_INFO, REVIEW_INFO, REVISION_INFO};

/// Status a change listing is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
  Open,
  Merged,
}

impl ChangeStatus {
  pub const fn as_str(self) -> &'static str {
    match self {
      ChangeStatus::Open => "open",
      ChangeStatus::Merged => "merged",
    }
  }
}

/// Search terms for a change listing; empty parts are left out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeFilter {
  pub owner: String,
  pub project: String,
  pub branch: String,
  /// Raw extra query terms, e.g. `topic:foo`
  pub extra: String,
}

pub(crate) fn require_id(id: &str) -> ActionResult<()> {
  if id.trim().is_empty() {
    return Err(ActionError::invalid_input("a change ID is required"));
  }
  Ok(())
}

impl GerritClient {
  /// Run a change query; the server may answer with a list or a single change
  pub(crate) async fn query(&self, query: &str, options: &[&str]) -> ActionResult<Vec<Map<String, Value>>> {
    let mut url = self.url(&format!("changes/?q={}", query));
    for option in options {
      url.push_str("&o=");
      url.push_str(option);
    }
    Ok(self.rest.rest_sth(Method::GET, &url, None).await?.into_maps())
  }

  /// Query one change and fail if there is none
  pub(crate) async fn query_one(&self, id: &str, options: &[&str]) -> ActionResult<Map<String, Value>> {
    require_id(id)?;
    self
      .query(&escape(id), options)
      .await?
      .into_iter()
      .next()
      .ok_or_else(|| ActionError::no_valid_results(format!("no change matches {}", id)))
  }

  /// List changes by status and filter
  pub async fn list_changes(&self, status: ChangeStatus, filter: &ChangeFilter) -> ActionResult<IssueSet> {
    let mut terms = Vec::new();
    for (name, value) in [
      ("project", &filter.project),
      ("branch", &filter.branch),
      ("owner", &filter.owner),
    ] {
      if !value.is_empty() {
        terms.push(format!("{}:{}", name, escape(value)));
      }
    }
    if !filter.extra.trim().is_empty() {
      terms.push(filter.extra.trim().replace(' ', "+"));
    }
    if terms.is_empty() {
      return Err(ActionError::invalid_input("an owner, project, branch or query term is required"));
    }
    terms.insert(0, format!("status:{}", status.as_str()));

    let changes = self.query(&terms.join("+"), &[]).await?;
    Ok(changes.iter().map(|change| project_fields(change, ISSUE_INFO)).collect())
  }

  /// Open changes owned by the authenticated user
  pub async fn my_open(&self) -> ActionResult<IssueSet> {
    let filter = ChangeFilter {
      owner: self.user.clone(),
      ..ChangeFilter::default()
    };
    self.list_changes(ChangeStatus::Open, &filter).await
  }

  /// Every open change on the server, after confirmation
  pub async fn all_open(&self, prompter: &dyn Prompter) -> ActionResult<IssueSet> {
    if prompter.is_interactive() && !prompter.confirm("List every open change on the server?", false)? {
      return Err(ActionError::Cancelled);
    }
    let changes = self.query("status:open", &[]).await?;
    Ok(changes.iter().map(|change| project_fields(change, ISSUE_INFO)).collect())
  }

  /// Change detail with best-effort mergeable and submittable flags
  pub async fn detail(&self, id: &str) -> ActionResult<IssueRecord> {
    let change = self.query_one(id, &["CURRENT_REVISION", "SUBMITTABLE"]).await?;
    let mut record = project_fields(&change, ISSUE_DETAILS);
    if !record.has(keys::ID) {
      record.set(keys::ID, id);
    }
    if record.get(keys::STATUS) == "MERGED" {
      return Ok(record);
    }

    let canonical = escape(record.id());
    let mergeable_url = self.url(&format!("changes/{}/revisions/current/mergeable", canonical));
    match self.rest.rest_map(Method::GET, &mergeable_url, None).await {
      Ok(info) => {
        if let Some(mergeable) = info.get(keys::MERGEABLE).and_then(scalar_text) {
          record.set(keys::MERGEABLE, mergeable);
        }
      }
      Err(err) => debug!("Mergeable state of {} unavailable: {}", record.id(), err),
    }

    if !record.has(keys::SUBMITTABLE) {
      let actions_url = self.url(&format!("changes/{}/revisions/current/actions", canonical));
      match self.rest.rest_map(Method::GET, &actions_url, None).await {
        Ok(actions) => {
          let submittable = if actions.contains_key("submit") { "true" } else { "false" };
          record.set(keys::SUBMITTABLE, submittable);
        }
        Err(err) => debug!("Actions of {} unavailable: {}", record.id(), err),
      }
    }
    Ok(record)
  }

  /// Every revision of a change
  pub async fn revisions(&self, id: &str) -> ActionResult<IssueSet> {
    let change = self.query_one(id, &["ALL_REVISIONS"]).await?;
    let current = change.get(keys::REV_CUR).and_then(scalar_text).unwrap_or_default();
    let submit_type = change.get(keys::SUBMIT_TYPE).and_then(scalar_text).unwrap_or_default();

    let Some(Value::Object(revisions)) = change.get("revisions") else {
      return Err(ActionError::out_of_bound("change has no revisions"));
    };
    Ok(
      revisions
        .iter()
        .filter_map(|(rev, info)| info.as_object().map(|info| (rev, info)))
        .map(|(rev, info)| {
          let mut record = project_fields(info, REVISION_INFO).field(keys::ID, rev.as_str());
          record.set(keys::SUBMIT_TYPE, submit_type.as_str());
          if *rev == current {
            record.set(keys::REV_CUR, rev.as_str());
          }
          record
        })
        .collect(),
    )
  }

  /// Current revision of a change and its cherry-pick command
  pub async fn current_revision(&self, id: &str) -> ActionResult<IssueRecord> {
    let change = self.query_one(id, &["CURRENT_REVISION", "DOWNLOAD_COMMANDS"]).await?;
    let mut record = project_fields(
      &change,
      &[keys::ID, keys::PROJECT, keys::BRANCH, keys::SUBJECT, keys::REV_CUR],
    );
    let revision = record.get(keys::REV_CUR).to_string();
    if revision.is_empty() {
      return Err(ActionError::no_valid_results(format!("{} has no current revision", id)));
    }

    let revision_info = change.get("revisions").and_then(|revisions| revisions.get(&revision));
    if let Some(info) = revision_info {
      if let Some(number) = info.get(keys::NUMBER).and_then(scalar_text) {
        record.set(keys::NUMBER, number);
      }
      if let Some(command) = cherry_pick_command(info) {
        record.set(keys::CHERRY_PICK, command);
      }
    }
    Ok(record)
  }

  /// Messages posted on a change
  pub async fn history(&self, id: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let url = self.url(&format!("changes/{}/detail", escape(id)));
    let detail = self.rest.rest_map(Method::GET, &url, None).await?;
    Ok(
      array_at(&detail, "messages")?
        .iter()
        .map(|message| {
          project_paths(
            message,
            &[
              ("id", keys::ID),
              ("date", keys::DATE),
              ("message", keys::MESSAGE),
              ("author.name", keys::AUTHOR),
            ],
          )
        })
        .collect(),
    )
  }

  /// Reviewers of a change and the scores they gave
  pub async fn reviewers(&self, id: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let url = self.url(&format!("changes/{}/reviewers/", escape(id)));
    let reviewers = self.rest.rest_slc(Method::GET, &url, None).await?;

    let mut names = REVIEW_INFO.to_vec();
    if let Some(label) = self.score_label() {
      names.push(label);
    }
    Ok(
      reviewers
        .iter()
        .filter_map(Value::as_object)
        .map(|reviewer| {
          let mut record = project_fields(reviewer, &names);
          if let Some(account) = record.take("_account_id") {
            record.set(keys::ID, account);
          }
          record
        })
        .collect(),
    )
  }

  /// Changes related to a revision (current when `revision` is empty)
  pub async fn related(&self, id: &str, revision: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let revision = if revision.is_empty() { "current" } else { revision };
    let url = self.url(&format!("changes/{}/revisions/{}/related", escape(id), revision));
    let related = self.rest.rest_map(Method::GET, &url, None).await?;

    Ok(
      array_at(&related, "changes")?
        .iter()
        .map(|change| {
          let mut record = project_paths(change, RELATED_INFO);
          let parents: Vec<String> = pick(change, "commit.parents")
            .and_then(Value::as_array)
            .map(|parents| parents.iter().filter_map(|p| p.get("commit").and_then(scalar_text)).collect())
            .unwrap_or_default();
          record.set(keys::PARENTS, parents.join(","));
          record
        })
        .collect(),
    )
  }

  /// Files touched by a revision (current when `revision` is empty)
  pub async fn files(&self, id: &str, revision: &str) -> ActionResult<IssueSet> {
    let (canonical, revision, files) = if revision.is_empty() {
      let change = self.query_one(id, &["CURRENT_REVISION", "CURRENT_FILES"]).await?;
      let canonical = change.get(keys::ID).and_then(scalar_text).unwrap_or_else(|| id.to_string());
      let revision = change.get(keys::REV_CUR).and_then(scalar_text).unwrap_or_default();
      let files = change
        .get("revisions")
        .and_then(|revisions| revisions.get(&revision))
        .and_then(|info| info.get("files"))
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| ActionError::out_of_bound(format!("no files listed for {}", id)))?;
      (canonical, revision, files)
    } else {
      require_id(id)?;
      let url = self.url(&format!("changes/{}/revisions/{}/files/", escape(id), revision));
      let files = self.rest.rest_map(Method::GET, &url, None).await?;
      (id.to_string(), revision.to_string(), files)
    };

    Ok(
      files
        .iter()
        .filter(|(path, _)| !path.starts_with("/COMMIT_MSG") && !path.starts_with("/MERGE_LIST"))
        .map(|(path, info)| {
          let mut record = info
            .as_object()
            .map(|info| project_fields(info, FILE_INFO))
            .unwrap_or_default();
          record.set(keys::ID, canonical.as_str());
          record.set(keys::REV_CUR, revision.as_str());
          record.set(keys::FILE, path.as_str());
          record
        })
        .collect(),
    )
  }

  /// Download one file of a revision to `target`
  pub async fn download(&self, id: &str, revision: &str, file: &str, target: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    if file.is_empty() {
      return Err(ActionError::invalid_input("a file path is required"));
    }
    let revision = if revision.is_empty() {
      self.current_revision(id).await?.get(keys::REV_CUR).to_string()
    } else {
      revision.to_string()
    };

    let url = self.url(&format!(
      "changes/{}/revisions/{}/files/{}/download",
      escape(id),
      revision,
      escape(file)
    ));
    let content = self.rest.rest_bytes(Method::GET, &url).await?;

    let path = resolve_target(target, file)?;
    write_payload(&path, &content)?;

    Ok(vec![
      IssueRecord::with_id(id)
        .field(keys::REV_CUR, revision)
        .field(keys::FILE, path.to_string_lossy())
        .field(keys::SIZE, content.len().to_string()),
    ])
  }

  /// Configuration of a project
  pub async fn project_config(&self, project: &str) -> ActionResult<IssueSet> {
    if project.is_empty() {
      return Err(ActionError::invalid_input("a project is required"));
    }
    let url = self.url(&format!("projects/{}/config", escape(project)));
    let config = self.rest.rest_map(Method::GET, &url, None).await?;
    let record = project_paths(&Value::Object(config), PROJECT_CONFIG).field(keys::PROJECT, project);
    Ok(vec![record])
  }
}

/// The cherry-pick command of a revision, preferring the ssh scheme
fn cherry_pick_command(revision: &Value) -> Option<String> {
  let schemes = revision.get("fetch")?.as_object()?;
  let command = |scheme: &Value| {
    scheme
      .get("commands")
      .and_then(|commands| commands.get(keys::CHERRY_PICK))
      .and_then(scalar_text)
  };
  schemes
    .get("ssh")
    .and_then(command)
    .or_else(|| schemes.values().find_map(command))
}
