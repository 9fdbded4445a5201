use jirrit_core::fields::{project_paths, scalar_text};
use jirrit_core::{ActionResult, IssueRecord, IssueSet, keys};
use serde_json::{Value, json};

use crate::client::{BugzillaClient, require_id};
use crate::consts::WATCHER_PATHS;

impl BugzillaClient {
  /// Users on the CC list of a bug
  pub async fn watchers(&self, id: &str) -> ActionResult<IssueSet> {
    let bug = self.bug_document(id).await?;
    if let Some(Value::Array(details)) = bug.get("cc_detail") {
      return Ok(
        details
          .iter()
          .map(|detail| project_paths(detail, WATCHER_PATHS))
          .filter(|record| !record.is_empty())
          .collect(),
      );
    }
    let Some(Value::Array(cc)) = bug.get("cc") else {
      return Ok(IssueSet::new());
    };
    Ok(cc.iter().filter_map(scalar_text).map(IssueRecord::with_id).collect())
  }

  /// Add myself to the CC list
  pub async fn watch(&self, id: &str) -> ActionResult<IssueSet> {
    self.change_cc(id, "add").await
  }

  /// Remove myself from the CC list
  pub async fn unwatch(&self, id: &str) -> ActionResult<IssueSet> {
    self.change_cc(id, "remove").await
  }

  async fn change_cc(&self, id: &str, change: &str) -> ActionResult<IssueSet> {
    require_id(id)?;
    let body = json!({ "cc": { change: [self.user.as_str()] } });
    self.update(id, &body).await?;
    Ok(vec![IssueRecord::with_id(id).field(keys::NAME, self.user.as_str())])
  }
}
