use jirrit_core::fields::{array_at, parse_list, pick_text, project_paths};
use jirrit_core::server::StateType;
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, keys};
use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::debug;
use url::form_urlencoded;

use crate::client::{BugzillaClient, require_id};
use crate::consts::{BUG_PATHS, SEARCH_API};

impl BugzillaClient {
  /// Raw bug document
  pub(crate) async fn bug_document(&self, id: &str) -> ActionResult<Value> {
    require_id(id)?;
    let body = self.rest.rest_map(Method::GET, &self.bug_url(id, ""), None).await?;
    array_at(&body, "bugs")?
      .first()
      .cloned()
      .ok_or_else(|| ActionError::no_valid_results(format!("no bug {}", id)))
  }

  /// Project a bug document, solution fields included
  fn bug_record(&self, bug: &Value) -> IssueRecord {
    let mut record = project_paths(bug, BUG_PATHS);
    if let Some(solution) = self.server.fields.solution.iter().find_map(|field| pick_text(bug, field)) {
      record.set(keys::SOLUTION, solution);
    }
    record
  }

  /// Summary, status, product, component and assignee of a bug
  pub async fn detail(&self, id: &str) -> ActionResult<IssueSet> {
    let bug = self.bug_document(id).await?;
    let record = self.bug_record(&bug);
    if record.is_empty() {
      return Err(ActionError::no_valid_results(format!("no details of {}", id)));
    }
    Ok(vec![record])
  }

  /// Bugs assigned to me whose status is not a "not open" one
  pub async fn my_open(&self) -> ActionResult<IssueSet> {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("assigned_to", &self.user);
    for (index, state) in self.server.make_states(&StateType::NotOpen).iter().enumerate() {
      let n = index + 1;
      query
        .append_pair(&format!("f{}", n), "bug_status")
        .append_pair(&format!("o{}", n), "notequals")
        .append_pair(&format!("v{}", n), state);
    }
    let query = query.finish();
    debug!("Searching {}", query);

    let url = self.url(&format!("{}{}", SEARCH_API, query));
    let found = self.rest.rest_map(Method::GET, &url, None).await?;
    parse_list(&found, "bugs", |bug| {
      Some(self.bug_record(&Value::Object(bug.clone()))).filter(|record| !record.is_empty())
    })
  }

  /// Assign a bug to the user named in `summary`, optionally moving it to the
  /// component named in `component`
  pub async fn transfer(&self, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let assignee = issue.get(keys::SUMMARY);
    if assignee.is_empty() {
      return Err(ActionError::invalid_input("a new assignee is required"));
    }

    let mut body = Map::new();
    body.insert("assigned_to".to_string(), Value::from(assignee));
    if issue.has(keys::COMPONENT) {
      body.insert("component".to_string(), Value::from(issue.get(keys::COMPONENT)));
    }
    self.update(issue.id(), &Value::Object(body)).await?;
    Ok(vec![issue.clone()])
  }

  /// Mark the bug as blocking the one named in `link`
  pub async fn link(&self, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let target = issue.get(keys::LINK);
    if target.is_empty() || target == issue.id() {
      return Err(ActionError::invalid_input("a different bug to link to is required"));
    }
    let Ok(blocked) = target.trim().parse::<u64>() else {
      return Err(ActionError::invalid_input(format!("{} is not a bug number", target)));
    };

    let body = json!({ "blocks": { "add": [blocked] } });
    self.update(issue.id(), &body).await?;
    Ok(vec![IssueRecord::with_id(issue.id()).field(keys::LINK, target)])
  }

  /// PUT an update on a bug
  pub(crate) async fn update(&self, id: &str, body: &Value) -> ActionResult<()> {
    self.rest.rest_sth(Method::PUT, &self.bug_url(id, ""), Some(body)).await?;
    Ok(())
  }
}
