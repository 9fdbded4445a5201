use jirrit_core::fields::{array_at, pick_text, scalar_text};
use jirrit_core::server::StateType;
use jirrit_core::transition::{StepContext, choose_transition};
use jirrit_core::{
  ActionError, ActionResult, Discovery, IssueRecord, IssueSet, Prompter, StepChain, Transition, TransitionService,
  keys,
};
use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::client::{BugzillaClient, require_id};
use crate::consts::STATUS_FIELD_API;

/// Statuses reachable from `current` according to the `bug_status` field
fn reachable_from(field: &Map<String, Value>, current: &str) -> ActionResult<Vec<Transition>> {
  let values = array_at(field, "fields")?
    .iter()
    .filter_map(|field| field.get("values").and_then(Value::as_array))
    .flatten();
  for value in values {
    if pick_text(value, "name").as_deref() != Some(current) {
      continue;
    }
    let Some(Value::Array(targets)) = value.get("can_change_to") else {
      return Ok(Vec::new());
    };
    return Ok(
      targets
        .iter()
        .filter_map(|target| {
          let name = target.get("name").and_then(scalar_text)?;
          Some(Transition {
            id: name.clone(),
            name,
            comment_required: target.get("comment_required").and_then(Value::as_bool).unwrap_or(false),
          })
        })
        .collect(),
    );
  }
  debug!("Status {} is not in the workflow", current);
  Ok(Vec::new())
}

impl TransitionService for BugzillaClient {
  async fn discover(&self, issue: &IssueRecord) -> ActionResult<Discovery> {
    let bug = self.bug_document(issue.id()).await?;
    let current = pick_text(&bug, "status")
      .ok_or_else(|| ActionError::out_of_bound(format!("no status for {}", issue.id())))?;
    let field = self
      .rest
      .rest_map(Method::GET, &self.url(STATUS_FIELD_API), None)
      .await?;
    let transitions = reachable_from(&field, &current)?;
    debug!(
      "{} can move from {} to {:?}",
      issue.id(),
      current,
      transitions.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()
    );
    Ok(Discovery { current, transitions })
  }

  fn default_body(&self, transition: &Transition, issue: &IssueRecord) -> Value {
    let mut body = Map::new();
    body.insert("status".to_string(), Value::from(transition.name.as_str()));
    if transition.comment_required && issue.has(keys::COMMENTS) {
      body.insert("comment".to_string(), json!({ "body": issue.get(keys::COMMENTS) }));
    }
    Value::Object(body)
  }

  async fn execute(&self, issue: &IssueRecord, _transition: &Transition, body: &Value) -> ActionResult<()> {
    self.update(issue.id(), body).await
  }
}

impl BugzillaClient {
  /// Let the operator pick one legal status change and apply it
  pub async fn move_status(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    let discovery = self.discover(issue).await?;
    if discovery.transitions.is_empty() {
      return Err(ActionError::no_valid_results(format!(
        "no status changes from {} for {}",
        discovery.current,
        issue.id()
      )));
    }
    let transition = choose_transition(prompter, "", &discovery)?;
    let body = self.default_body(&transition, issue);
    self.execute(issue, &transition, &body).await?;
    Ok(vec![IssueRecord::with_id(issue.id()).field(keys::STATUS, transition.name)])
  }

  /// Body of one chain step: the status, plus resolution, solution and
  /// comment on the final step
  fn step_body(&self, step: &StepContext<'_>, resolution: Option<&str>) -> Value {
    let mut body = self.default_body(step.transition, step.issue);
    let Value::Object(map) = &mut body else {
      return body;
    };
    if !step.is_last {
      return body;
    }

    if let Some(resolution) = resolution {
      map.insert("resolution".to_string(), Value::from(resolution));
    }
    if step.issue.has(keys::SOLUTION) {
      for field in &self.server.fields.solution {
        map.insert(field.clone(), Value::from(step.issue.get(keys::SOLUTION)));
      }
    }
    if step.issue.has(keys::COMMENTS) {
      map.insert("comment".to_string(), json!({ "body": step.issue.get(keys::COMMENTS) }));
    }
    body
  }

  fn steps_of(&self, kind: &StateType) -> ActionResult<Vec<String>> {
    let steps = self.server.make_states(kind);
    if steps.is_empty() {
      return Err(ActionError::Config(format!(
        "no '{}' states configured for {}",
        kind.as_str(),
        self.server.name
      )));
    }
    Ok(steps)
  }

  /// Walk the `steps` chain, resolving the bug as `resolution` on the way out
  async fn transit(
    &self,
    prompter: &dyn Prompter,
    issue: &IssueRecord,
    steps: Vec<String>,
    resolution: Option<String>,
  ) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let chain = StepChain::new(steps).with_body(|step| self.step_body(step, resolution.as_deref()));
    let report = chain.run(self, prompter, issue).await?;
    info!("{} went through {}", issue.id(), report.executed.join(" -> "));

    let status = report.executed.last().cloned().unwrap_or_default();
    let mut record = IssueRecord::with_id(issue.id()).field(keys::STATUS, status);
    if let Some(resolution) = &resolution {
      record.set("resolution", resolution.as_str());
    }
    Ok(vec![record])
  }

  /// Walk the "transition reject" states, resolving with the first "rejected"
  /// resolution
  pub async fn reject(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    let steps = self.steps_of(&StateType::TransitionReject)?;
    let resolution = self.server.first_state(&StateType::ResolutionReject);
    self.transit(prompter, issue, steps, resolution).await
  }

  /// Walk the "transition close" states, resolving with the first "resolved"
  /// resolution
  pub async fn close(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    let steps = self.steps_of(&StateType::TransitionClose)?;
    let resolution = self.server.first_state(&StateType::ResolutionResolved);
    self.transit(prompter, issue, steps, resolution).await
  }
}
