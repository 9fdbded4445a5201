use jirrit_core::fields::{collect_strings, find_key, pick_text, scalar_text};
use jirrit_core::input::require_input;
use jirrit_core::server::StateType;
use jirrit_core::transition::choose_transition;
use jirrit_core::{
  ActionError, ActionResult, Discovery, IssueRecord, IssueSet, Prompter, RestError, StepChain, Transition,
  TransitionService, keys,
};
use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::client::{JiraClient, require_id};

/// Test step recorded by "close with default design steps"
pub const DEFAULT_DESIGN_STEP: &str = "default design";

/// Test step recorded by "close with general requirement steps"
pub const GENERAL_REQUIREMENT_STEP: &str = "general requirement";

fn parse_transitions(body: &Map<String, Value>) -> Vec<Transition> {
  let Some(Value::Array(items)) = body.get("transitions") else {
    return Vec::new();
  };
  items
    .iter()
    .filter_map(|item| {
      let name = item.get("name").and_then(scalar_text)?;
      let id = item.get("id").and_then(scalar_text)?;
      Some(Transition {
        name,
        id,
        comment_required: false,
      })
    })
    .collect()
}

impl TransitionService for JiraClient {
  async fn discover(&self, issue: &IssueRecord) -> ActionResult<Discovery> {
    require_id(issue.id())?;
    let body = self
      .rest
      .rest_map(Method::GET, &self.issue_url(issue.id(), "/transitions"), None)
      .await?;
    let transitions = parse_transitions(&body);
    debug!(
      "{} can move to {:?}",
      issue.id(),
      transitions.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()
    );
    let current = if issue.has(keys::STATUS) { issue.get(keys::STATUS) } else { issue.id() };
    Ok(Discovery {
      current: current.to_string(),
      transitions,
    })
  }

  fn default_body(&self, transition: &Transition, _issue: &IssueRecord) -> Value {
    json!({ "transition": { "id": transition.id } })
  }

  async fn execute(&self, issue: &IssueRecord, transition: &Transition, body: &Value) -> ActionResult<()> {
    let url = self.issue_url(issue.id(), "/transitions");
    match self.rest.rest_sth(Method::POST, &url, Some(body)).await {
      Ok(_) => Ok(()),
      Err(err @ RestError::BadRequest { .. }) => {
        self.log_required_fields(issue.id(), &transition.name).await;
        Err(err.into())
      }
      Err(err) => Err(err.into()),
    }
  }
}

impl JiraClient {
  /// Log the fields a refused transition would have needed
  async fn log_required_fields(&self, id: &str, transition: &str) {
    let url = self.issue_url(id, "/transitions?expand=transitions.fields");
    let body = match self.rest.rest_map(Method::GET, &url, None).await {
      Ok(body) => body,
      Err(err) => {
        debug!("Required fields of {} unavailable: {}", id, err);
        return;
      }
    };

    let Some(Value::Array(items)) = body.get("transitions") else {
      return;
    };
    for item in items {
      let Some(Value::Object(fields)) = item.get("fields") else {
        continue;
      };
      let target = item.get("name").and_then(scalar_text).unwrap_or_default();
      for (field, meta) in fields {
        if meta.get("required").and_then(Value::as_bool) != Some(true) {
          continue;
        }
        let name = pick_text(meta, "name").unwrap_or_else(|| field.clone());
        let allowed = meta
          .get("allowedValues")
          .map(|values| collect_strings(values, "value"))
          .unwrap_or_default();
        warn!(
          "{} to {} requires {} ({}) {}",
          transition,
          target,
          name,
          field,
          allowed.join("/")
        );
      }
    }
  }

  /// Let the operator pick one legal transition and apply it
  pub async fn move_status(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    let discovery = self.discover(issue).await?;
    if discovery.transitions.is_empty() {
      return Err(ActionError::no_valid_results(format!("no transitions for {}", issue.id())));
    }
    let transition = choose_transition(prompter, "", &discovery)?;
    let body = self.default_body(&transition, issue);
    self.execute(issue, &transition, &body).await?;
    Ok(vec![IssueRecord::with_id(issue.id()).field(keys::STATUS, transition.name)])
  }

  /// Walk `steps`, posting the issue's comment first when it has one
  async fn comment_and_transit(
    &self,
    prompter: &dyn Prompter,
    issue: &IssueRecord,
    steps: Vec<String>,
  ) -> ActionResult<IssueSet> {
    let chain = StepChain::new(steps);
    let report = chain
      .run_with_hook(self, prompter, issue, async || {
        if issue.has(keys::COMMENTS)
          && let Err(err) = self.add_comment(issue).await
        {
          warn!("Commenting on {} failed: {}", issue.id(), err);
        }
        Ok(())
      })
      .await?;
    info!("{} went through {}", issue.id(), report.executed.join(" -> "));

    let status = report.executed.last().cloned().unwrap_or_default();
    Ok(vec![IssueRecord::with_id(issue.id()).field(keys::STATUS, status)])
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

  /// The reject reason to record: `key`, a value allowed by the edit meta
  /// data, or one typed by the operator
  async fn reject_reason(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<String> {
    if issue.has(keys::KEY) {
      return Ok(issue.get(keys::KEY).to_string());
    }

    let field = &self.server.fields.rejectrsn;
    let choices = match self
      .rest
      .rest_map(Method::GET, &self.issue_url(issue.id(), "/editmeta"), None)
      .await
    {
      Ok(meta) => find_key(&Value::Object(meta), field)
        .map(|found| collect_strings(found, "value"))
        .unwrap_or_default(),
      Err(err) => {
        debug!("Edit meta data of {} unavailable: {}", issue.id(), err);
        Vec::new()
      }
    };

    match choices.len() {
      0 => {
        debug!("No choices found for {}", field);
        let mut record = issue.clone();
        require_input(prompter, &mut record, keys::KEY, "reject reason")?;
        Ok(record.get(keys::KEY).to_string())
      }
      1 => Ok(choices[0].clone()),
      _ if prompter.is_interactive() => {
        let index = prompter.select("Reject reason", &choices)?.ok_or(ActionError::Cancelled)?;
        Ok(choices[index].clone())
      }
      _ => Err(ActionError::invalid_input(format!(
        "a reject reason is required, one of {}",
        choices.join(", ")
      ))),
    }
  }

  /// Record a reject reason when the server has a field for it, then walk
  /// the "transition reject" states
  pub async fn reject(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let steps = self.steps_of(&StateType::TransitionReject)?;

    if !self.server.fields.rejectrsn.is_empty() {
      let reason = self.reject_reason(prompter, issue).await?;
      let mut fields = Map::new();
      fields.insert(self.server.fields.rejectrsn.clone(), json!({ "value": reason }));
      self.edit_fields(issue.id(), fields).await?;
    }
    self.comment_and_transit(prompter, issue, steps).await
  }

  /// Record `test_step` in the test fields, then walk the "transition close"
  /// states
  async fn close_with_step(
    &self,
    prompter: &dyn Prompter,
    issue: &IssueRecord,
    test_step: &str,
  ) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let steps = self.steps_of(&StateType::TransitionClose)?;

    if !test_step.is_empty() {
      let dictionary = &self.server.fields;
      let mut fields = Map::new();
      for (field, value) in [
        (&dictionary.testpre, "none"),
        (&dictionary.teststep, test_step),
        (&dictionary.testexp, "none"),
      ] {
        if !field.is_empty() {
          fields.insert(field.clone(), Value::from(value));
        }
      }
      if fields.is_empty() {
        warn!("No test fields are configured for {}", self.server.name);
      } else {
        self.edit_fields(issue.id(), fields).await?;
      }
    }
    self.comment_and_transit(prompter, issue, steps).await
  }

  /// Close, recording the test step given in `component` if any
  pub async fn close(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    self.close_with_step(prompter, issue, issue.get(keys::COMPONENT)).await
  }

  /// Close with the default design test step
  pub async fn close_default(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    self.close_with_step(prompter, issue, DEFAULT_DESIGN_STEP).await
  }

  /// Close with the general requirement test step
  pub async fn close_general(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    self.close_with_step(prompter, issue, GENERAL_REQUIREMENT_STEP).await
  }
}

#[cfg(test)]
mod tests {
  use jirrit_core::server::StateBinding;
  use jirrit_core::{Answer, Category, ScriptedPrompter, ServerDescriptor};
  use jirrit_test_utils::{test_rest, test_server};
  use wiremock::matchers::{body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  fn server_with_states(mock_server: &MockServer, kind: StateType, states: &[&str]) -> ServerDescriptor {
    let mut server = test_server(Category::Jira, &mock_server.uri());
    server.states = states.iter().map(|state| StateBinding::new(kind.clone(), *state)).collect();
    server
  }

  fn transitions(items: &[(&str, &str)]) -> ResponseTemplate {
    let items: Vec<Value> = items.iter().map(|(id, name)| json!({"id": id, "name": name})).collect();
    ResponseTemplate::new(200).set_body_json(json!({ "transitions": items }))
  }

  #[tokio::test]
  async fn test_reject_chain_skips_unreachable_step() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let server = server_with_states(&mock_server, StateType::TransitionReject, &["A", "B", "C"]);
    let client = JiraClient::new(&server, test_rest(&server));

    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .respond_with(transitions(&[("21", "B")]))
      .up_to_n_times(2)
      .mount(&mock_server)
      .await;
    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .respond_with(transitions(&[("31", "C")]))
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/api/latest/issue/X-1/comment"))
      .and(body_json(json!({"body": "not reproducible"})))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "5"})))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .and(body_json(json!({"transition": {"id": "21"}})))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .and(body_json(json!({"transition": {"id": "31"}})))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;

    let seed = IssueRecord::with_id("X-1").field(keys::COMMENTS, "not reproducible");
    let result = client.reject(&ScriptedPrompter::silent(), &seed).await?;
    assert_eq!(result[0].get(keys::STATUS), "C");

    let requests = mock_server.received_requests().await.unwrap_or_default();
    let posts = requests.iter().filter(|request| request.method.as_str() == "POST").count();
    assert_eq!(posts, 3);
    Ok(())
  }

  #[tokio::test]
  async fn test_reject_without_states_is_config_error() {
    let mock_server = MockServer::start().await;
    let server = test_server(Category::Jira, &mock_server.uri());
    let client = JiraClient::new(&server, test_rest(&server));

    let result = client.reject(&ScriptedPrompter::silent(), &IssueRecord::with_id("X-1")).await;
    assert!(matches!(result, Err(ActionError::Config(_))));
  }

  #[tokio::test]
  async fn test_reject_reason_from_edit_meta() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let mut server = server_with_states(&mock_server, StateType::TransitionReject, &["Rejected"]);
    server.fields.rejectrsn = "customfield_9".to_string();
    let client = JiraClient::new(&server, test_rest(&server));

    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-1/editmeta"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "fields": {"customfield_9": {"allowedValues": [{"value": "Duplicate"}, {"value": "Won't Fix"}]}}
      })))
      .mount(&mock_server)
      .await;
    Mock::given(method("PUT"))
      .and(path("/rest/api/latest/issue/X-1"))
      .and(body_json(json!({"fields": {"customfield_9": {"value": "Won't Fix"}}})))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .respond_with(transitions(&[("11", "Rejected")]))
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;

    let prompter = ScriptedPrompter::with_answers([Answer::Select(1)]);
    client.reject(&prompter, &IssueRecord::with_id("X-1")).await?;
    assert_eq!(prompter.remaining(), 0);
    Ok(())
  }

  #[tokio::test]
  async fn test_close_records_test_fields() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let mut server = server_with_states(&mock_server, StateType::TransitionClose, &["Closed"]);
    server.fields.testpre = "customfield_1".to_string();
    server.fields.teststep = "customfield_2".to_string();
    server.fields.testexp = "customfield_3".to_string();
    let client = JiraClient::new(&server, test_rest(&server));

    Mock::given(method("PUT"))
      .and(path("/rest/api/latest/issue/X-1"))
      .and(body_json(json!({"fields": {
        "customfield_1": "none",
        "customfield_2": "general requirement",
        "customfield_3": "none"
      }})))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .respond_with(transitions(&[("41", "Closed")]))
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .and(body_json(json!({"transition": {"id": "41"}})))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;

    client
      .close_general(&ScriptedPrompter::silent(), &IssueRecord::with_id("X-1"))
      .await?;
    Ok(())
  }

  #[tokio::test]
  async fn test_refused_transition_fetches_required_fields() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let server = test_server(Category::Jira, &mock_server.uri());
    let client = JiraClient::new(&server, test_rest(&server));

    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .and(query_param("expand", "transitions.fields"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"transitions": [{
        "id": "5", "name": "Resolve",
        "fields": {"resolution": {"required": true, "name": "Resolution", "allowedValues": [{"value": "Fixed"}]}}
      }]})))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .respond_with(ResponseTemplate::new(400).set_body_string("{\"errors\":{\"resolution\":\"required\"}}"))
      .mount(&mock_server)
      .await;

    let transition = Transition {
      name: "Resolve".to_string(),
      id: "5".to_string(),
      comment_required: false,
    };
    let issue = IssueRecord::with_id("X-1");
    let body = client.default_body(&transition, &issue);
    let result = client.execute(&issue, &transition, &body).await;
    assert!(matches!(result, Err(ActionError::Rest(RestError::BadRequest { .. }))));
    Ok(())
  }

  #[tokio::test]
  async fn test_move_status_prompts() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let server = test_server(Category::Jira, &mock_server.uri());
    let client = JiraClient::new(&server, test_rest(&server));

    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .respond_with(transitions(&[("11", "Start"), ("21", "Resolve")]))
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/rest/api/latest/issue/X-1/transitions"))
      .and(body_json(json!({"transition": {"id": "21"}})))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;

    let prompter = ScriptedPrompter::with_answers([Answer::Select(1)]);
    let moved = client.move_status(&prompter, &IssueRecord::with_id("X-1")).await?;
    assert_eq!(moved[0].get(keys::STATUS), "Resolve");

    let silent = client.move_status(&ScriptedPrompter::silent(), &IssueRecord::with_id("X-1")).await;
    assert!(matches!(silent, Err(ActionError::InvalidInput(_))));
    Ok(())
  }
}
