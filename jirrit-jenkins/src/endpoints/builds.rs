use chrono::{DateTime, SecondsFormat};
use jirrit_core::fields::{parse_list, pick_text, scalar_text};
use jirrit_core::payload::{resolve_target, write_payload};
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, Prompter, keys};
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::client::JenkinsClient;
use crate::consts::{
  CAUSE_ACTION, CONSOLE_TEXT, DEFAULT_BUILD_COUNT, JSON_API, PARAMETERS_ACTION, TEXT_PARAMETERS, USER_ID_CAUSE,
};

fn class_of(value: &Value) -> &str {
  value.get("_class").and_then(Value::as_str).unwrap_or_default()
}

/// Text parameters become fields named after the parameter
fn collect_parameters(action: &Value, record: &mut IssueRecord) {
  let Some(Value::Array(parameters)) = action.get("parameters") else {
    debug!("Parameters action without parameters");
    return;
  };
  for parameter in parameters {
    if !TEXT_PARAMETERS.contains(&class_of(parameter)) {
      trace!("Skipping parameter of class {}", class_of(parameter));
      continue;
    }
    let (Some(name), Some(value)) = (pick_text(parameter, "name"), pick_text(parameter, "value")) else {
      continue;
    };
    if !name.is_empty() && !value.is_empty() {
      record.set(name, value);
    }
  }
}

/// The user who started the build
fn collect_cause(action: &Value, record: &mut IssueRecord) {
  let Some(Value::Array(causes)) = action.get("causes") else {
    return;
  };
  if let Some(user) = causes
    .iter()
    .filter(|cause| class_of(cause) == USER_ID_CAUSE)
    .find_map(|cause| pick_text(cause, "userName"))
  {
    record.set(keys::AUTHOR, user);
  }
}

fn build_record(build: &Map<String, Value>) -> IssueRecord {
  let mut record = IssueRecord::new();
  if let Some(Value::Array(actions)) = build.get("actions") {
    for action in actions {
      match class_of(action) {
        PARAMETERS_ACTION => collect_parameters(action, &mut record),
        CAUSE_ACTION => collect_cause(action, &mut record),
        _ => {}
      }
    }
  }

  if let Some(building) = build.get("building").filter(|value| value.is_boolean()).and_then(scalar_text) {
    record.set(keys::BUILDING, building);
  }
  if let Some(date) = build
    .get("timestamp")
    .and_then(Value::as_i64)
    .and_then(DateTime::from_timestamp_millis)
  {
    record.set(keys::DATE, date.to_rfc3339_opts(SecondsFormat::Secs, true));
  }
  if let Some(result) = build.get("result").and_then(scalar_text) {
    record.set(keys::RESULT, result);
  }
  record
}

impl JenkinsClient {
  /// Latest builds of a job, `count` of them or the default number
  pub async fn list_builds(&self, job: &str, count: usize) -> ActionResult<IssueSet> {
    let count = if count == 0 { DEFAULT_BUILD_COUNT } else { count };
    let url = self.job_url(job, &format!("{}?tree=builds[number,url]{{,{}}}", JSON_API, count));
    let body = self.rest.rest_map(Method::GET, &url, None).await?;
    parse_list(&body, "builds", |build| {
      let build = Value::Object(build.clone());
      let number = pick_text(&build, "number")?;
      let url = pick_text(&build, "url")?;
      Some(IssueRecord::with_id(number).field(keys::URL, url))
    })
  }

  /// Builds of the job in `project`, as many as `size` asks for
  pub async fn builds(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    let job = self.choose_job(prompter, issue).await?;
    let count = if issue.has(keys::SIZE) {
      issue
        .get(keys::SIZE)
        .trim()
        .parse::<usize>()
        .map_err(|_| ActionError::invalid_input(format!("{} is not a build count", issue.get(keys::SIZE))))?
    } else {
      0
    };
    self.list_builds(&job, count).await
  }

  /// Parameters, starter, state, start time and result of a build
  pub async fn build_detail(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    let (job, number) = self.choose_build(prompter, issue).await?;
    let url = self.job_url(&job, &format!("{}/{}", number, JSON_API));
    let body = self.rest.rest_map(Method::GET, &url, None).await?;

    let record = build_record(&body);
    if record.is_empty() {
      return Err(ActionError::no_valid_results(format!("no details of {} #{}", job, number)));
    }
    Ok(vec![record])
  }

  /// Console log of a build, saved to `file` when one is given
  pub async fn build_log(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    let (job, number) = self.choose_build(prompter, issue).await?;
    let url = self.job_url(&job, &format!("{}/{}", number, CONSOLE_TEXT));
    let log = self.rest.rest_bytes(Method::GET, &url).await?;

    let record = IssueRecord::with_id(number.as_str()).field(keys::PROJECT, job.as_str());
    if issue.has(keys::FILE) {
      let path = resolve_target(issue.get(keys::FILE), &format!("{}-{}.log", job, number))?;
      write_payload(&path, &log)?;
      return Ok(vec![
        record
          .field(keys::FILE, path.to_string_lossy())
          .field(keys::SIZE, log.len().to_string()),
      ]);
    }
    Ok(vec![record.field(keys::DATA, String::from_utf8_lossy(&log))])
  }
}
