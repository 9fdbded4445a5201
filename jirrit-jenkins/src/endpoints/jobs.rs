use jirrit_core::fields::{parse_list, pick_text};
use jirrit_core::{ActionResult, IssueRecord, IssueSet, keys};
use reqwest::Method;
use serde_json::Value;

use crate::client::JenkinsClient;
use crate::consts::JSON_API;

impl JenkinsClient {
  /// Jobs on the server with their URLs, at most `limit` of them unless it is 0
  pub async fn list_jobs(&self, limit: usize) -> ActionResult<IssueSet> {
    let body = self.rest.rest_map(Method::GET, &self.url(JSON_API), None).await?;
    let mut jobs = parse_list(&body, "jobs", |job| {
      let job = Value::Object(job.clone());
      let name = pick_text(&job, "name")?;
      let url = pick_text(&job, "url")?;
      let mut record = IssueRecord::new().field(keys::NAME, name).field(keys::URL, url);
      if let Some(color) = pick_text(&job, "color") {
        record.set(keys::STATUS, color);
      }
      Some(record)
    })?;
    if limit > 0 {
      jobs.truncate(limit);
    }
    Ok(jobs)
  }
}
