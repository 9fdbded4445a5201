use std::collections::BTreeMap;

use jirrit_core::fields::project_fields;
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, Prompter, keys};
use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use super::changes::require_id;
use crate::client::{GerritClient, escape};
use crate::consts::{ISSUE_INFO, LABEL_CODE_REVIEW, LABEL_VERIFIED};

/// Labels and the values a score request sets
pub type ScoreLabels = BTreeMap<String, i64>;

/// Numeric value of an approval such as `+2`, ` 0` or `-1`
pub(crate) fn label_value(text: &str) -> Option<i64> {
  let text = text.trim();
  text.strip_prefix('+').unwrap_or(text).parse().ok()
}

/// Highest positive value among label value names
fn highest_positive<'a>(values: impl Iterator<Item = &'a str>) -> Option<i64> {
  values.filter_map(label_value).filter(|value| *value > 0).max()
}

impl GerritClient {
  /// POST a change action and parse whatever change comes back
  async fn change_action(&self, id: &str, action: &str, body: Option<&Value>) -> ActionResult<IssueSet> {
    require_id(id)?;
    let url = self.url(&format!("changes/{}/{}", escape(id), action));
    let payload = self.rest.rest_sth(Method::POST, &url, body).await?;
    Ok(
      payload
        .into_maps()
        .iter()
        .map(|change| project_fields(change, ISSUE_INFO))
        .collect(),
    )
  }

  pub async fn rebase(&self, id: &str) -> ActionResult<IssueSet> {
    self.change_action(id, "rebase", None).await
  }

  pub async fn abandon(&self, id: &str, message: &str) -> ActionResult<IssueSet> {
    let body = (!message.is_empty()).then(|| json!({ "message": message }));
    self.change_action(id, "abandon", body.as_ref()).await
  }

  pub async fn revert(&self, id: &str, message: &str) -> ActionResult<IssueSet> {
    let body = (!message.is_empty()).then(|| json!({ "message": message }));
    self.change_action(id, "revert", body.as_ref()).await
  }

  /// Submit without checking first
  pub async fn submit(&self, id: &str) -> ActionResult<IssueSet> {
    self.change_action(id, "submit", None).await
  }

  /// Submit a change only when a fresh detail says it is submittable
  pub async fn merge(&self, id: &str) -> ActionResult<IssueSet> {
    let detail = self.detail(id).await?;
    if detail.get(keys::STATUS) == "MERGED" {
      return Err(ActionError::InExistence(format!("{} is already merged", detail.id())));
    }
    if detail.get(keys::SUBMITTABLE) != "true" {
      return Err(ActionError::no_valid_results(format!("{} is not submittable", detail.id())));
    }
    self.submit(detail.id()).await
  }

  /// Cherry-pick a change onto the branch named in `issue`
  pub async fn cherry_pick(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    require_id(issue.id())?;
    let branch = issue.get(keys::BRANCH);
    if branch.is_empty() {
      return Err(ActionError::invalid_input("a destination branch is required"));
    }

    let revision = if issue.has(keys::REV_CUR) {
      issue.get(keys::REV_CUR).to_string()
    } else {
      self.current_revision(issue.id()).await?.get(keys::REV_CUR).to_string()
    };

    if prompter.is_interactive() {
      let prompt = format!("Cherry-pick {} ({}) to {}?", issue.id(), revision, branch);
      if !prompter.confirm(&prompt, true)? {
        return Err(ActionError::Cancelled);
      }
    }

    let mut body = Map::new();
    body.insert("destination".to_string(), Value::from(branch));
    if issue.has(keys::COMMENTS) {
      body.insert("message".to_string(), Value::from(issue.get(keys::COMMENTS)));
    }
    self
      .change_action(
        issue.id(),
        &format!("revisions/{}/cherrypick", revision),
        Some(&Value::Object(body)),
      )
      .await
  }

  /// Labels a score request should set.
  ///
  /// Each label that is not yet approved gets the highest positive value the
  /// user may give. Without usable label details the defaults apply.
  pub async fn score_labels(&self, id: &str) -> ActionResult<ScoreLabels> {
    require_id(id)?;
    let url = self.url(&format!("changes/{}/detail", escape(id)));
    let detail = match self.rest.rest_map(Method::GET, &url, None).await {
      Ok(detail) => detail,
      Err(err) => {
        debug!("Label details of {} unavailable, using defaults: {}", id, err);
        return Ok(self.default_labels());
      }
    };

    let Some(Value::Object(labels)) = detail.get("labels") else {
      return Ok(self.default_labels());
    };
    let permitted = detail.get("permitted_labels").and_then(Value::as_object);

    let mut chosen = ScoreLabels::new();
    for (label, info) in labels {
      if info.get("approved").is_some() {
        continue;
      }
      let best = match permitted {
        Some(permitted) => permitted
          .get(label)
          .and_then(Value::as_array)
          .and_then(|values| highest_positive(values.iter().filter_map(Value::as_str))),
        None => info
          .get("values")
          .and_then(Value::as_object)
          .and_then(|values| highest_positive(values.keys().map(String::as_str))),
      };
      if let Some(best) = best {
        chosen.insert(label.clone(), best);
      }
    }

    if chosen.is_empty() {
      return Err(ActionError::InExistence(format!("every label of {} is already approved", id)));
    }
    Ok(chosen)
  }

  /// Code-Review +2, Verified +1 and the configured extra label +1
  pub fn default_labels(&self) -> ScoreLabels {
    let mut labels = ScoreLabels::from([
      (LABEL_CODE_REVIEW.to_string(), 2),
      (LABEL_VERIFIED.to_string(), 1),
    ]);
    if let Some(extra) = self.score_label() {
      labels.insert(extra.to_string(), 1);
    }
    labels
  }

  async fn post_review(&self, url: &str, labels: &ScoreLabels, message: &str) -> ActionResult<()> {
    let mut body = json!({ "labels": labels });
    if !message.is_empty() {
      body["message"] = Value::from(message);
    }
    self.rest.rest_sth(Method::POST, url, Some(&body)).await?;
    Ok(())
  }

  /// Score a revision (current when `revision` is empty).
  ///
  /// When the server answers that Verified is restricted for this user, the
  /// request is repeated once without it. Returns the labels that were set.
  pub async fn score(&self, id: &str, revision: &str, message: &str) -> ActionResult<IssueRecord> {
    let mut labels = self.score_labels(id).await?;
    let revision = if revision.is_empty() { "current" } else { revision };
    let url = self.url(&format!("changes/{}/revisions/{}/review", escape(id), revision));

    match self.post_review(&url, &labels, message).await {
      Ok(()) => {}
      Err(err)
        if labels.contains_key(LABEL_VERIFIED)
          && err.response_body().is_some_and(|body| body.contains("restricted")) =>
      {
        warn!("{} is restricted on {}, scoring without it", LABEL_VERIFIED, id);
        labels.remove(LABEL_VERIFIED);
        if labels.is_empty() {
          return Err(err);
        }
        self.post_review(&url, &labels, message).await?;
      }
      Err(err) => return Err(err),
    }

    info!("Scored {} with {:?}", id, labels);
    let mut record = IssueRecord::with_id(id);
    for (label, value) in &labels {
      record.set(label.as_str(), format!("{:+}", value));
    }
    Ok(record)
  }

  /// Run `body` on each of my open changes, seeded with its current revision
  async fn for_each_my_open<F>(&self, mut body: F) -> ActionResult<IssueSet>
  where
    F: AsyncFnMut(IssueRecord) -> ActionResult<IssueSet>,
  {
    let changes = self.my_open().await?;
    if changes.is_empty() {
      return Err(ActionError::no_valid_results("no open changes"));
    }

    let mut results = IssueSet::new();
    for change in changes {
      let mut seed = change.clone();
      seed.merge(&self.current_revision(change.id()).await?);
      results.extend(body(seed).await?);
    }
    Ok(results)
  }

  /// Current revision and cherry-pick command of each of my open changes
  pub async fn my_open_commits(&self) -> ActionResult<IssueSet> {
    self.for_each_my_open(async |seed| Ok(vec![seed])).await
  }

  /// Abandon every change I have open, after one confirmation
  pub async fn abandon_all_my_open(&self, prompter: &dyn Prompter, message: &str) -> ActionResult<IssueSet> {
    if prompter.is_interactive() && !prompter.confirm("Abandon all of your open changes?", false)? {
      return Err(ActionError::Cancelled);
    }
    self.for_each_my_open(async |seed| self.abandon(seed.id(), message).await).await
  }

  /// Cherry-pick every change I have open onto `branch`
  pub async fn cherry_pick_all_my_open(&self, prompter: &dyn Prompter, branch: &str) -> ActionResult<IssueSet> {
    if branch.is_empty() {
      return Err(ActionError::invalid_input("a destination branch is required"));
    }
    self
      .for_each_my_open(async |seed| {
        let seed = seed.field(keys::BRANCH, branch);
        self.cherry_pick(prompter, &seed).await
      })
      .await
  }
}
