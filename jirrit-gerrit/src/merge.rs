//! # Score and Merge
//!
//! Polls a change until the server reports it submittable, scoring it once
//! along the way, then submits it. The loop has no upper bound: approvals
//! from other reviewers or CI are what end it.

use std::time::Duration;

use jirrit_core::output::print_progress;
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, Prompter, Sleeper, keys};
use tracing::{Level, debug, enabled, info, warn};

use crate::client::GerritClient;
use crate::consts::{LABEL_CODE_REVIEW, LABEL_VERIFIED};
use crate::endpoints::review::label_value;
use crate::endpoints::{ChangeFilter, ChangeStatus};

/// Wait between two polls of the change detail
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Approvals summed over all reviewers of a change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTally {
  pub verified: i64,
  pub code_review: i64,
  /// The configured extra label, when there is one
  pub extra: i64,
}

impl ScoreTally {
  /// Sum the label columns of reviewer records
  pub fn from_reviewers(reviewers: &IssueSet, extra_label: Option<&str>) -> Self {
    let sum = |label: &str| -> i64 {
      reviewers
        .iter()
        .filter_map(|reviewer| label_value(reviewer.get(label)))
        .sum()
    };
    Self {
      verified: sum(LABEL_VERIFIED),
      code_review: sum(LABEL_CODE_REVIEW),
      extra: extra_label.map(sum).unwrap_or_default(),
    }
  }

  /// Whether the change still lacks approvals
  pub fn needs_score(&self, has_extra_label: bool) -> bool {
    self.code_review < 2 || self.verified < 1 || (has_extra_label && self.extra < 1)
  }
}

/// Poll `id` until it is submittable, then submit it.
///
/// With `score` set the change is scored on the first poll that finds
/// approvals missing; later polls never score again. A failed score is
/// logged and the loop keeps waiting for approvals from elsewhere.
pub async fn score_and_merge<S: Sleeper>(
  client: &GerritClient,
  sleeper: &S,
  id: &str,
  score: bool,
) -> ActionResult<IssueSet> {
  let mut scored = !score;
  let mut revisions_logged = false;
  let mut verified_noted = false;
  let has_extra = client.score_label().is_some();

  let canonical = loop {
    let detail = client.detail(id).await?;
    let canonical = detail.id().to_string();
    if detail.get(keys::STATUS) == "MERGED" {
      info!("{} is already merged", canonical);
      return Ok(vec![detail]);
    }
    if detail.get(keys::MERGEABLE) == "false" {
      return Err(ActionError::no_valid_results(format!(
        "{} cannot be merged without a rebase",
        canonical
      )));
    }
    if detail.get(keys::SUBMITTABLE) == "true" {
      break canonical;
    }

    if !revisions_logged && enabled!(Level::DEBUG) {
      revisions_logged = true;
      match client.revisions(&canonical).await {
        Ok(revisions) => {
          for revision in revisions {
            debug!("{} revision {} submit type {}", canonical, revision.id(), revision.get(keys::SUBMIT_TYPE));
          }
        }
        Err(err) => debug!("Revisions of {} unavailable: {}", canonical, err),
      }
    }

    let reviewers = client.reviewers(&canonical).await?;
    let tally = ScoreTally::from_reviewers(&reviewers, client.score_label());
    debug!("{} approvals: {:?}", canonical, tally);

    if tally.needs_score(has_extra) {
      if !scored {
        scored = true;
        match client.score(&canonical, "", "").await {
          Ok(applied) => debug!("Applied scores to {}:\n{}", canonical, applied),
          Err(err) => warn!("Scoring {} failed, waiting for approvals elsewhere: {}", canonical, err),
        }
      } else if tally.verified < 1 && !verified_noted {
        verified_noted = true;
        info!("{} on {} is expected elsewhere", LABEL_VERIFIED, canonical);
      }
    }

    sleeper.sleep(POLL_INTERVAL).await;
    print_progress();
  };

  let mut merged = client.submit(&canonical).await?;
  if merged.is_empty() {
    merged.push(IssueRecord::with_id(canonical));
  }
  Ok(merged)
}

/// Wait for and merge every open change of `owner` without scoring them
pub async fn wait_merge_open_of<S: Sleeper>(
  client: &GerritClient,
  sleeper: &S,
  prompter: &dyn Prompter,
  owner: &str,
) -> ActionResult<IssueSet> {
  if !prompter.is_interactive() {
    return Err(ActionError::invalid_input(
      "waiting on someone's open changes needs an interactive session",
    ));
  }
  if owner.is_empty() {
    return Err(ActionError::invalid_input("an owner is required"));
  }

  let filter = ChangeFilter {
    owner: owner.to_string(),
    ..ChangeFilter::default()
  };
  let changes = client.list_changes(ChangeStatus::Open, &filter).await?;
  if changes.is_empty() {
    return Err(ActionError::no_valid_results(format!("{} has no open changes", owner)));
  }
  let prompt = format!("Wait for and merge {} open changes of {}?", changes.len(), owner);
  if !prompter.confirm(&prompt, true)? {
    return Err(ActionError::Cancelled);
  }

  let mut merged = IssueSet::new();
  for change in &changes {
    merged.extend(score_and_merge(client, sleeper, change.id(), false).await?);
  }
  Ok(merged)
}

#[cfg(test)]
mod tests {
  use jirrit_core::{Answer, Category, InstantSleeper, ScriptedPrompter};
  use jirrit_test_utils::{test_rest, test_server};
  use serde_json::json;
  use wiremock::matchers::{body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  fn client(mock_server: &MockServer) -> GerritClient {
    let server = test_server(Category::Gerrit, &mock_server.uri());
    GerritClient::new(&server, test_rest(&server))
  }

  async fn mount_detail(mock_server: &MockServer, submittable: bool, times: Option<u64>) {
    let mock = Mock::given(method("GET")).and(path("/changes/")).respond_with(
      ResponseTemplate::new(200).set_body_json(json!([{"id": "c1", "status": "NEW", "submittable": submittable}])),
    );
    match times {
      Some(times) => mock.up_to_n_times(times).mount(mock_server).await,
      None => mock.mount(mock_server).await,
    }
  }

  #[test]
  fn test_tally_sums_reviewers() {
    let reviewers = vec![
      IssueRecord::with_id("1").field("Code-Review", "+1").field("Verified", "+1"),
      IssueRecord::with_id("2").field("Code-Review", "+1").field("Sanity", " 0"),
    ];
    let tally = ScoreTally::from_reviewers(&reviewers, Some("Sanity"));
    assert_eq!(
      tally,
      ScoreTally {
        verified: 1,
        code_review: 2,
        extra: 0
      }
    );
    assert!(!tally.needs_score(false));
    assert!(tally.needs_score(true));
  }

  #[tokio::test]
  async fn test_score_then_merge() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_detail(&mock_server, false, Some(1)).await;
    mount_detail(&mock_server, true, None).await;
    Mock::given(method("GET"))
      .and(path("/changes/c1/reviewers/"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/changes/c1/revisions/current/review"))
      .and(body_json(json!({"labels": {"Code-Review": 2, "Verified": 1}})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/changes/c1/submit"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "c1", "status": "MERGED"})))
      .expect(1)
      .mount(&mock_server)
      .await;

    let sleeper = InstantSleeper::new();
    let merged = score_and_merge(&client(&mock_server), &sleeper, "c1", true).await?;

    assert_eq!(merged[0].get(keys::STATUS), "MERGED");
    assert_eq!(sleeper.waits(), vec![POLL_INTERVAL]);
    Ok(())
  }

  #[tokio::test]
  async fn test_scores_only_once() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_detail(&mock_server, false, Some(3)).await;
    mount_detail(&mock_server, true, None).await;
    Mock::given(method("GET"))
      .and(path("/changes/c1/reviewers/"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"_account_id": 1, "approvals": {"Code-Review": "+2", "Verified": " 0"}}
      ])))
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/changes/c1/revisions/current/review"))
      .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/changes/c1/submit"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "c1", "status": "MERGED"})))
      .expect(1)
      .mount(&mock_server)
      .await;

    let sleeper = InstantSleeper::new();
    score_and_merge(&client(&mock_server), &sleeper, "c1", true).await?;
    assert_eq!(sleeper.waits().len(), 3);
    Ok(())
  }

  #[tokio::test]
  async fn test_unmergeable_change_stops() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/changes/"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "c1", "status": "NEW"}])))
      .mount(&mock_server)
      .await;
    Mock::given(method("GET"))
      .and(path("/changes/c1/revisions/current/mergeable"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"mergeable": false})))
      .mount(&mock_server)
      .await;

    let result = score_and_merge(&client(&mock_server), &InstantSleeper::new(), "c1", true).await;
    assert!(matches!(result, Err(ActionError::NoValidResults(_))));
  }

  #[tokio::test]
  async fn test_bulk_wait_merge_is_interactive_only() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let client = client(&mock_server);
    let sleeper = InstantSleeper::new();

    let silent = wait_merge_open_of(&client, &sleeper, &ScriptedPrompter::silent(), "bob").await;
    assert!(matches!(silent, Err(ActionError::InvalidInput(_))));

    Mock::given(method("GET"))
      .and(path("/changes/"))
      .and(query_param("q", "status:open owner:bob"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "c1"}])))
      .mount(&mock_server)
      .await;
    Mock::given(method("GET"))
      .and(path("/changes/"))
      .and(query_param("q", "c1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "c1", "submittable": true}])))
      .mount(&mock_server)
      .await;
    Mock::given(method("POST"))
      .and(path("/changes/c1/submit"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "c1", "status": "MERGED"})))
      .expect(1)
      .mount(&mock_server)
      .await;

    let prompter = ScriptedPrompter::with_answers([Answer::Confirm(true)]);
    let merged = wait_merge_open_of(&client, &sleeper, &prompter, "bob").await?;
    assert_eq!(merged.len(), 1);
    assert!(sleeper.waits().is_empty());
    Ok(())
  }
}
