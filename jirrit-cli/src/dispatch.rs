//! # Action Dispatch
//!
//! One authenticated client per selected server, and the mapping from a
//! catalog action onto the adapter call that performs it.

use anyhow::{Context, Result};
use jirrit_bugzilla::{BugzillaClient, create_bugzilla_client};
use jirrit_core::server::{Category, ServerDescriptor};
use jirrit_core::{ActionError, ActionResult, AuthInfo, IssueRecord, IssueSet, Prompter, TokioSleeper, keys};
use jirrit_gerrit::{
  ChangeFilter, ChangeStatus, GerritClient, create_gerrit_client, score_and_merge, wait_merge_open_of,
};
use jirrit_jenkins::{JenkinsClient, create_jenkins_client};
use jirrit_jira::{JiraClient, create_jira_client};
use tracing::debug;

use crate::catalog::Action;

/// Client for the selected server
#[derive(Debug)]
pub enum ServiceClient {
  Jira(JiraClient),
  Gerrit(GerritClient),
  Bugzilla(BugzillaClient),
  Jenkins(JenkinsClient),
}

fn not_offered(action: Action, category: &str) -> ActionError {
  ActionError::invalid_input(format!("{:?} is not offered by {} servers", action, category))
}

/// Change filter from the owner in `id` and the `project` and `branch` fields
fn change_filter(issue: &IssueRecord) -> ChangeFilter {
  ChangeFilter {
    owner: issue.id().to_string(),
    project: issue.get(keys::PROJECT).to_string(),
    branch: issue.get(keys::BRANCH).to_string(),
    ..ChangeFilter::default()
  }
}

/// Result limit from `size`; empty means no limit
fn size_limit(issue: &IssueRecord) -> ActionResult<usize> {
  let size = issue.get(keys::SIZE).trim();
  if size.is_empty() {
    return Ok(0);
  }
  size
    .parse()
    .map_err(|_| ActionError::invalid_input(format!("{} is not a number of results", size)))
}

impl ServiceClient {
  /// Connect to `server` with resolved credentials
  pub fn connect(server: &ServerDescriptor, auth: AuthInfo) -> Result<Self> {
    let client = match server.category {
      Category::Jira => Self::Jira(create_jira_client(server, auth)?),
      Category::Gerrit => Self::Gerrit(create_gerrit_client(server, auth)?),
      Category::Bugzilla => Self::Bugzilla(create_bugzilla_client(server, auth)?),
      Category::Jenkins => Self::Jenkins(create_jenkins_client(server, auth)?),
      Category::Other(ref name) => {
        return Err(ActionError::Config(format!("server type {} is not supported", name)))
          .with_context(|| format!("Failed to connect to {}", server.name));
      }
    };
    debug!("Connected a {} client for {}", server.category, server.name);
    Ok(client)
  }

  /// My open items for picking an ID, or `None` where the category has none
  pub async fn my_open(&self) -> Option<ActionResult<IssueSet>> {
    match self {
      Self::Jira(client) => Some(client.my_open().await),
      Self::Gerrit(client) => Some(client.my_open().await),
      Self::Bugzilla(client) => Some(client.my_open().await),
      Self::Jenkins(_) => None,
    }
  }

  /// Menu line for one of [`ServiceClient::my_open`]'s records
  pub fn choice_label(&self, record: &IssueRecord) -> String {
    match self {
      Self::Gerrit(_) => format!(
        "{} :\t{} :\t{}",
        record.id(),
        record.get(keys::BRANCH),
        record.get(keys::SUBJECT)
      ),
      _ => format!(
        "{} :\t{} :\t{}",
        record.id(),
        record.get(keys::PROJECT),
        record.get(keys::SUMMARY)
      ),
    }
  }

  /// Perform `action` on one seed record
  pub async fn run(&self, action: Action, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
    debug!("Running {:?} on {:?}", action, issue.id());
    match self {
      Self::Jira(client) => run_jira(client, action, prompter, issue).await,
      Self::Gerrit(client) => run_gerrit(client, action, prompter, issue).await,
      Self::Bugzilla(client) => run_bugzilla(client, action, prompter, issue).await,
      Self::Jenkins(client) => run_jenkins(client, action, prompter, issue).await,
    }
  }
}

async fn run_jira(
  client: &JiraClient,
  action: Action,
  prompter: &dyn Prompter,
  issue: &IssueRecord,
) -> ActionResult<IssueSet> {
  let id = issue.id();
  match action {
    Action::Transfer => client.transfer(issue).await,
    Action::MoveStatus => client.move_status(prompter, issue).await,
    Action::Details => client.detail(id).await,
    Action::ListComments => client.comments(id).await,
    Action::AddComment => client.add_comment(issue).await,
    Action::DeleteComment => client.delete_comment(prompter, issue).await,
    Action::ChangeComment => client.change_comment(prompter, issue).await,
    Action::MyOpen => client.my_open().await,
    Action::Link => client.link(issue).await,
    Action::ListWatchers => client.watchers(id).await,
    Action::CheckWatching => client.is_watching(id).await,
    Action::Watch => client.watch(id).await,
    Action::Unwatch => client.unwatch(id).await,
    Action::AddFile => client.add_file(issue).await,
    Action::ListFiles => client.list_files(id).await,
    Action::GetFile => client.get_file(prompter, issue).await,
    Action::RemoveFile => client.remove_file(prompter, issue).await,
    Action::Reject => client.reject(prompter, issue).await,
    Action::Close => client.close(prompter, issue).await,
    Action::CloseDefault => client.close_default(prompter, issue).await,
    Action::CloseGeneral => client.close_general(prompter, issue).await,
    other => Err(not_offered(other, "Jira")),
  }
}

async fn run_bugzilla(
  client: &BugzillaClient,
  action: Action,
  prompter: &dyn Prompter,
  issue: &IssueRecord,
) -> ActionResult<IssueSet> {
  let id = issue.id();
  match action {
    Action::Transfer => client.transfer(issue).await,
    Action::MoveStatus => client.move_status(prompter, issue).await,
    Action::Details => client.detail(id).await,
    Action::ListComments => client.comments(id).await,
    Action::AddComment => client.add_comment(issue).await,
    Action::MyOpen => client.my_open().await,
    Action::Link => client.link(issue).await,
    Action::ListWatchers => client.watchers(id).await,
    Action::Watch => client.watch(id).await,
    Action::Unwatch => client.unwatch(id).await,
    Action::AddFile => client.add_file(issue).await,
    Action::ListFiles => client.list_files(id).await,
    Action::GetFile => client.get_file(prompter, issue).await,
    Action::Reject => client.reject(prompter, issue).await,
    Action::Close => client.close(prompter, issue).await,
    other => Err(not_offered(other, "Bugzilla")),
  }
}

/// Download the file named in `file`, or one picked from the revision's files
async fn download_file(client: &GerritClient, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<IssueSet> {
  let revision = issue.get(keys::REV_CUR);
  if issue.has(keys::FILE) {
    return client.download(issue.id(), revision, issue.get(keys::FILE), "").await;
  }
  if !prompter.is_interactive() {
    return Err(ActionError::invalid_input("a file path is required"));
  }

  let files = client.files(issue.id(), revision).await?;
  if files.is_empty() {
    return Err(ActionError::no_valid_results(format!("{} has no files", issue.id())));
  }
  let paths: Vec<String> = files.iter().map(|file| file.get(keys::FILE).to_string()).collect();
  let index = prompter.select("File", &paths)?.ok_or(ActionError::Cancelled)?;
  let chosen = &files[index];
  client
    .download(issue.id(), chosen.get(keys::REV_CUR), chosen.get(keys::FILE), "")
    .await
}

async fn run_gerrit(
  client: &GerritClient,
  action: Action,
  prompter: &dyn Prompter,
  issue: &IssueRecord,
) -> ActionResult<IssueSet> {
  let id = issue.id();
  let revision = issue.get(keys::REV_CUR);
  let message = issue.get(keys::COMMENTS);
  match action {
    Action::ListMergedOf => client.list_changes(ChangeStatus::Merged, &change_filter(issue)).await,
    Action::ListMyOpenSubmits => client.my_open().await,
    Action::ListOpenOf => client.list_changes(ChangeStatus::Open, &change_filter(issue)).await,
    Action::ListAllOpen => client.all_open(prompter).await,
    Action::ListMyOpenCommits => client.my_open_commits().await,
    Action::ShowSubmit => Ok(vec![client.detail(id).await?]),
    Action::ShowRevisions => client.revisions(id).await,
    Action::ShowHistory => client.history(id).await,
    Action::ShowReviewers => client.reviewers(id).await,
    Action::ShowCurrentRevision => Ok(vec![client.current_revision(id).await?]),
    Action::Rebase => client.rebase(id).await,
    Action::Merge => client.merge(id).await,
    Action::ShowRelated => client.related(id, revision).await,
    Action::AddScores => Ok(vec![client.score(id, revision, message).await?]),
    Action::ScoreAndMerge => score_and_merge(client, &TokioSleeper, id, true).await,
    Action::WaitMergeOpenOf => wait_merge_open_of(client, &TokioSleeper, prompter, id).await,
    Action::AbandonAllMyOpen => client.abandon_all_my_open(prompter, message).await,
    Action::Abandon => client.abandon(id, message).await,
    Action::CherryPickAllMyOpen => client.cherry_pick_all_my_open(prompter, issue.get(keys::BRANCH)).await,
    Action::CherryPick => client.cherry_pick(prompter, issue).await,
    Action::Revert => client.revert(id, message).await,
    Action::ListFilesByRevision => client.files(id, revision).await,
    Action::ProjectConfig => client.project_config(issue.get(keys::PROJECT)).await,
    Action::DownloadFile => download_file(client, prompter, issue).await,
    other => Err(not_offered(other, "Gerrit")),
  }
}

async fn run_jenkins(
  client: &JenkinsClient,
  action: Action,
  prompter: &dyn Prompter,
  issue: &IssueRecord,
) -> ActionResult<IssueSet> {
  match action {
    Action::ListJobs => client.list_jobs(size_limit(issue)?).await,
    Action::ShowBuild => client.build_detail(prompter, issue).await,
    Action::BuildLog => client.build_log(prompter, issue).await,
    Action::ListBuilds => client.builds(prompter, issue).await,
    other => Err(not_offered(other, "Jenkins")),
  }
}

#[cfg(test)]
mod tests {
  use jirrit_core::ScriptedPrompter;
  use jirrit_test_utils::{test_auth, test_server};
  use serde_json::json;
  use wiremock::matchers::{basic_auth, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  fn connect(category: Category, mock_server: &MockServer) -> Result<ServiceClient> {
    ServiceClient::connect(&test_server(category, &mock_server.uri()), test_auth())
  }

  #[test]
  fn test_unknown_category_is_config_error() {
    let server = ServerDescriptor::new(Category::Other("redmine".to_string()), "rm", "https://rm.example.com");
    let err = ServiceClient::connect(&server, test_auth()).err();
    assert!(
      err
        .as_ref()
        .and_then(|err| err.downcast_ref::<ActionError>())
        .is_some_and(|err| matches!(err, ActionError::Config(_)))
    );
  }

  #[test]
  fn test_size_limit() -> ActionResult<()> {
    assert_eq!(size_limit(&IssueRecord::new())?, 0);
    assert_eq!(size_limit(&IssueRecord::new().field(keys::SIZE, " 3 "))?, 3);
    assert!(size_limit(&IssueRecord::new().field(keys::SIZE, "many")).is_err());
    Ok(())
  }

  #[test]
  fn test_owner_filter_comes_from_id() {
    let seed = IssueRecord::with_id("bob").field(keys::BRANCH, "main");
    let filter = change_filter(&seed);
    assert_eq!(filter.owner, "bob");
    assert_eq!(filter.branch, "main");
    assert!(filter.project.is_empty());
  }

  #[tokio::test]
  async fn test_gerrit_merged_of_owner() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/changes/"))
      .and(query_param("q", "status:merged owner:bob"))
      .and(basic_auth("alice", "s3cret"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"id": "c9", "project": "p", "branch": "main", "subject": "fix", "status": "MERGED"}
      ])))
      .expect(1)
      .mount(&mock_server)
      .await;

    let client = connect(Category::Gerrit, &mock_server)?;
    let seed = IssueRecord::with_id("bob");
    let merged = client.run(Action::ListMergedOf, &ScriptedPrompter::silent(), &seed).await?;
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id(), "c9");
    assert_eq!(client.choice_label(&merged[0]), "c9 :\tmain :\tfix");
    Ok(())
  }

  #[tokio::test]
  async fn test_jenkins_log_text_is_returned() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/job/nightly/12/consoleText"))
      .respond_with(ResponseTemplate::new(200).set_body_string("Started\nFinished: SUCCESS\n"))
      .mount(&mock_server)
      .await;

    let client = connect(Category::Jenkins, &mock_server)?;
    assert!(client.my_open().await.is_none());

    let seed = IssueRecord::with_id("12").field(keys::PROJECT, "nightly");
    let log = client.run(Action::BuildLog, &ScriptedPrompter::silent(), &seed).await?;
    assert!(log[0].get(keys::DATA).ends_with("Finished: SUCCESS\n"));
    Ok(())
  }

  #[tokio::test]
  async fn test_download_without_file_needs_a_prompt() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let client = connect(Category::Gerrit, &mock_server)?;
    let seed = IssueRecord::with_id("c1").field(keys::REV_CUR, "r1");
    let result = client.run(Action::DownloadFile, &ScriptedPrompter::silent(), &seed).await;
    assert!(matches!(result, Err(ActionError::InvalidInput(_))));
    Ok(())
  }

  #[tokio::test]
  async fn test_category_mismatch_is_invalid_input() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let client = connect(Category::Bugzilla, &mock_server)?;
    let result = client
      .run(Action::ChangeComment, &ScriptedPrompter::silent(), &IssueRecord::with_id("1"))
      .await;
    assert!(matches!(result, Err(ActionError::InvalidInput(_))));
    Ok(())
  }
}
