//! # Action Catalog
//!
//! The ordered actions each server category offers, and for every action the
//! record fields it needs before it can run. Actions are addressed by their
//! display label or a short slug.

use jirrit_core::keys;
use jirrit_core::server::{Category, ServerDescriptor};

/// Every action any category offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
  // Jira and Bugzilla
  Transfer,
  MoveStatus,
  Details,
  ListComments,
  AddComment,
  DeleteComment,
  ChangeComment,
  MyOpen,
  Link,
  ListWatchers,
  CheckWatching,
  Watch,
  Unwatch,
  AddFile,
  ListFiles,
  GetFile,
  RemoveFile,
  Reject,
  Close,
  CloseDefault,
  CloseGeneral,

  // Gerrit
  ListMergedOf,
  ListMyOpenSubmits,
  ListOpenOf,
  ListAllOpen,
  ListMyOpenCommits,
  ShowSubmit,
  ShowRevisions,
  ShowHistory,
  ShowReviewers,
  ShowCurrentRevision,
  Rebase,
  Merge,
  ShowRelated,
  AddScores,
  ScoreAndMerge,
  WaitMergeOpenOf,
  AbandonAllMyOpen,
  Abandon,
  CherryPickAllMyOpen,
  CherryPick,
  Revert,
  ListFilesByRevision,
  ProjectConfig,
  DownloadFile,

  // Jenkins
  ListJobs,
  ShowBuild,
  BuildLog,
  ListBuilds,
}

/// How a field is obtained when the seed lacks it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Need {
  /// The ID, picked from my open items or typed
  PickId,
  /// Prompted; the action cannot run without it
  Required,
  /// Prompted in interactive sessions only; may stay empty
  Optional,
}

/// One field an action reads from its seed record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input {
  pub key: &'static str,
  pub prompt: &'static str,
  pub need: Need,
}

const fn pick_id() -> Input {
  Input {
    key: keys::ID,
    prompt: "ID",
    need: Need::PickId,
  }
}

const fn required(key: &'static str, prompt: &'static str) -> Input {
  Input {
    key,
    prompt,
    need: Need::Required,
  }
}

const fn optional(key: &'static str, prompt: &'static str) -> Input {
  Input {
    key,
    prompt,
    need: Need::Optional,
  }
}

/// A catalog row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
  pub action: Action,
  pub slug: &'static str,
  pub label: &'static str,
  pub inputs: &'static [Input],
}

const fn spec(action: Action, slug: &'static str, label: &'static str, inputs: &'static [Input]) -> ActionSpec {
  ActionSpec {
    action,
    slug,
    label,
    inputs,
  }
}

const ID_ONLY: &[Input] = &[pick_id()];
const NO_INPUT: &[Input] = &[];
const OWNER: &[Input] = &[required(keys::ID, "owner")];
const REVISION: Input = optional(keys::REV_CUR, "revision (empty for current)");

/// Labels of the Jira closings that fill the test fields
pub const CLOSE_DEFAULT_LABEL: &str = "close a case with default design as steps";
pub const CLOSE_GENERAL_LABEL: &str = "close a case with general requirement as steps";

pub const JIRA_ACTIONS: &[ActionSpec] = &[
  spec(
    Action::Transfer,
    "transfer",
    "transfer a case to someone",
    &[pick_id(), required(keys::SUMMARY, "assignee"), optional(keys::COMPONENT, "component")],
  ),
  spec(
    Action::MoveStatus,
    "move",
    "move status of a case",
    &[pick_id(), optional(keys::COMMENTS, "comment")],
  ),
  spec(Action::Details, "details", "show details of a case", ID_ONLY),
  spec(Action::ListComments, "comments", "list comments of a case", ID_ONLY),
  spec(
    Action::AddComment,
    "add-comment",
    "add a comment to a case",
    &[required(keys::COMMENTS, "comment"), pick_id()],
  ),
  spec(
    Action::DeleteComment,
    "delete-comment",
    "delete a comment from a case",
    &[pick_id(), optional(keys::KEY, "comment ID")],
  ),
  spec(
    Action::ChangeComment,
    "change-comment",
    "change a comment from a case",
    &[pick_id(), optional(keys::KEY, "comment ID"), required(keys::COMMENTS, "comment body")],
  ),
  spec(Action::MyOpen, "my-open", "list my open cases", NO_INPUT),
  spec(
    Action::Link,
    "link",
    "link a case to another",
    &[pick_id(), required(keys::LINK, "ID this case blocks")],
  ),
  spec(Action::ListWatchers, "watchers", "list watchers of a case", ID_ONLY),
  spec(Action::CheckWatching, "watching", "check whether watching a case", ID_ONLY),
  spec(Action::Watch, "watch", "watch a case", ID_ONLY),
  spec(Action::Unwatch, "unwatch", "unwatch a case", ID_ONLY),
  spec(
    Action::AddFile,
    "add-file",
    "add a file to a case",
    &[pick_id(), required(keys::FILE, "file to attach")],
  ),
  spec(Action::ListFiles, "files", "list files attached to a case", ID_ONLY),
  spec(
    Action::GetFile,
    "get-file",
    "get a file to a case",
    &[pick_id(), optional(keys::KEY, "file ID"), optional(keys::FILE, "file to be saved as")],
  ),
  spec(
    Action::RemoveFile,
    "remove-file",
    "remove a file attached to a case",
    &[pick_id(), optional(keys::KEY, "file ID")],
  ),
  spec(
    Action::Reject,
    "reject",
    "reject a case from any known statuses",
    &[pick_id(), optional(keys::COMMENTS, "comment")],
  ),
  spec(
    Action::Close,
    "close",
    "close a case to resolved from any known statuses",
    &[
      pick_id(),
      optional(keys::COMMENTS, "comment"),
      optional(keys::COMPONENT, "test step for closure"),
    ],
  ),
  spec(
    Action::CloseDefault,
    "close-default",
    CLOSE_DEFAULT_LABEL,
    &[pick_id(), optional(keys::COMMENTS, "comment")],
  ),
  spec(
    Action::CloseGeneral,
    "close-general",
    CLOSE_GENERAL_LABEL,
    &[pick_id(), optional(keys::COMMENTS, "comment")],
  ),
];

pub const GERRIT_ACTIONS: &[ActionSpec] = &[
  spec(Action::ListMergedOf, "merged-of", "list merged submits of someone", OWNER),
  spec(Action::ListMyOpenSubmits, "my-open", "list my open submits", NO_INPUT),
  spec(Action::ListOpenOf, "open-of", "list sbs open submits", OWNER),
  spec(Action::ListAllOpen, "all-open", "list all open submits", NO_INPUT),
  spec(Action::ListMyOpenCommits, "my-open-commits", "list my open commits", NO_INPUT),
  spec(Action::ShowSubmit, "details", "show details of a submit", ID_ONLY),
  spec(Action::ShowRevisions, "revisions", "show revisions of a submit", ID_ONLY),
  spec(Action::ShowHistory, "history", "show history of a submit", ID_ONLY),
  spec(Action::ShowReviewers, "reviewers", "show reviewers and scores of a submit", ID_ONLY),
  spec(
    Action::ShowCurrentRevision,
    "current-revision",
    "show current revision or commit of a submit",
    ID_ONLY,
  ),
  spec(Action::Rebase, "rebase", "rebase a submit", ID_ONLY),
  spec(Action::Merge, "merge", "merge a submit", ID_ONLY),
  spec(
    Action::ShowRelated,
    "related",
    "show related submits of one",
    &[pick_id(), REVISION],
  ),
  spec(Action::AddScores, "score", "add scores to a submit", ID_ONLY),
  spec(
    Action::ScoreAndMerge,
    "score-merge",
    "add scores, wait for it to be mergable and merge a submit",
    ID_ONLY,
  ),
  spec(
    Action::WaitMergeOpenOf,
    "wait-merge-of",
    "wait for mergable and merge sbs submits",
    OWNER,
  ),
  spec(
    Action::AbandonAllMyOpen,
    "abandon-all",
    "abandon all my open submits",
    &[optional(keys::COMMENTS, "message")],
  ),
  spec(
    Action::Abandon,
    "abandon",
    "abandon a submit",
    &[pick_id(), optional(keys::COMMENTS, "message")],
  ),
  spec(
    Action::CherryPickAllMyOpen,
    "cherry-pick-all",
    "cherry pick all my open submits",
    &[required(keys::BRANCH, "branch")],
  ),
  spec(
    Action::CherryPick,
    "cherry-pick",
    "cherry pick a submit",
    &[pick_id(), REVISION, required(keys::BRANCH, "branch")],
  ),
  spec(
    Action::Revert,
    "revert",
    "revert a submit",
    &[pick_id(), optional(keys::COMMENTS, "message")],
  ),
  spec(
    Action::ListFilesByRevision,
    "files",
    "list files of a submit by revision",
    &[pick_id(), REVISION],
  ),
  spec(
    Action::ProjectConfig,
    "project-config",
    "list config of a project",
    &[required(keys::PROJECT, "project")],
  ),
  spec(
    Action::DownloadFile,
    "download",
    "download a file of a submit",
    &[pick_id(), REVISION, optional(keys::FILE, "file (empty to pick)")],
  ),
];

pub const BUGZILLA_ACTIONS: &[ActionSpec] = &[
  spec(
    Action::Transfer,
    "transfer",
    "transfer a case to someone",
    &[pick_id(), required(keys::SUMMARY, "assignee"), optional(keys::COMPONENT, "component")],
  ),
  spec(
    Action::MoveStatus,
    "move",
    "move status of a case",
    &[pick_id(), optional(keys::COMMENTS, "comment (added with the final status)")],
  ),
  spec(Action::Details, "details", "show details of a case", ID_ONLY),
  spec(Action::ListComments, "comments", "list comments of a case", ID_ONLY),
  spec(
    Action::AddComment,
    "add-comment",
    "add a comment to a case",
    &[required(keys::COMMENTS, "comment"), pick_id()],
  ),
  spec(Action::MyOpen, "my-open", "list my open cases", NO_INPUT),
  spec(
    Action::Link,
    "link",
    "link a case to another",
    &[pick_id(), required(keys::LINK, "ID this case blocks")],
  ),
  spec(Action::ListWatchers, "watchers", "list watchers of a case", ID_ONLY),
  spec(Action::Watch, "watch", "watch a case", ID_ONLY),
  spec(Action::Unwatch, "unwatch", "unwatch a case", ID_ONLY),
  spec(
    Action::AddFile,
    "add-file",
    "add a file to a case",
    &[pick_id(), required(keys::FILE, "file to attach"), optional(keys::KEY, "description")],
  ),
  spec(Action::ListFiles, "files", "list files attached to a case", ID_ONLY),
  spec(
    Action::GetFile,
    "get-file",
    "get a file to a case",
    &[pick_id(), optional(keys::KEY, "file ID"), optional(keys::FILE, "file to be saved as")],
  ),
  spec(
    Action::Reject,
    "reject",
    "reject a case from any known statuses",
    &[pick_id(), optional(keys::COMMENTS, "comment")],
  ),
  spec(
    Action::Close,
    "close",
    "close a case to resolved from any known statuses",
    &[
      pick_id(),
      optional(keys::COMMENTS, "comment"),
      optional(keys::SOLUTION, "solution"),
    ],
  ),
];

pub const JENKINS_ACTIONS: &[ActionSpec] = &[
  spec(
    Action::ListJobs,
    "jobs",
    "list jobs",
    &[optional(keys::SIZE, "max number of results")],
  ),
  spec(Action::ShowBuild, "build", "show details of a build", NO_INPUT),
  spec(
    Action::BuildLog,
    "log",
    "get log of a build",
    &[optional(keys::FILE, "log file name to save as")],
  ),
  spec(
    Action::ListBuilds,
    "builds",
    "list builds",
    &[optional(keys::SIZE, "max number of results")],
  ),
];

/// Full catalog of a category; empty for unknown categories
pub fn catalog(category: &Category) -> &'static [ActionSpec] {
  match category {
    Category::Jira => JIRA_ACTIONS,
    Category::Gerrit => GERRIT_ACTIONS,
    Category::Bugzilla => BUGZILLA_ACTIONS,
    Category::Jenkins => JENKINS_ACTIONS,
    Category::Other(_) => &[],
  }
}

/// Actions offered for `server`.
///
/// Jira servers without test fields configured do not offer the two closings
/// that fill them.
pub fn visible_actions(server: &ServerDescriptor) -> Vec<&'static ActionSpec> {
  let hide_test_closings = server.category == Category::Jira && server.fields.test_fields_empty();
  catalog(&server.category)
    .iter()
    .filter(|spec| !(hide_test_closings && matches!(spec.action, Action::CloseDefault | Action::CloseGeneral)))
    .collect()
}

/// Find an offered action by label or slug
pub fn find_action(server: &ServerDescriptor, name: &str) -> Option<&'static ActionSpec> {
  let name = name.trim();
  visible_actions(server)
    .into_iter()
    .find(|spec| spec.label == name || spec.slug == name)
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  fn server(category: Category) -> ServerDescriptor {
    ServerDescriptor::new(category, "svr", "https://example.com")
  }

  #[test]
  fn test_catalog_sizes() {
    assert_eq!(JIRA_ACTIONS.len(), 21);
    assert_eq!(GERRIT_ACTIONS.len(), 24);
    assert_eq!(BUGZILLA_ACTIONS.len(), 15);
    assert_eq!(JENKINS_ACTIONS.len(), 4);
    assert!(catalog(&Category::Other("redmine".to_string())).is_empty());
  }

  #[test]
  fn test_slugs_and_labels_are_unique_per_category() {
    for category in Category::KNOWN {
      let specs = catalog(&category);
      let slugs: HashSet<_> = specs.iter().map(|spec| spec.slug).collect();
      let labels: HashSet<_> = specs.iter().map(|spec| spec.label).collect();
      assert_eq!(slugs.len(), specs.len(), "duplicate slug in {}", category);
      assert_eq!(labels.len(), specs.len(), "duplicate label in {}", category);
    }
  }

  #[test]
  fn test_jira_hides_test_closings_without_test_fields() {
    let mut jira = server(Category::Jira);
    assert_eq!(visible_actions(&jira).len(), 19);
    assert!(find_action(&jira, CLOSE_DEFAULT_LABEL).is_none());

    jira.fields.teststep = "customfield_10001".to_string();
    assert_eq!(visible_actions(&jira).len(), 21);
    assert_eq!(
      find_action(&jira, "close-general").map(|spec| spec.action),
      Some(Action::CloseGeneral)
    );
  }

  #[test]
  fn test_find_action_by_label_or_slug() {
    let gerrit = server(Category::Gerrit);
    assert_eq!(
      find_action(&gerrit, "list my open submits").map(|spec| spec.action),
      Some(Action::ListMyOpenSubmits)
    );
    assert_eq!(
      find_action(&gerrit, " score-merge ").map(|spec| spec.action),
      Some(Action::ScoreAndMerge)
    );
    assert!(find_action(&gerrit, "list my open cases").is_none());
  }

  #[test]
  fn test_add_comment_asks_for_comment_before_id() {
    let bugzilla = server(Category::Bugzilla);
    let spec = find_action(&bugzilla, "add-comment").map(|spec| spec.inputs);
    assert_eq!(
      spec.map(|inputs| inputs.iter().map(|input| input.need).collect::<Vec<_>>()),
      Some(vec![Need::Required, Need::PickId])
    );
  }
}
