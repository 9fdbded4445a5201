//! Field dictionaries for Gerrit responses.

use jirrit_core::keys;

pub const LABEL_VERIFIED: &str = "Verified";
pub const LABEL_CODE_REVIEW: &str = "Code-Review";

/// Change listings
pub const ISSUE_INFO: &[&str] = &[
  keys::ID,
  keys::KEY,
  keys::SUBJECT,
  keys::PROJECT,
  keys::BRANCH,
  keys::STATUS,
];

/// Change detail
pub const ISSUE_DETAILS: &[&str] = &[
  keys::ID,
  keys::NUMBER,
  keys::SUBMITTABLE,
  keys::SUBJECT,
  keys::PROJECT,
  keys::BRANCH,
  keys::STATUS,
  keys::MERGEABLE,
  keys::TOPIC,
  keys::REV_CUR,
];

/// One revision of a change
pub const REVISION_INFO: &[&str] = &[keys::NUMBER, "kind", "created", "ref", "_account_id"];

/// Reviewer entries with their approvals
pub const REVIEW_INFO: &[&str] = &[
  keys::NAME,
  "email",
  "_account_id",
  LABEL_VERIFIED,
  LABEL_CODE_REVIEW,
];

/// Changes related to a revision
pub const RELATED_INFO: &[(&str, &str)] = &[
  ("change_id", keys::ID),
  ("project", keys::PROJECT),
  ("_change_number", keys::NUMBER),
  ("_revision_number", "revision"),
  ("status", keys::STATUS),
  ("commit.commit", keys::REV_CUR),
  ("commit.author.name", keys::AUTHOR),
  ("commit.subject", keys::SUBJECT),
];

/// Files of a revision
pub const FILE_INFO: &[&str] = &[keys::BINARY, keys::STATUS, "old_path", keys::SIZE];

/// Project configuration
pub const PROJECT_CONFIG: &[(&str, &str)] = &[
  ("description", keys::DESCRIPTION),
  ("state", keys::STATUS),
  ("commentlinks.jira.link", keys::LINK),
  ("commentlinks.jira.match", "match"),
];
