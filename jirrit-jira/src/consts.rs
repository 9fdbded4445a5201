//! Field dictionaries for Jira responses.

use jirrit_core::fields::FieldPath;
use jirrit_core::keys;

/// Issue API root, relative to the server URL
pub const ISSUE_API: &str = "rest/api/latest/issue/";

/// JQL search, relative to the server URL
pub const SEARCH_API: &str = "rest/api/latest/search?jql=";

/// Attachment API root, relative to the server URL
pub const ATTACHMENT_API: &str = "rest/api/latest/attachment/";

/// The only link type offered
pub const LINK_BLOCKS: (&str, &str, &str) = ("Blocks", "is blocked by", "blocks");

/// Issue detail and search results
pub const ISSUE_PATHS: &[FieldPath<'static>] = &[
  ("key", keys::ID),
  ("fields.summary", keys::SUMMARY),
  ("fields.description", keys::DESCRIPTION),
  ("fields.status.name", keys::STATUS),
  ("fields.project.key", keys::PROJECT),
  ("fields.assignee.displayName", keys::DISPLAY_NAME),
];

/// One comment; the issue ID is set separately
pub const COMMENT_PATHS: &[FieldPath<'static>] = &[
  ("id", keys::KEY),
  ("body", keys::COMMENTS),
  ("updated", keys::DATE),
  ("author.name", keys::AUTHOR),
];

/// One watcher
pub const WATCHER_PATHS: &[FieldPath<'static>] = &[("name", keys::ID), ("displayName", keys::DISPLAY_NAME)];

/// One attachment; the issue ID is set separately
pub const ATTACHMENT_PATHS: &[FieldPath<'static>] = &[
  ("id", keys::KEY),
  ("filename", keys::FILE),
  ("content", keys::LINK),
  ("size", keys::SIZE),
  ("mimeType", "mimeType"),
];
