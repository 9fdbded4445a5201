//! Field dictionaries for Bugzilla responses.

use jirrit_core::fields::FieldPath;
use jirrit_core::keys;

/// Bug API root, relative to the server URL
pub const BUG_API: &str = "rest/bug/";

/// Bug search, relative to the server URL
pub const SEARCH_API: &str = "rest/bug?";

/// Attachment content, relative to the server URL
pub const ATTACHMENT_API: &str = "rest/bug/attachment/";

/// The workflow of the `bug_status` field
pub const STATUS_FIELD_API: &str = "rest/field/bug/bug_status";

/// URL parameter carrying the API key for servers without header credentials
pub const API_KEY_PARAM: &str = "Bugzilla_api_key";

/// Bug detail and search results
pub const BUG_PATHS: &[FieldPath<'static>] = &[
  ("id", keys::ID),
  ("summary", keys::SUMMARY),
  ("status", keys::STATUS),
  ("resolution", "resolution"),
  ("product", keys::PROJECT),
  ("component", keys::COMPONENT),
  ("assigned_to_detail.real_name", keys::DISPLAY_NAME),
];

/// One comment; the bug ID is set separately
pub const COMMENT_PATHS: &[FieldPath<'static>] = &[
  ("id", keys::KEY),
  ("text", keys::COMMENTS),
  ("creator", keys::AUTHOR),
  ("creation_time", keys::DATE),
];

/// One CC entry
pub const WATCHER_PATHS: &[FieldPath<'static>] = &[("email", keys::ID), ("real_name", keys::DISPLAY_NAME)];

/// One attachment's metadata; the bug ID is set separately
pub const ATTACHMENT_PATHS: &[FieldPath<'static>] = &[
  ("id", keys::KEY),
  ("file_name", keys::FILE),
  ("size", keys::SIZE),
  ("summary", keys::DESCRIPTION),
  ("content_type", "content_type"),
];
