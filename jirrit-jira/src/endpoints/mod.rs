//! # Jira API Endpoints
//!
//! Endpoint implementations grouped by Jira resource.

pub mod attachments;
pub mod comments;
pub mod issues;
pub mod transitions;
pub mod watchers;
