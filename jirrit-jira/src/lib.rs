//! # Jira API Client
//!
//! Jira REST integration for jirrit: issue details and assignment, comments,
//! links, watchers, attachments, and the reject/close transition chains.

pub mod client;
pub mod consts;
pub mod endpoints;

pub use client::{JiraClient, create_jira_client};
pub use endpoints::transitions::{DEFAULT_DESIGN_STEP, GENERAL_REQUIREMENT_STEP};
