//! # Bugzilla API Client
//!
//! Bugzilla REST integration for jirrit: bug details and assignment,
//! comments, blocking links, CC watchers, base64 attachments, and the
//! status-driven reject/close chains.

pub mod client;
pub mod consts;
pub mod endpoints;

pub use client::{BugzillaClient, create_bugzilla_client};
