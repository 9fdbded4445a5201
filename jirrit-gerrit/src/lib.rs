//! # Gerrit Client
//!
//! A Gerrit code review REST client: change queries and details, reviewers,
//! files, scoring, cherry-picks, and the poll-until-submittable merge engine.

pub mod client;
pub mod consts;
pub mod endpoints;
pub mod merge;

pub use client::{GerritClient, create_gerrit_client};
pub use endpoints::{ChangeFilter, ChangeStatus, ScoreLabels};
pub use merge::{POLL_INTERVAL, ScoreTally, score_and_merge, wait_merge_open_of};
