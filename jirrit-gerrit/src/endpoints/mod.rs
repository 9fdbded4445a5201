//! Gerrit REST endpoints, grouped by resource.

pub mod changes;
pub mod review;

pub use changes::{ChangeFilter, ChangeStatus};
pub use review::ScoreLabels;
