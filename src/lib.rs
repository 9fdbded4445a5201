//! # Jirrit
//!
//! Umbrella crate for the jirrit workspace. The `jirrit` binary lives in
//! [`cli`]; the service adapters and shared building blocks are re-exported
//! here for embedding and for the end-to-end scenarios under `tests/`.

pub use jirrit_bugzilla as bugzilla;
pub use jirrit_cli as cli;
pub use jirrit_core as common;
pub use jirrit_gerrit as gerrit;
pub use jirrit_jenkins as jenkins;
pub use jirrit_jira as jira;
