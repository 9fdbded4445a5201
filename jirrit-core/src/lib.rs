//! # Jirrit Core Library
//!
//! Shared building blocks for the jirrit service adapters and CLI: issue
//! records, server configuration and credentials, the REST envelope, ID
//! expansion, input resolution, JSON field projection and the generic
//! transition engine.

pub mod auth;
pub mod config;
pub mod errors;
pub mod fields;
pub mod ids;
pub mod input;
pub mod issue;
pub mod output;
pub mod payload;
pub mod prompts;
pub mod rest;
pub mod server;
pub mod sleep;
pub mod transition;

pub use auth::{AuthInfo, AuthKind, resolve_auth};
pub use config::{AppConfig, ConfigDirs, load_config, locate_config, save_config};
pub use errors::{ActionError, ActionResult};
pub use issue::{IssueRecord, IssueSet, keys};
pub use output::{ColorMode, print_error, print_info, print_success, print_warning};
pub use prompts::{Answer, Prompter, ScriptedPrompter, TerminalPrompter};
pub use rest::{Payload, RestClient, RestError, RestObserver};
pub use server::{Category, ServerDescriptor, StateType};
pub use sleep::{InstantSleeper, Sleeper, TokioSleeper};
pub use transition::{ChainReport, Discovery, StepChain, Transition, TransitionService};
