//! # Jenkins API Client
//!
//! Jenkins REST integration for jirrit: jobs, recent builds, build
//! parameters and causes, and console logs.

pub mod client;
pub mod consts;
pub mod endpoints;

pub use client::{JenkinsClient, create_jenkins_client};
pub use consts::DEFAULT_BUILD_COUNT;
