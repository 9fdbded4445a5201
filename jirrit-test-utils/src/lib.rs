//! Test utilities shared across the jirrit workspace
//!
//! - XDG config and HOME isolation ([`EnvTestGuard`], [`HomeEnvTestGuard`])
//! - Server, credential and configuration fixtures ([`fixtures`])
//!
//! Dead-code lints are off here: each test crate uses a different subset and
//! the compiler cannot see usage across dev-dependency boundaries.

#![allow(dead_code)]

pub mod env;
pub mod fixtures;

pub use env::{EnvTestGuard, HomeEnvTestGuard};
pub use fixtures::{TEST_PASS, TEST_USER, test_auth, test_config, test_rest, test_server, write_config};
