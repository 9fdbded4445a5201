//! # Action Errors
//!
//! Error kinds surfaced by service adapters and workflow engines, and the
//! process exit codes they map to when running non-interactively.

use thiserror::Error;

use crate::rest::RestError;

/// Errors produced while resolving input for, or running, an action
#[derive(Debug, Error)]
pub enum ActionError {
  /// A required field is missing, an ID range is malformed, or a prompt was
  /// needed in silent mode
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// Upstream returned nothing usable where a value was required
  #[error("no valid results: {0}")]
  NoValidResults(String),

  /// The JSON shape did not match what the adapter expected
  #[error("unexpected response shape: {0}")]
  OutOfBound(String),

  /// A local file could not be read or written
  #[error("file access failed: {0}")]
  Access(String),

  /// The server configuration lacks something the action needs
  #[error("configuration error: {0}")]
  Config(String),

  /// Nothing to do, e.g. every label is already approved
  #[error("already in place: {0}")]
  InExistence(String),

  /// The user backed out of a prompt
  #[error("cancelled by user")]
  Cancelled,

  /// Transport or HTTP status failure
  #[error(transparent)]
  Rest(#[from] RestError),
}

impl ActionError {
  /// Convenience constructor for [`ActionError::InvalidInput`]
  pub fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput(message.into())
  }

  /// Convenience constructor for [`ActionError::NoValidResults`]
  pub fn no_valid_results(message: impl Into<String>) -> Self {
    Self::NoValidResults(message.into())
  }

  /// Convenience constructor for [`ActionError::OutOfBound`]
  pub fn out_of_bound(message: impl Into<String>) -> Self {
    Self::OutOfBound(message.into())
  }

  /// Whether this error means "nothing found", including an HTTP 404
  pub fn is_no_valid_results(&self) -> bool {
    matches!(self, Self::NoValidResults(_) | Self::Rest(RestError::NotFound { .. }))
  }

  /// Response body of the failed exchange, if there was one
  pub fn response_body(&self) -> Option<&str> {
    match self {
      Self::Rest(err) => err.body(),
      _ => None,
    }
  }

  /// Process exit code for this error
  pub fn exit_code(&self) -> i32 {
    match self {
      Self::Config(_) => 1,
      Self::InvalidInput(_) | Self::Cancelled => 4,
      Self::NoValidResults(_) | Self::OutOfBound(_) | Self::InExistence(_) | Self::Access(_) => 5,
      Self::Rest(err) => err.exit_code(),
    }
  }
}

/// Result alias used across adapters
pub type ActionResult<T> = std::result::Result<T, ActionError>;
