//! # ID Expansion
//!
//! Expands a user-supplied ID token (single ID, comma list or `a,,b` range)
//! into the concrete IDs an action iterates over, applying the server's
//! remembered project prefix.

use std::ops::AsyncFnMut;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::errors::{ActionError, ActionResult};
use crate::issue::{IssueRecord, keys};

/// `PREFIX-NUMBER`
static NUMBERED_ID: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^([^-,]+)-([0-9]+)$").expect("Failed to compile numbered ID regex"));

/// `NUMBER` or `-NUMBER`
static BARE_NUMBER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^-?([0-9]+)$").expect("Failed to compile bare number regex"));

/// Normalize one ID against the remembered prefix.
///
/// `PREFIX-N` replaces the remembered prefix and is returned unchanged. `N` or
/// `-N` becomes `PREFIX-N` when a prefix is remembered. Returns the ID and
/// whether it was rewritten.
pub fn normalize_id(prefix: &mut Option<String>, raw: &str) -> (String, bool) {
  let raw = raw.trim();
  if let Some(caps) = NUMBERED_ID.captures(raw) {
    let typed = caps[1].to_string();
    if prefix.as_deref() != Some(typed.as_str()) {
      debug!("Remembering project prefix {}", typed);
      *prefix = Some(typed);
    }
    return (raw.to_string(), false);
  }

  match (prefix.as_deref(), BARE_NUMBER.captures(raw)) {
    (Some(known), Some(caps)) => (format!("{}-{}", known, &caps[1]), true),
    _ => (raw.to_string(), false),
  }
}

/// Split `PREFIX-N` into its parts
pub fn split_numbered(id: &str) -> Option<(&str, u64)> {
  let caps = NUMBERED_ID.captures(id)?;
  let prefix = caps.get(1)?.as_str();
  let number = caps.get(2)?.as_str().parse().ok()?;
  Some((prefix, number))
}

/// Expand an ID token into concrete IDs
pub fn expand_ids(prefix: &mut Option<String>, raw: &str) -> ActionResult<Vec<String>> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Ok(Vec::new());
  }

  if raw.matches(',').count() == 2
    && let Some((lower, upper)) = raw.split_once(",,")
  {
    return expand_range(prefix, lower, upper);
  }

  Ok(
    raw
      .split(',')
      .map(str::trim)
      .filter(|part| !part.is_empty())
      .map(|part| normalize_id(prefix, part).0)
      .collect(),
  )
}

fn expand_range(prefix: &mut Option<String>, lower: &str, upper: &str) -> ActionResult<Vec<String>> {
  let (first, _) = normalize_id(prefix, lower);
  let (carried, low) = match split_numbered(&first) {
    Some((p, n)) => (Some(p.to_string()), n),
    None => (None, parse_bound(&first)?),
  };

  let upper = upper.trim();
  let high = match split_numbered(upper) {
    Some((_, n)) => n,
    None => parse_bound(upper.trim_start_matches('-'))?,
  };

  if low >= high {
    return Err(ActionError::invalid_input(format!(
      "range lower bound {} is not below upper bound {}",
      low, high
    )));
  }

  Ok(
    (low..=high)
      .map(|n| match &carried {
        Some(p) => format!("{}-{}", p, n),
        None => n.to_string(),
      })
      .collect(),
  )
}

fn parse_bound(text: &str) -> ActionResult<u64> {
  text
    .trim()
    .parse()
    .map_err(|_| ActionError::invalid_input(format!("range bound '{}' is not a number", text)))
}

/// Call `body` once per ID expanded from the seed's ID field.
///
/// Each call receives a copy of the seed with its ID replaced. Iteration stops
/// at the first error, which is returned. A seed without an ID is passed
/// through once.
pub async fn loop_issues<F>(prefix: &mut Option<String>, seed: &IssueRecord, mut body: F) -> ActionResult<()>
where
  F: AsyncFnMut(IssueRecord) -> ActionResult<()>,
{
  let ids = expand_ids(prefix, seed.id())?;
  if ids.is_empty() {
    return body(seed.clone()).await;
  }

  for id in ids {
    let mut record = seed.clone();
    record.set(keys::ID, id);
    body(record).await?;
  }
  Ok(())
}
