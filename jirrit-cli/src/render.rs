//! # Result Rendering
//!
//! Plain-text rendering of an action's result set: one numbered block per
//! record with a `key=value` line per field. Fetched text (a build log) is
//! printed as is after the fields.

use std::fmt::Write;

use jirrit_core::{IssueRecord, keys};

use crate::consts::NO_RESULTS;

/// How a result set is printed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
  /// Last result first
  pub reverse: bool,
  /// Only records whose field (first) has the value (second)
  pub filter: Option<(String, String)>,
}

impl RenderOptions {
  fn keeps(&self, record: &IssueRecord) -> bool {
    match &self.filter {
      Some((name, value)) => record.get(name) == value,
      None => true,
    }
  }
}

fn render_record(out: &mut String, record: &IssueRecord) {
  let mut data = None;
  for (key, value) in record.iter() {
    if key == keys::DATA {
      data = Some(value);
      continue;
    }
    let _ = writeln!(out, "\t{}={}", key, value.replace('\n', "\n\t\t"));
  }
  if let Some(data) = data {
    out.push_str(data);
    if !data.ends_with('\n') {
      out.push('\n');
    }
  }
}

/// Render `results` of an action run on `input_id`
pub fn render(results: &[IssueRecord], input_id: &str, options: &RenderOptions) -> String {
  let mut kept: Vec<&IssueRecord> = results
    .iter()
    .filter(|record| !record.is_empty() && options.keeps(record))
    .collect();
  if options.reverse {
    kept.reverse();
  }

  let mut out = String::new();
  if kept.is_empty() {
    out.push_str(NO_RESULTS);
    out.push('\n');
    return out;
  }
  for (index, record) in kept.into_iter().enumerate() {
    if input_id.is_empty() {
      let _ = writeln!(out, "Result {}", index + 1);
    } else {
      let _ = writeln!(out, "Result {} (input ID: {})", index + 1, input_id);
    }
    render_record(&mut out, record);
  }
  out
}
