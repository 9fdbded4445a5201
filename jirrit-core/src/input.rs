//! # Input Resolution
//!
//! Fills record fields from flags already in the seed or, failing that, from
//! the operator.

use tracing::debug;

use crate::errors::{ActionError, ActionResult};
use crate::ids::split_numbered;
use crate::issue::IssueRecord;
use crate::prompts::Prompter;

/// Read one answer; a trailing backslash continues it on following lines
/// until an empty line is entered.
pub fn read_text(prompter: &dyn Prompter, prompt: &str, default: Option<&str>) -> ActionResult<String> {
  let first = prompter.input(prompt, default)?;
  let Some(head) = first.strip_suffix('\\') else {
    return Ok(first);
  };

  let mut lines = vec![head.to_string()];
  loop {
    let line = prompter.input("", None)?;
    if line.is_empty() {
      break;
    }
    match line.strip_suffix('\\') {
      Some(stripped) => lines.push(stripped.to_string()),
      None => lines.push(line),
    }
  }
  Ok(lines.join("\n"))
}

/// Rewrite a bare number typed over a `PREFIX-N` default into `PREFIX-<new>`
pub fn apply_smart_prefix(previous: &str, typed: &str) -> String {
  let typed = typed.trim();
  match split_numbered(previous) {
    Some((prefix, _)) if !typed.is_empty() && typed.bytes().all(|b| b.is_ascii_digit()) => {
      format!("{}-{}", prefix, typed)
    }
    _ => typed.to_string(),
  }
}

/// Use the field if set; otherwise prompt for it.
///
/// Returns whether the record changed. Silent mode turns a needed prompt into
/// invalid-input.
pub fn use_input_or_prompt(
  prompter: &dyn Prompter,
  record: &mut IssueRecord,
  key: &str,
  prompt: &str,
) -> ActionResult<bool> {
  if record.has(key) {
    return Ok(false);
  }
  if !prompter.is_interactive() {
    return Err(ActionError::invalid_input(format!("{} is required", prompt)));
  }

  let value = read_text(prompter, prompt, None)?;
  record.set(key, value.trim());
  Ok(record.has(key))
}

/// Offer to change the field, showing its current value as the default.
///
/// Bare numbers typed over a `PREFIX-N` value keep the prefix. In silent mode
/// an existing value is kept and a missing one is invalid-input.
pub fn cfm_input_or_prompt(
  prompter: &dyn Prompter,
  record: &mut IssueRecord,
  key: &str,
  prompt: &str,
) -> ActionResult<bool> {
  let previous = record.get(key).to_string();
  if !prompter.is_interactive() {
    if previous.is_empty() {
      return Err(ActionError::invalid_input(format!("{} is required", prompt)));
    }
    return Ok(false);
  }

  let typed = read_text(prompter, prompt, Some(&previous))?;
  let value = apply_smart_prefix(&previous, &typed);
  if value.is_empty() || value == previous {
    return Ok(false);
  }
  debug!("{} changed from '{}' to '{}'", key, previous, value);
  record.set(key, value);
  Ok(true)
}

/// Like [`use_input_or_prompt`] but the field must end up non-empty
pub fn require_input(prompter: &dyn Prompter, record: &mut IssueRecord, key: &str, prompt: &str) -> ActionResult<()> {
  use_input_or_prompt(prompter, record, key, prompt)?;
  if !record.has(key) {
    return Err(ActionError::invalid_input(format!("{} is required", prompt)));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::issue::keys;
  use crate::prompts::{Answer, ScriptedPrompter};

  fn text(value: &str) -> Answer {
    Answer::Text(value.to_string())
  }

  #[test]
  fn test_flag_value_wins_without_prompting() -> ActionResult<()> {
    let prompter = ScriptedPrompter::silent();
    let mut record = IssueRecord::with_id("X-1");
    assert!(!use_input_or_prompt(&prompter, &mut record, keys::ID, "ID")?);
    assert_eq!(record.id(), "X-1");
    Ok(())
  }

  #[test]
  fn test_missing_value_in_silent_mode_is_invalid_input() {
    let prompter = ScriptedPrompter::silent();
    let mut record = IssueRecord::new();
    assert!(matches!(
      use_input_or_prompt(&prompter, &mut record, keys::ID, "ID"),
      Err(ActionError::InvalidInput(_))
    ));
    assert!(matches!(
      cfm_input_or_prompt(&prompter, &mut record, keys::ID, "ID"),
      Err(ActionError::InvalidInput(_))
    ));
  }

  #[test]
  fn test_smart_prefix_confirm() -> ActionResult<()> {
    let prompter = ScriptedPrompter::with_answers([text("12"), text("Y-2")]);
    let mut record = IssueRecord::with_id("X-7");

    assert!(cfm_input_or_prompt(&prompter, &mut record, keys::ID, "ID")?);
    assert_eq!(record.id(), "X-12");

    assert!(cfm_input_or_prompt(&prompter, &mut record, keys::ID, "ID")?);
    assert_eq!(record.id(), "Y-2");
    Ok(())
  }

  #[test]
  fn test_confirm_with_empty_answer_keeps_value() -> ActionResult<()> {
    let prompter = ScriptedPrompter::with_answers([text("")]);
    let mut record = IssueRecord::with_id("X-7");
    assert!(!cfm_input_or_prompt(&prompter, &mut record, keys::ID, "ID")?);
    assert_eq!(record.id(), "X-7");
    Ok(())
  }

  #[test]
  fn test_trailing_backslash_reads_multiple_lines() -> ActionResult<()> {
    let prompter = ScriptedPrompter::with_answers([text("first\\"), text("second\\"), text("third"), text("")]);
    let mut record = IssueRecord::new();
    use_input_or_prompt(&prompter, &mut record, keys::COMMENTS, "comment")?;
    assert_eq!(record.get(keys::COMMENTS), "first\nsecond\nthird");
    Ok(())
  }

  #[test]
  fn test_require_input_rejects_empty_answer() {
    let prompter = ScriptedPrompter::with_answers([text("")]);
    let mut record = IssueRecord::new();
    assert!(require_input(&prompter, &mut record, keys::BRANCH, "branch").is_err());
  }
}
