//! # Prompts Module
//!
//! The [`Prompter`] seam between workflows and the operator. The terminal
//! implementation renders dialoguer prompts with jirrit's theme; the scripted
//! one answers from a queue and refuses everything else, which is how silent
//! mode and tests run.

use std::cell::RefCell;
use std::collections::VecDeque;

use console::Style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::errors::{ActionError, ActionResult};

/// Returns a custom dialoguer theme matching jirrit's color palette.
///
/// Features:
/// - Cyan bold prompt text
/// - Green `❯` prefix on active item
/// - Green highlight on active item text
pub fn jirrit_theme() -> ColorfulTheme {
  ColorfulTheme {
    prompt_style: Style::new().cyan().bold(),
    active_item_prefix: Style::new().green().apply_to("❯ ".to_string()),
    active_item_style: Style::new().green(),
    ..ColorfulTheme::default()
  }
}

/// Source of operator decisions
pub trait Prompter {
  /// Whether prompts may be shown at all
  fn is_interactive(&self) -> bool;

  /// Free text, possibly empty; `default` is shown and returned on empty input
  fn input(&self, prompt: &str, default: Option<&str>) -> ActionResult<String>;

  /// Yes or no
  fn confirm(&self, prompt: &str, default: bool) -> ActionResult<bool>;

  /// Pick one of `items`; `None` when the operator backs out
  fn select(&self, prompt: &str, items: &[String]) -> ActionResult<Option<usize>>;
}

/// Dialoguer-backed prompts on the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalPrompter;

fn prompt_failed(err: dialoguer::Error) -> ActionError {
  ActionError::invalid_input(format!("prompt failed: {}", err))
}

impl Prompter for TerminalPrompter {
  fn is_interactive(&self) -> bool {
    true
  }

  fn input(&self, prompt: &str, default: Option<&str>) -> ActionResult<String> {
    let theme = jirrit_theme();
    let mut input = Input::<String>::with_theme(&theme).with_prompt(prompt).allow_empty(true);
    if let Some(default) = default.filter(|d| !d.is_empty()) {
      input = input.default(default.to_string());
    }
    input.interact_text().map_err(prompt_failed)
  }

  fn confirm(&self, prompt: &str, default: bool) -> ActionResult<bool> {
    Confirm::with_theme(&jirrit_theme())
      .with_prompt(prompt)
      .default(default)
      .interact()
      .map_err(prompt_failed)
  }

  fn select(&self, prompt: &str, items: &[String]) -> ActionResult<Option<usize>> {
    Select::with_theme(&jirrit_theme())
      .with_prompt(prompt)
      .items(items)
      .default(0)
      .interact_opt()
      .map_err(prompt_failed)
  }
}

/// A canned answer for [`ScriptedPrompter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
  Text(String),
  Confirm(bool),
  Select(usize),
  /// Back out of a selection
  Escape,
}

/// Answers prompts from a queue; any prompt without a queued answer fails
/// with invalid-input.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
  answers: RefCell<VecDeque<Answer>>,
  interactive: bool,
}

impl ScriptedPrompter {
  /// Silent mode: every prompt is refused
  pub fn silent() -> Self {
    Self::default()
  }

  /// Behaves as an interactive operator giving `answers` in order
  pub fn with_answers(answers: impl IntoIterator<Item = Answer>) -> Self {
    Self {
      answers: RefCell::new(answers.into_iter().collect()),
      interactive: true,
    }
  }

  /// Answers not consumed yet
  pub fn remaining(&self) -> usize {
    self.answers.borrow().len()
  }

  fn next(&self, prompt: &str) -> ActionResult<Answer> {
    self
      .answers
      .borrow_mut()
      .pop_front()
      .ok_or_else(|| ActionError::invalid_input(format!("no answer available for prompt: {}", prompt)))
  }

  fn mismatch(prompt: &str, answer: &Answer) -> ActionError {
    ActionError::invalid_input(format!("scripted answer {:?} does not fit prompt: {}", answer, prompt))
  }
}

impl Prompter for ScriptedPrompter {
  fn is_interactive(&self) -> bool {
    self.interactive
  }

  fn input(&self, prompt: &str, default: Option<&str>) -> ActionResult<String> {
    match self.next(prompt)? {
      Answer::Text(text) if text.is_empty() => Ok(default.unwrap_or_default().to_string()),
      Answer::Text(text) => Ok(text),
      other => Err(Self::mismatch(prompt, &other)),
    }
  }

  fn confirm(&self, prompt: &str, _default: bool) -> ActionResult<bool> {
    match self.next(prompt)? {
      Answer::Confirm(yes) => Ok(yes),
      other => Err(Self::mismatch(prompt, &other)),
    }
  }

  fn select(&self, prompt: &str, items: &[String]) -> ActionResult<Option<usize>> {
    match self.next(prompt)? {
      Answer::Select(index) if index < items.len() => Ok(Some(index)),
      Answer::Escape => Ok(None),
      other => Err(Self::mismatch(prompt, &other)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_silent_refuses_every_prompt() {
    let prompter = ScriptedPrompter::silent();
    assert!(!prompter.is_interactive());
    assert!(matches!(
      prompter.input("id", None),
      Err(ActionError::InvalidInput(_))
    ));
    assert!(matches!(
      prompter.select("pick", &["a".to_string()]),
      Err(ActionError::InvalidInput(_))
    ));
  }

  #[test]
  fn test_answers_are_consumed_in_order() -> ActionResult<()> {
    let prompter = ScriptedPrompter::with_answers([
      Answer::Text("X-1".to_string()),
      Answer::Confirm(true),
      Answer::Select(1),
      Answer::Text(String::new()),
    ]);
    assert_eq!(prompter.input("id", None)?, "X-1");
    assert!(prompter.confirm("sure?", false)?);
    assert_eq!(prompter.select("pick", &["a".to_string(), "b".to_string()])?, Some(1));
    assert_eq!(prompter.input("branch", Some("main"))?, "main");
    assert_eq!(prompter.remaining(), 0);
    Ok(())
  }

  #[test]
  fn test_out_of_range_selection_is_rejected() {
    let prompter = ScriptedPrompter::with_answers([Answer::Select(3)]);
    assert!(prompter.select("pick", &["only".to_string()]).is_err());
  }
}
