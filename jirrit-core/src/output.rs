//! # Terminal Notices
//!
//! Short status lines for the operator. Results go to stdout through the
//! renderer, so every notice here is written to stderr to keep piped output
//! clean.

use std::io::Write;

use owo_colors::{OwoColorize, Style};

/// Color mode chosen with `--color`
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
  /// Always color
  Yes,
  /// Alias for `yes`
  Always,
  /// Color when the terminal supports it
  Auto,
  /// Never color
  No,
  /// Alias for `no`
  Never,
}

impl ColorMode {
  /// Apply this mode to every colored write in the process
  pub fn apply(self) {
    match self {
      Self::Yes | Self::Always => owo_colors::set_override(true),
      Self::No | Self::Never => owo_colors::set_override(false),
      Self::Auto => owo_colors::unset_override(),
    }
  }
}

#[derive(Debug, Clone, Copy)]
enum Notice {
  Success,
  Info,
  Warning,
  Error,
}

impl Notice {
  /// Emoji shortcode and the plain fallback
  const fn marker(self) -> (&'static str, &'static str) {
    match self {
      Self::Success => ("white_check_mark", "+"),
      Self::Info => ("information_source", "i"),
      Self::Warning => ("warning", "!"),
      Self::Error => ("x", "x"),
    }
  }

  fn style(self) -> Style {
    let style = Style::new().bold();
    match self {
      Self::Success => style.green(),
      Self::Info => style.blue(),
      Self::Warning => style.yellow(),
      Self::Error => style.red(),
    }
  }

  fn line(self, message: &str) -> String {
    let (shortcode, fallback) = self.marker();
    let marker = emojis::get_by_shortcode(shortcode).map_or(fallback, |emoji| emoji.as_str());
    format!("{} {}", marker.style(self.style()), message)
  }
}

#[allow(clippy::print_stderr)]
fn notify(notice: Notice, message: &str) {
  eprintln!("{}", notice.line(message));
}

pub fn print_success(message: &str) {
  notify(Notice::Success, message);
}

pub fn print_info(message: &str) {
  notify(Notice::Info, message);
}

pub fn print_warning(message: &str) {
  notify(Notice::Warning, message);
}

pub fn print_error(message: &str) {
  notify(Notice::Error, message);
}

/// One dot per poll while waiting on a remote state
pub fn print_progress() {
  let mut stderr = std::io::stderr();
  let _ = write!(stderr, "{}", ".".bright_black());
  let _ = stderr.flush();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_notice_lines_keep_the_message() {
    ColorMode::Never.apply();
    let line = Notice::Warning.line("disk almost full");
    assert!(line.ends_with(" disk almost full"));
    assert!(!line.contains('\u{1b}'));
  }
}
