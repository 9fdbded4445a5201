//! # Jirrit CLI Entry Point
//!
//! Parses the command line, runs the session and turns the outcome into the
//! process exit code.

use std::process::ExitCode;

use jirrit_cli::cli::{Cli, handle_cli};
use jirrit_cli::exit_code_of;
use jirrit_core::output::print_error;

fn main() -> ExitCode {
  let cli = Cli::parse_args();

  match handle_cli(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::from(exit_code_of(&err))
    }
  }
}
