//! # Command Line Interface
//!
//! Flag definitions for the jirrit tool and the top-level handler that loads
//! configuration, sets up logging and hands over to the session driver.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{ArgAction, Parser};
use jirrit_core::config::{AppConfig, load_config, locate_config, save_config};
use jirrit_core::output::{ColorMode, print_success};
use jirrit_core::server::Category;
use jirrit_core::{ActionError, IssueRecord, Prompter, ScriptedPrompter, TerminalPrompter, keys};
use tracing::{debug, warn};

use crate::consts::SINGLE_DASH_LONG_FLAGS;
use crate::driver::{Session, SessionOptions};
use crate::render::RenderOptions;
use crate::servers::{add_server, ensure_user, server_table};
use crate::update::{UpdateCheck, UpdateStatus, record_check};
use crate::{logging, version_info};

/// Top-level CLI for the jirrit tool
#[derive(Parser, Debug)]
#[command(name = "jirrit")]
#[command(display_name = "🎫 Jirrit")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(about = "Drive Jira, Gerrit, Bugzilla and Jenkins from one prompt")]
#[command(
  long_about = "Jirrit picks a configured server, offers the actions its category supports and runs them\n\
        against the server's REST API.\n\n\
        IDs may be a single ID (X-1 or 1), a comma list (X-1,2,3) or a range (X-1,,3). A bare number\n\
        takes the project prefix last typed on that server.\n\n\
        Exit codes: 0 ok, 1 config, 2 auth, 3 connection, 4 input, 5 result, 6 request, 7 server."
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(max_term_width = 120)]
#[command(styles = Styles::styled()
    .header(AnsiColor::BrightGreen.on_default().bold().underline())
    .usage(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::BrightGreen.on_default().bold())
    .placeholder(AnsiColor::BrightWhite.on_default().italic())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::BrightRed.on_default().bold())
)]
pub struct Cli {
  /// Sets the level of verbosity (can be used multiple times)
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    long_help = "Sets the level of verbosity for tracing and logging output.\n\n\
             -v: Write info level messages to the log file\n\
             -vv: Show debug level messages\n\
             -vvv: Show trace level messages, including request and response bodies"
  )]
  pub verbose: u8,

  /// Controls when colored output is used
  #[arg(long, value_enum, ignore_case = true, default_value_t = ColorMode::Auto)]
  pub colors: ColorMode,

  /// Issue, change, build or assignee ID; a comma list or an a,,b range
  #[arg(short = 'i', long = "id")]
  pub id: Option<String>,

  /// Branch name
  #[arg(short = 'b', long = "branch")]
  pub branch: Option<String>,

  /// New assignee, or target revision on Gerrit
  #[arg(long = "hd")]
  pub head: Option<String>,

  /// New component, or test step when closing a Jira case
  #[arg(short = 'p', long = "component")]
  pub component: Option<String>,

  /// Linked issue ID, or solution text when closing a Bugzilla case
  #[arg(short = 's', long = "solution")]
  pub solution: Option<String>,

  /// Key of a comment or attachment, or a reject reason
  #[arg(short = 'k', long = "key")]
  pub key: Option<String>,

  /// File to upload, or where to save a download
  #[arg(short = 'f', long = "file")]
  pub file: Option<String>,

  /// Maximum number of results for Jenkins listings
  #[arg(short = 'z', long = "size")]
  pub size: Option<String>,

  /// Comment or message text
  #[arg(short = 'm', long = "comment")]
  pub comment: Option<String>,

  /// Project, or job name on Jenkins
  #[arg(short = 'j', long = "project")]
  pub project: Option<String>,

  /// Configuration file path
  #[arg(short = 'c', long = "cfg")]
  pub config: Option<PathBuf>,

  /// Log file path
  #[arg(short = 'l', long = "log")]
  pub log: Option<PathBuf>,

  /// Server name to use without asking
  #[arg(short = 'r', long = "server")]
  pub server: Option<String>,

  /// Actions to run without interaction, separated by ';'
  #[arg(short = 'a', long = "actions")]
  pub actions: Option<String>,

  /// Print results in reverse order
  #[arg(long)]
  pub reverse: bool,

  /// Print only results whose field of this name...
  #[arg(long = "fn", requires = "filter_value")]
  pub filter_name: Option<String>,

  /// ...has this value
  #[arg(long = "fv", requires = "filter_name")]
  pub filter_value: Option<String>,

  /// Show version and build information
  #[arg(long = "ver")]
  pub ver: bool,

  /// List configured servers
  #[arg(long = "getsvrcfg")]
  pub get_server_config: bool,

  /// Add a server to the configuration
  #[arg(long = "setsvrcfg")]
  pub set_server_config: bool,
}

/// Rewrite single-dash long flags such as `-hd` into their `--hd` form
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
  I: IntoIterator<Item = T>,
  T: Into<OsString>,
{
  args
    .into_iter()
    .map(Into::into)
    .map(|arg| {
      let Some(text) = arg.to_str() else {
        return arg;
      };
      let Some(body) = text.strip_prefix('-').filter(|body| !body.starts_with('-')) else {
        return arg;
      };
      let name = body.split_once('=').map_or(body, |(name, _)| name);
      if SINGLE_DASH_LONG_FLAGS.contains(&name) {
        OsString::from(format!("-{}", text))
      } else {
        arg
      }
    })
    .collect()
}

impl Cli {
  /// Parse the process arguments, accepting single-dash long flags
  pub fn parse_args() -> Self {
    Self::parse_from(normalize_args(std::env::args_os()))
  }

  /// Seed record built from the field flags.
  ///
  /// `--hd` is a revision on Gerrit and the new assignee elsewhere; `-s`
  /// serves as both the linked ID and the solution text.
  pub fn seed(&self, category: &Category) -> IssueRecord {
    let head_key = if *category == Category::Gerrit {
      keys::REV_CUR
    } else {
      keys::SUMMARY
    };
    let mut seed = IssueRecord::new();
    for (key, value) in [
      (keys::ID, &self.id),
      (keys::KEY, &self.key),
      (keys::BRANCH, &self.branch),
      (head_key, &self.head),
      (keys::COMPONENT, &self.component),
      (keys::LINK, &self.solution),
      (keys::SOLUTION, &self.solution),
      (keys::FILE, &self.file),
      (keys::SIZE, &self.size),
      (keys::COMMENTS, &self.comment),
      (keys::PROJECT, &self.project),
    ] {
      if let Some(value) = value {
        seed.set(key, value.as_str());
      }
    }
    seed
  }

  /// Action names given with `-a`
  pub fn action_names(&self) -> Vec<String> {
    self
      .actions
      .as_deref()
      .unwrap_or_default()
      .split(';')
      .map(str::trim)
      .filter(|name| !name.is_empty())
      .map(str::to_string)
      .collect()
  }

  fn render_options(&self) -> RenderOptions {
    RenderOptions {
      reverse: self.reverse,
      filter: self.filter_name.clone().zip(self.filter_value.clone()),
    }
  }
}

/// Load the configuration, offering to create one in interactive sessions
fn load_or_create(path: &Path, prompter: &dyn Prompter) -> Result<AppConfig> {
  if path.is_file() {
    return load_config(path);
  }
  if !prompter.is_interactive() {
    return Err(ActionError::Config(format!("no configuration at {}", path.display())).into());
  }

  let prompt = format!("Create {}?", path.display());
  if !prompter.confirm(&prompt, true)? {
    return Err(ActionError::Config(format!("no configuration at {}", path.display())).into());
  }
  let mut config = AppConfig::default();
  ensure_user(prompter, &mut config)?;
  let server = add_server(prompter, &config)?;
  config.servers.push(server);
  save_config(path, &config)?;
  Ok(config)
}

/// The global user and the server table
fn write_server_config(out: &mut impl Write, config: &AppConfig) -> io::Result<()> {
  writeln!(out, "User: {}", config.user)?;
  writeln!(out, "{}", server_table(config))
}

/// Handle the parsed command line
pub fn handle_cli(cli: Cli) -> Result<()> {
  cli.colors.apply();
  if cli.ver {
    writeln!(io::stdout().lock(), "{}", version_info())?;
    return Ok(());
  }

  let actions = cli.action_names();
  let silent = !actions.is_empty();
  let terminal = TerminalPrompter;
  let scripted = ScriptedPrompter::silent();
  let prompter: &dyn Prompter = if silent { &scripted } else { &terminal };

  let config_path = locate_config(cli.config.as_deref())?;
  let config = load_or_create(&config_path, prompter);

  let configured_log = config.as_ref().ok().map(|config| config.log.as_str()).unwrap_or_default();
  logging::init(cli.verbose, cli.log.as_deref(), configured_log)?;
  debug!("Using configuration {}", config_path.display());
  let mut config = config?;

  if cli.get_server_config {
    write_server_config(&mut io::stdout().lock(), &config)?;
    return Ok(());
  }
  if cli.set_server_config {
    ensure_user(prompter, &mut config)?;
    let server = add_server(prompter, &config)?;
    let added = server.name.clone();
    config.servers.push(server);
    save_config(&config_path, &config)?;
    print_success(&format!("Added server {} to {}", added, config_path.display()));
    return Ok(());
  }
  if ensure_user(prompter, &mut config)? {
    save_config(&config_path, &config)?;
  }

  let update = UpdateCheck::start(config.appup.as_ref());
  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;

  let options = SessionOptions {
    server: cli.server.clone(),
    actions,
    render: cli.render_options(),
  };
  let mut stdout = std::io::stdout();
  let outcome = {
    let mut session = Session::new(&mut config, &config_path, prompter, &mut stdout, options);
    runtime.block_on(session.run(|category| cli.seed(category)))
  };

  match update.wait() {
    UpdateStatus::NotDue => {}
    UpdateStatus::Failed(reason) => warn!("Update check failed: {}", reason),
    status => {
      if let Err(err) = record_check(&mut config, &config_path, &status) {
        warn!("Failed to record the update check: {:#}", err);
      }
    }
  }
  outcome
}

#[cfg(test)]
mod tests {
  use jirrit_test_utils::{test_config, test_server};

  use super::*;

  fn parse(args: &[&str]) -> Cli {
    Cli::parse_from(normalize_args(args.iter().copied()))
  }

  #[test]
  fn test_server_config_listing() -> anyhow::Result<()> {
    let config = test_config(vec![test_server(Category::Gerrit, "https://gerrit.example.com")]);
    let mut out: Vec<u8> = Vec::new();
    write_server_config(&mut out, &config)?;

    let printed = String::from_utf8(out)?;
    assert!(printed.starts_with("User: alice\n"), "unexpected output:\n{}", printed);
    assert!(printed.contains("test-gerrit"));
    assert!(printed.contains("https://gerrit.example.com"));
    Ok(())
  }

  #[test]
  fn test_single_dash_long_flags() {
    let cli = parse(&["jirrit", "-hd", "bob", "-reverse", "-fn", "status", "-fv", "NEW", "-cfg", "a.xml"]);
    assert_eq!(cli.head.as_deref(), Some("bob"));
    assert!(cli.reverse);
    assert_eq!(cli.filter_name.as_deref(), Some("status"));
    assert_eq!(cli.filter_value.as_deref(), Some("NEW"));
    assert_eq!(cli.config, Some(PathBuf::from("a.xml")));
  }

  #[test]
  fn test_short_flags_are_left_alone() {
    let normalized = normalize_args(["jirrit", "-i", "X-1", "-vv", "--log=x.log", "-log=y.log"]);
    assert_eq!(
      normalized,
      ["jirrit", "-i", "X-1", "-vv", "--log=x.log", "--log=y.log"]
        .map(OsString::from)
        .to_vec()
    );
  }

  #[test]
  fn test_head_follows_category() {
    let cli = parse(&["jirrit", "-i", "X-1", "--hd", "abc", "-s", "X-2", "-m", "done"]);

    let gerrit = cli.seed(&Category::Gerrit);
    assert_eq!(gerrit.get(keys::REV_CUR), "abc");
    assert!(!gerrit.has(keys::SUMMARY));

    let jira = cli.seed(&Category::Jira);
    assert_eq!(jira.get(keys::SUMMARY), "abc");
    assert_eq!(jira.get(keys::LINK), "X-2");
    assert_eq!(jira.get(keys::SOLUTION), "X-2");
    assert_eq!(jira.get(keys::COMMENTS), "done");
    assert_eq!(jira.id(), "X-1");
  }

  #[test]
  fn test_action_names_split_on_semicolons() {
    let cli = parse(&["jirrit", "-a", "list my open cases; show details of a case;"]);
    assert_eq!(cli.action_names(), vec!["list my open cases", "show details of a case"]);
    assert!(parse(&["jirrit"]).action_names().is_empty());
  }

  #[test]
  fn test_filter_needs_both_parts() {
    let result = Cli::try_parse_from(["jirrit", "--fn", "status"]);
    assert!(result.is_err());
  }
}
