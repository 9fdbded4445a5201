//! # Server Configuration
//!
//! Which configured servers can be used, the `--getsvrcfg` listing and the
//! interactive dialog behind `--setsvrcfg` and first-run setup.

use jirrit_core::config::AppConfig;
use jirrit_core::output::print_warning;
use jirrit_core::server::{Category, PasswordBlock, ServerDescriptor};
use jirrit_core::{ActionError, ActionResult, Prompter};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{debug, info};

/// Password types offered when adding a server
const PASSWORD_TYPES: [&str; 5] = ["basic", "plain", "digest", "token", "none"];

/// Whether a server can be offered: known category, a name and a usable URL
pub fn is_usable(server: &ServerDescriptor) -> bool {
  server.category.is_known() && !server.name.trim().is_empty() && server.has_valid_url()
}

/// Indices of the usable servers, in configured order
pub fn usable_servers(config: &AppConfig) -> Vec<usize> {
  config
    .servers
    .iter()
    .enumerate()
    .filter(|(_, server)| is_usable(server))
    .map(|(index, _)| index)
    .collect()
}

#[derive(Tabled)]
struct ServerRow {
  #[tabled(rename = "Name")]
  name: String,
  #[tabled(rename = "Type")]
  category: String,
  #[tabled(rename = "URL")]
  url: String,
  #[tabled(rename = "Project")]
  project: String,
  #[tabled(rename = "Usable")]
  usable: String,
}

/// Table of every configured server
pub fn server_table(config: &AppConfig) -> String {
  if config.servers.is_empty() {
    return "No servers configured".to_string();
  }
  let rows: Vec<ServerRow> = config
    .servers
    .iter()
    .map(|server| ServerRow {
      name: server.name.clone(),
      category: server.category.to_string(),
      url: server.url.clone(),
      project: server.proj.clone().unwrap_or_default(),
      usable: if is_usable(server) { "yes" } else { "no" }.to_string(),
    })
    .collect();
  Table::new(rows).with(Style::sharp()).to_string()
}

/// Ask for the global user name when none is configured.
///
/// Returns whether the configuration changed. Silent sessions leave it as is.
pub fn ensure_user(prompter: &dyn Prompter, config: &mut AppConfig) -> ActionResult<bool> {
  if !config.user.trim().is_empty() || !prompter.is_interactive() {
    return Ok(false);
  }
  let user = prompter.input("User name", None)?;
  if user.trim().is_empty() {
    return Ok(false);
  }
  config.user = user.trim().to_string();
  debug!("Global user set to {}", config.user);
  Ok(true)
}

fn ask_category(prompter: &dyn Prompter) -> ActionResult<Category> {
  let names: Vec<String> = Category::KNOWN.iter().map(ToString::to_string).collect();
  let index = prompter.select("Server type", &names)?.ok_or(ActionError::Cancelled)?;
  Ok(Category::KNOWN[index].clone())
}

fn ask_name(prompter: &dyn Prompter, config: &AppConfig) -> ActionResult<String> {
  loop {
    let name = prompter.input("Server name", None)?.trim().to_string();
    if name.is_empty() {
      print_warning("The name cannot be empty");
    } else if config.server(&name).is_some() {
      print_warning(&format!("A server named {} already exists", name));
    } else {
      return Ok(name);
    }
  }
}

fn ask_url(prompter: &dyn Prompter, server: &mut ServerDescriptor) -> ActionResult<()> {
  loop {
    server.url = prompter.input("Server URL", None)?.trim().to_string();
    if server.has_valid_url() {
      return Ok(());
    }
    print_warning(&format!("{} is not a valid URL", server.url));
  }
}

fn ask_password(prompter: &dyn Prompter) -> ActionResult<Option<PasswordBlock>> {
  let kinds: Vec<String> = PASSWORD_TYPES.iter().map(ToString::to_string).collect();
  let index = prompter.select("Password type", &kinds)?.ok_or(ActionError::Cancelled)?;
  let kind = PASSWORD_TYPES[index];

  let secret = prompter.input("Password or key (empty to use the global one)", None)?;
  if secret.is_empty() && kind == "none" {
    return Ok(None);
  }
  Ok(Some(PasswordBlock::new(Some(kind), secret)))
}

/// Build a new server from operator answers
pub fn add_server(prompter: &dyn Prompter, config: &AppConfig) -> ActionResult<ServerDescriptor> {
  if !prompter.is_interactive() {
    return Err(ActionError::invalid_input("adding a server needs an interactive session"));
  }

  let category = ask_category(prompter)?;
  let name = ask_name(prompter, config)?;
  let mut server = ServerDescriptor::new(category, name, "");
  ask_url(prompter, &mut server)?;
  server.user = prompter.input("User name (empty to use the global one)", None)?.trim().to_string();
  server.pass = ask_password(prompter)?;
  server.magic = prompter.input("Response prefix to strip (usually empty)", None)?;

  info!("Adding server {}", server);
  Ok(server)
}
