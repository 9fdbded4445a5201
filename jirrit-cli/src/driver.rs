//! # Session Driver
//!
//! Picks a server, offers its actions, resolves each action's inputs, runs it
//! once per expanded ID and prints the results. Interactive sessions loop
//! until the operator backs out; a `-a` list runs once without prompting.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use jirrit_core::config::{AppConfig, save_config};
use jirrit_core::ids::loop_issues;
use jirrit_core::input::{require_input, use_input_or_prompt};
use jirrit_core::output::{print_error, print_info};
use jirrit_core::server::{Category, ServerDescriptor};
use jirrit_core::{ActionError, ActionResult, IssueRecord, IssueSet, Prompter, keys, resolve_auth};
use tracing::{debug, info, warn};

use crate::catalog::{ActionSpec, Need, find_action, visible_actions};
use crate::consts::WITH_FORMER_RESULTS;
use crate::dispatch::ServiceClient;
use crate::render::{RenderOptions, render};
use crate::servers::usable_servers;

/// What the command line asked of the session
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
  /// Server to use without asking
  pub server: Option<String>,
  /// Actions to run silently, by label or slug
  pub actions: Vec<String>,
  pub render: RenderOptions,
}

/// One run of the tool against the configured servers
pub struct Session<'a> {
  config: &'a mut AppConfig,
  config_path: &'a Path,
  prompter: &'a dyn Prompter,
  out: &'a mut dyn Write,
  options: SessionOptions,
}

/// One record an action runs on
enum Seed {
  /// ID token from the operator, expanded against the remembered prefix
  Typed(IssueRecord),
  /// ID from a listing or former results, used as it is
  Given(IssueRecord),
}

/// `former` with the explicitly supplied fields of `template` laid over it.
/// The former ID always survives.
fn reseed(former: &IssueRecord, template: &IssueRecord) -> IssueRecord {
  let mut seed = former.clone();
  for (key, value) in template.iter().filter(|(key, _)| *key != keys::ID) {
    seed.set(key, value);
  }
  seed
}

impl<'a> Session<'a> {
  pub fn new(
    config: &'a mut AppConfig,
    config_path: &'a Path,
    prompter: &'a dyn Prompter,
    out: &'a mut dyn Write,
    options: SessionOptions,
  ) -> Self {
    Self {
      config,
      config_path,
      prompter,
      out,
      options,
    }
  }

  fn is_scripted(&self) -> bool {
    !self.options.actions.is_empty()
  }

  /// Run the session; `seed_for` builds the flag seed for a server category
  pub async fn run(&mut self, seed_for: impl Fn(&Category) -> IssueRecord) -> Result<()> {
    let mut named = self.options.server.take();
    loop {
      let usable = usable_servers(self.config);
      let Some(index) = self.choose_server(&usable, named.take())? else {
        return Ok(());
      };

      let server = self.config.servers[index].clone();
      let auth = resolve_auth(&server, &self.config.user, self.config.pass.as_ref())
        .with_context(|| format!("No usable credentials for {}", server.name))?;
      let client = ServiceClient::connect(&server, auth)?;
      info!("Using server {}", server);
      if self.prompter.is_interactive()
        && let Some(prefix) = server.proj.as_deref().filter(|prefix| !prefix.is_empty())
      {
        print_info(&format!("Bare numbers on {} take the prefix {}", server.name, prefix));
      }

      let seed = seed_for(&server.category);
      if self.is_scripted() {
        return self.script(index, &server, &client, &seed).await;
      }
      self.interact(index, &server, &client, &seed).await?;

      if usable.len() < 2 {
        return Ok(());
      }
    }
  }

  /// Index of the server to use, `None` when the operator backs out
  fn choose_server(&self, usable: &[usize], named: Option<String>) -> ActionResult<Option<usize>> {
    if let Some(name) = named {
      return usable
        .iter()
        .copied()
        .find(|index| self.config.servers[*index].name == name)
        .map(Some)
        .ok_or_else(|| ActionError::Config(format!("no usable server named {}", name)));
    }

    match usable {
      [] => Err(ActionError::Config(
        "no usable server is configured, add one with --setsvrcfg".to_string(),
      )),
      [only] => Ok(Some(*only)),
      _ if !self.prompter.is_interactive() => Err(ActionError::invalid_input(
        "several servers are configured, name one with -r",
      )),
      _ => {
        let labels: Vec<String> = usable
          .iter()
          .map(|index| self.config.servers[*index].to_string())
          .collect();
        Ok(self.prompter.select("Server", &labels)?.map(|choice| usable[choice]))
      }
    }
  }

  /// Offer actions until the operator backs out
  async fn interact(
    &mut self,
    index: usize,
    server: &ServerDescriptor,
    client: &ServiceClient,
    flag_seed: &IssueRecord,
  ) -> Result<()> {
    let specs = visible_actions(server);
    let labels: Vec<String> = specs.iter().map(|spec| spec.label.to_string()).collect();
    let prompt = format!("Action on {}", server);
    let mut former = IssueSet::new();

    loop {
      let mut menu = labels.clone();
      if !former.is_empty() {
        menu.push(WITH_FORMER_RESULTS.to_string());
      }
      let Some(choice) = self.prompter.select(&prompt, &menu)? else {
        return Ok(());
      };

      let (spec, reuse) = if choice == labels.len() {
        let Some(picked) = self.prompter.select("Action on the former results", &labels)? else {
          continue;
        };
        (specs[picked], true)
      } else {
        (specs[choice], false)
      };

      let outcome = self.attempt(index, client, spec, flag_seed, reuse.then_some(&former)).await;
      match outcome {
        Ok(results) => former = results,
        Err(err) => {
          warn!("{} failed: {}", spec.label, err);
          if let Some(body) = err.response_body() {
            debug!("Response body: {}", body);
          }
          print_error(&format!("{}: {}", spec.label, err));
        }
      }
    }
  }

  /// Run the `-a` actions in order; each one after the first works on the
  /// previous one's results when there are any
  async fn script(
    &mut self,
    index: usize,
    server: &ServerDescriptor,
    client: &ServiceClient,
    flag_seed: &IssueRecord,
  ) -> Result<()> {
    let specs = self
      .options
      .actions
      .iter()
      .map(|name| {
        find_action(server, name)
          .ok_or_else(|| ActionError::invalid_input(format!("{} servers offer no action {}", server.category, name)))
      })
      .collect::<ActionResult<Vec<_>>>()?;

    let mut former = IssueSet::new();
    for spec in specs {
      let reuse = (!former.is_empty()).then_some(&former);
      former = self
        .attempt(index, client, spec, flag_seed, reuse)
        .await
        .with_context(|| format!("{} failed", spec.label))?;
    }
    Ok(())
  }

  /// Resolve inputs for one action and run it on every seed
  async fn attempt(
    &mut self,
    index: usize,
    client: &ServiceClient,
    spec: &ActionSpec,
    flag_seed: &IssueRecord,
    former: Option<&IssueSet>,
  ) -> ActionResult<IssueSet> {
    let mut template = flag_seed.clone();
    let seeds = match former {
      Some(former) => {
        template.take(keys::ID);
        self.resolve_inputs(client, spec, &mut template, false).await?;
        former
          .iter()
          .map(|record| Seed::Given(reseed(record, &template)))
          .collect()
      }
      None => {
        let picked = self.resolve_inputs(client, spec, &mut template, true).await?;
        vec![if picked { Seed::Given(template) } else { Seed::Typed(template) }]
      }
    };
    self.perform(index, client, spec, &seeds).await
  }

  /// Fill the fields `spec` needs from the operator. Returns whether the ID
  /// was picked from a listing.
  async fn resolve_inputs(
    &self,
    client: &ServiceClient,
    spec: &ActionSpec,
    record: &mut IssueRecord,
    with_id: bool,
  ) -> ActionResult<bool> {
    let mut picked = false;
    for input in spec.inputs {
      match input.need {
        Need::PickId if with_id => picked = self.pick_id(client, record, input.prompt).await?,
        Need::PickId => {}
        Need::Required => require_input(self.prompter, record, input.key, input.prompt)?,
        Need::Optional if self.prompter.is_interactive() => {
          use_input_or_prompt(self.prompter, record, input.key, input.prompt)?;
        }
        Need::Optional => {}
      }
    }
    Ok(picked)
  }

  /// Keep the seed's ID, else pick one of my open items, else ask for it.
  /// Returns true only for a picked item.
  async fn pick_id(&self, client: &ServiceClient, record: &mut IssueRecord, prompt: &str) -> ActionResult<bool> {
    if record.has(keys::ID) {
      return Ok(false);
    }
    if !self.prompter.is_interactive() {
      return Err(ActionError::invalid_input(format!("{} is required", prompt)));
    }

    match client.my_open().await {
      Some(Ok(open)) if !open.is_empty() => {
        let labels: Vec<String> = open.iter().map(|item| client.choice_label(item)).collect();
        if let Some(choice) = self.prompter.select(prompt, &labels)? {
          record.set(keys::ID, open[choice].id());
          return Ok(true);
        }
      }
      Some(Err(err)) => debug!("Could not list open items to pick from: {}", err),
      _ => {}
    }
    require_input(self.prompter, record, keys::ID, prompt)?;
    Ok(false)
  }

  /// Run `spec` once per ID of each seed, printing as it goes. Only typed IDs
  /// are expanded, and only they can change the remembered prefix.
  async fn perform(
    &mut self,
    index: usize,
    client: &ServiceClient,
    spec: &ActionSpec,
    seeds: &[Seed],
  ) -> ActionResult<IssueSet> {
    let mut prefix = self.config.servers[index].proj.clone();
    let prompter = self.prompter;
    let out = &mut *self.out;
    let render_options = &self.options.render;
    let mut results = IssueSet::new();

    let mut run_one = async |issue: IssueRecord| -> ActionResult<()> {
      let found = client.run(spec.action, prompter, &issue).await?;
      out
        .write_all(render(&found, issue.id(), render_options).as_bytes())
        .map_err(|err| ActionError::Access(format!("cannot print results: {}", err)))?;
      results.extend(found);
      Ok(())
    };

    let mut outcome = Ok(());
    for seed in seeds {
      outcome = match seed {
        Seed::Typed(seed) => loop_issues(&mut prefix, seed, &mut run_one).await,
        Seed::Given(seed) => run_one(seed.clone()).await,
      };
      if outcome.is_err() {
        break;
      }
    }

    self.remember_prefix(index, prefix);
    outcome.map(|()| results)
  }

  /// Store a changed project prefix with the server and save the config
  fn remember_prefix(&mut self, index: usize, prefix: Option<String>) {
    let server = &mut self.config.servers[index];
    if server.proj == prefix {
      return;
    }
    debug!("Remembering prefix {:?} for {}", prefix, server.name);
    server.proj = prefix;
    if let Err(err) = save_config(self.config_path, self.config) {
      warn!("Failed to save the remembered prefix: {:#}", err);
    }
  }
}

#[cfg(test)]
mod tests {
  use jirrit_core::config::load_config;
  use jirrit_core::{Answer, ScriptedPrompter};
  use jirrit_test_utils::{test_config, test_server, write_config};
  use serde_json::json;
  use tempfile::TempDir;
  use wiremock::matchers::{basic_auth, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::exit_code_of;

  fn scripted(actions: &[&str]) -> SessionOptions {
    SessionOptions {
      actions: actions.iter().map(ToString::to_string).collect(),
      ..SessionOptions::default()
    }
  }

  async fn mount_my_open(mock_server: &MockServer) {
    Mock::given(method("GET"))
      .and(path("/changes/"))
      .and(query_param("q", "status:open owner:alice"))
      .and(basic_auth("alice", "s3cret"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"id": "c1", "project": "p", "branch": "b", "subject": "first"},
        {"id": "c2", "project": "p", "branch": "b", "subject": "second"}
      ])))
      .mount(mock_server)
      .await;
  }

  struct Fixture {
    _temp: TempDir,
    path: std::path::PathBuf,
    config: AppConfig,
  }

  fn fixture(servers: Vec<ServerDescriptor>) -> anyhow::Result<Fixture> {
    let temp = TempDir::new()?;
    let config = test_config(servers);
    let path = write_config(temp.path(), &config)?;
    Ok(Fixture {
      _temp: temp,
      path,
      config,
    })
  }

  #[tokio::test]
  async fn test_scripted_gerrit_my_open_prints_in_order() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_my_open(&mock_server).await;
    let mut fx = fixture(vec![test_server(Category::Gerrit, &mock_server.uri())])?;

    let prompter = ScriptedPrompter::silent();
    let mut out: Vec<u8> = Vec::new();
    Session::new(&mut fx.config, &fx.path, &prompter, &mut out, scripted(&["my-open"]))
      .run(|_| IssueRecord::new())
      .await?;

    let printed = String::from_utf8(out)?;
    let first = printed.find("id=c1");
    let second = printed.find("id=c2");
    assert!(first.is_some() && second.is_some());
    assert!(first < second, "unexpected order:\n{}", printed);
    Ok(())
  }

  #[tokio::test]
  async fn test_former_results_seed_the_next_action() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_my_open(&mock_server).await;
    for change in ["c1", "c2"] {
      Mock::given(method("GET"))
        .and(path(format!("/changes/{}/reviewers/", change)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
          {"_account_id": 1000, "name": format!("reviewer of {}", change)}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;
    }
    let mut fx = fixture(vec![test_server(Category::Gerrit, &mock_server.uri())])?;

    let prompter = ScriptedPrompter::with_answers([
      Answer::Select(1),
      Answer::Select(24),
      Answer::Select(8),
      Answer::Escape,
    ]);
    let mut out: Vec<u8> = Vec::new();
    Session::new(&mut fx.config, &fx.path, &prompter, &mut out, SessionOptions::default())
      .run(|_| IssueRecord::new())
      .await?;

    let printed = String::from_utf8(out)?;
    assert!(printed.contains("Result 1 (input ID: c1)\n"));
    assert!(printed.contains("name=reviewer of c2"));
    assert_eq!(prompter.remaining(), 0);
    Ok(())
  }

  #[tokio::test]
  async fn test_action_errors_do_not_end_interactive_sessions() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/changes/c9/reviewers/"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&mock_server)
      .await;
    let mut fx = fixture(vec![test_server(Category::Gerrit, &mock_server.uri())])?;

    let prompter = ScriptedPrompter::with_answers([Answer::Select(8), Answer::Escape]);
    let mut out: Vec<u8> = Vec::new();
    Session::new(&mut fx.config, &fx.path, &prompter, &mut out, SessionOptions::default())
      .run(|_| IssueRecord::with_id("c9"))
      .await?;
    assert!(out.is_empty());
    Ok(())
  }

  #[tokio::test]
  async fn test_new_prefix_is_saved_with_the_server() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/X-1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "key": "X-1", "fields": {"summary": "broken build"}
      })))
      .mount(&mock_server)
      .await;
    let mut fx = fixture(vec![test_server(Category::Jira, &mock_server.uri())])?;

    let prompter = ScriptedPrompter::silent();
    let mut out: Vec<u8> = Vec::new();
    Session::new(&mut fx.config, &fx.path, &prompter, &mut out, scripted(&["details"]))
      .run(|_| IssueRecord::with_id("X-1"))
      .await?;

    assert!(String::from_utf8(out)?.contains("summary=broken build"));
    assert_eq!(load_config(&fx.path)?.servers[0].proj.as_deref(), Some("X"));
    Ok(())
  }

  async fn mount_jira_open_and_details(mock_server: &MockServer) {
    Mock::given(method("GET"))
      .and(path("/rest/api/latest/search"))
      .and(query_param("jql", "assignee=alice"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "issues": [{"key": "Y-5", "fields": {"summary": "elsewhere"}}]
      })))
      .mount(mock_server)
      .await;
    Mock::given(method("GET"))
      .and(path("/rest/api/latest/issue/Y-5"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "key": "Y-5", "fields": {"summary": "elsewhere"}
      })))
      .expect(1)
      .mount(mock_server)
      .await;
  }

  #[tokio::test]
  async fn test_former_results_keep_the_saved_prefix() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_jira_open_and_details(&mock_server).await;
    let mut server = test_server(Category::Jira, &mock_server.uri());
    server.proj = Some("X".to_string());
    let mut fx = fixture(vec![server])?;

    let prompter = ScriptedPrompter::silent();
    let mut out: Vec<u8> = Vec::new();
    Session::new(&mut fx.config, &fx.path, &prompter, &mut out, scripted(&["my-open", "details"]))
      .run(|_| IssueRecord::new())
      .await?;

    assert!(String::from_utf8(out)?.contains("Result 1 (input ID: Y-5)"));
    assert_eq!(fx.config.servers[0].proj.as_deref(), Some("X"));
    assert_eq!(load_config(&fx.path)?.servers[0].proj.as_deref(), Some("X"));
    Ok(())
  }

  #[tokio::test]
  async fn test_picked_id_keeps_the_saved_prefix() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_jira_open_and_details(&mock_server).await;
    let mut server = test_server(Category::Jira, &mock_server.uri());
    server.proj = Some("X".to_string());
    let details = visible_actions(&server)
      .iter()
      .position(|spec| spec.slug == "details")
      .ok_or_else(|| anyhow::anyhow!("Jira servers offer details"))?;
    let mut fx = fixture(vec![server])?;

    let prompter = ScriptedPrompter::with_answers([Answer::Select(details), Answer::Select(0), Answer::Escape]);
    let mut out: Vec<u8> = Vec::new();
    Session::new(&mut fx.config, &fx.path, &prompter, &mut out, SessionOptions::default())
      .run(|_| IssueRecord::new())
      .await?;

    assert!(String::from_utf8(out)?.contains("summary=elsewhere"));
    assert_eq!(prompter.remaining(), 0);
    assert_eq!(load_config(&fx.path)?.servers[0].proj.as_deref(), Some("X"));
    Ok(())
  }

  #[tokio::test]
  async fn test_scripted_failures_carry_exit_codes() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    let gerrit = test_server(Category::Gerrit, &mock_server.uri());
    let jira = test_server(Category::Jira, &mock_server.uri());
    let prompter = ScriptedPrompter::silent();

    let mut fx = fixture(vec![gerrit.clone()])?;
    let mut out: Vec<u8> = Vec::new();
    let unknown = Session::new(&mut fx.config, &fx.path, &prompter, &mut out, scripted(&["no such action"]))
      .run(|_| IssueRecord::new())
      .await;
    assert_eq!(unknown.map_err(|err| exit_code_of(&err)), Err(4));

    let missing_id = Session::new(&mut fx.config, &fx.path, &prompter, &mut out, scripted(&["details"]))
      .run(|_| IssueRecord::new())
      .await;
    assert_eq!(missing_id.map_err(|err| exit_code_of(&err)), Err(4));

    let mut fx = fixture(vec![gerrit, jira])?;
    let ambiguous = Session::new(&mut fx.config, &fx.path, &prompter, &mut out, scripted(&["details"]))
      .run(|_| IssueRecord::new())
      .await;
    assert_eq!(ambiguous.map_err(|err| exit_code_of(&err)), Err(4));

    let options = SessionOptions {
      server: Some("nowhere".to_string()),
      ..scripted(&["details"])
    };
    let unnamed = Session::new(&mut fx.config, &fx.path, &prompter, &mut out, options)
      .run(|_| IssueRecord::new())
      .await;
    assert_eq!(unnamed.map_err(|err| exit_code_of(&err)), Err(1));
    Ok(())
  }

  #[test]
  fn test_reseed_keeps_former_id() {
    let former = IssueRecord::with_id("c1").field(keys::BRANCH, "b");
    let template = IssueRecord::with_id("ignored").field(keys::COMMENTS, "lgtm");
    let seed = reseed(&former, &template);
    assert_eq!(seed.id(), "c1");
    assert_eq!(seed.get(keys::BRANCH), "b");
    assert_eq!(seed.get(keys::COMMENTS), "lgtm");
  }
}
