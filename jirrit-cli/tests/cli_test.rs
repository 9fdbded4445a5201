use assert_cmd::cargo::cargo_bin_cmd;
use jirrit_core::server::Category;
use jirrit_test_utils::{EnvTestGuard, HomeEnvTestGuard, test_config, test_server, write_config};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn help_output_lists_flags_and_exit_codes() {
  cargo_bin_cmd!("jirrit")
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("--actions"))
    .stdout(predicate::str::contains("--getsvrcfg"))
    .stdout(predicate::str::contains("Exit codes"));
}

#[test]
fn single_dash_version_flag() {
  cargo_bin_cmd!("jirrit")
    .arg("-ver")
    .assert()
    .success()
    .stdout(predicate::str::starts_with(format!("jirrit {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn server_listing_shows_configured_servers() -> anyhow::Result<()> {
  let temp = TempDir::new()?;
  let config = test_config(vec![
    test_server(Category::Gerrit, "https://review.example.com"),
    test_server(Category::Jira, "not a url"),
  ]);
  let path = write_config(temp.path(), &config)?;

  cargo_bin_cmd!("jirrit")
    .arg("-c")
    .arg(&path)
    .arg("--getsvrcfg")
    .assert()
    .success()
    .stdout(predicate::str::contains("User: alice"))
    .stdout(predicate::str::contains("test-gerrit"))
    .stdout(predicate::str::contains("test-jira"));
  Ok(())
}

#[test]
fn silent_gerrit_listing_prints_each_change() -> anyhow::Result<()> {
  let runtime = tokio::runtime::Runtime::new()?;
  let mock_server = runtime.block_on(MockServer::start());
  runtime.block_on(
    Mock::given(method("GET"))
      .and(path("/changes/"))
      .and(query_param("q", "status:open owner:alice"))
      .and(basic_auth("alice", "s3cret"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"id": "c1", "project": "p", "branch": "b"},
        {"id": "c2", "project": "p", "branch": "b"}
      ])))
      .expect(1)
      .mount(&mock_server),
  );

  let temp = TempDir::new()?;
  let path = write_config(
    temp.path(),
    &test_config(vec![test_server(Category::Gerrit, &mock_server.uri())]),
  )?;

  cargo_bin_cmd!("jirrit")
    .arg("-c")
    .arg(&path)
    .args(["-a", "list my open submits"])
    .assert()
    .success()
    .stdout(predicate::str::is_match(r"(?s)id=c1.*id=c2")?);
  Ok(())
}

#[test]
fn unknown_action_exits_with_input_code() -> anyhow::Result<()> {
  let temp = TempDir::new()?;
  let path = write_config(
    temp.path(),
    &test_config(vec![test_server(Category::Jenkins, "https://ci.example.com")]),
  )?;

  cargo_bin_cmd!("jirrit")
    .arg("-c")
    .arg(&path)
    .args(["-a", "bogus"])
    .assert()
    .code(4)
    .stderr(predicate::str::contains("bogus"));
  Ok(())
}

#[test]
fn missing_config_in_silent_mode_exits_with_config_code() -> anyhow::Result<()> {
  let temp = TempDir::new()?;

  cargo_bin_cmd!("jirrit")
    .arg("-c")
    .arg(temp.path().join("absent.xml"))
    .args(["-a", "my-open"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("no configuration"));
  Ok(())
}

#[test]
fn config_is_found_in_home_before_the_config_dir() -> anyhow::Result<()> {
  let home = HomeEnvTestGuard::new();
  let xdg = EnvTestGuard::new();
  let cwd = TempDir::new()?;

  let written = write_config(
    &xdg.jirrit_config_dir(),
    &test_config(vec![test_server(Category::Jenkins, "https://ci.example.com")]),
  )?;
  assert_eq!(written, xdg.config_path());
  cargo_bin_cmd!("jirrit")
    .current_dir(cwd.path())
    .arg("--getsvrcfg")
    .assert()
    .success()
    .stdout(predicate::str::contains("test-jenkins"));

  let written = write_config(
    home.home_dir(),
    &test_config(vec![test_server(Category::Jira, "https://jira.example.com")]),
  )?;
  assert_eq!(written, home.config_path());
  cargo_bin_cmd!("jirrit")
    .current_dir(cwd.path())
    .arg("--getsvrcfg")
    .assert()
    .success()
    .stdout(predicate::str::contains("test-jira"))
    .stdout(predicate::str::contains("test-jenkins").not());
  Ok(())
}
