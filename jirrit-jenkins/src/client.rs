use anyhow::{Result, bail};
use jirrit_core::server::{Category, ServerDescriptor};
use jirrit_core::{ActionError, ActionResult, AuthInfo, IssueRecord, Prompter, RestClient, keys};

/// Represents a Jenkins REST client
#[derive(Debug, Clone)]
pub struct JenkinsClient {
  pub(crate) rest: RestClient,
  pub(crate) base_url: String,
}

impl JenkinsClient {
  /// Create a new Jenkins client for `server` using an authenticated REST client
  pub fn new(server: &ServerDescriptor, rest: RestClient) -> Self {
    Self {
      rest,
      base_url: server.base_url().to_string(),
    }
  }

  /// Absolute URL of a path below the server root
  pub(crate) fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path)
  }

  /// Absolute URL below a job, `suffix` included verbatim
  pub(crate) fn job_url(&self, job: &str, suffix: &str) -> String {
    self.url(&format!("job/{}/{}", job, suffix))
  }

  /// The job named in `project`, or one picked from the server's jobs
  pub(crate) async fn choose_job(&self, prompter: &dyn Prompter, issue: &IssueRecord) -> ActionResult<String> {
    if issue.has(keys::PROJECT) {
      return Ok(issue.get(keys::PROJECT).to_string());
    }
    if !prompter.is_interactive() {
      return Err(ActionError::invalid_input("a job name is required"));
    }

    let jobs = self.list_jobs(0).await?;
    if jobs.is_empty() {
      return Err(ActionError::no_valid_results("the server has no jobs"));
    }
    let names: Vec<String> = jobs.iter().map(|job| job.get(keys::NAME).to_string()).collect();
    let index = prompter.select("Job", &names)?.ok_or(ActionError::Cancelled)?;
    Ok(names[index].clone())
  }

  /// Job and build number from `project` and `id`, picking what is missing
  pub(crate) async fn choose_build(
    &self,
    prompter: &dyn Prompter,
    issue: &IssueRecord,
  ) -> ActionResult<(String, String)> {
    let job = self.choose_job(prompter, issue).await?;
    if !issue.id().is_empty() {
      return Ok((job, issue.id().to_string()));
    }
    if !prompter.is_interactive() {
      return Err(ActionError::invalid_input("a build number is required"));
    }

    let builds = self.list_builds(&job, 0).await?;
    if builds.is_empty() {
      return Err(ActionError::no_valid_results(format!("{} has no builds", job)));
    }
    let numbers: Vec<String> = builds.iter().map(|build| build.id().to_string()).collect();
    let index = prompter.select("Build", &numbers)?.ok_or(ActionError::Cancelled)?;
    Ok((job, numbers[index].clone()))
  }
}

/// Create a Jenkins client from a server descriptor and resolved credentials
pub fn create_jenkins_client(server: &ServerDescriptor, auth: AuthInfo) -> Result<JenkinsClient> {
  if server.category != Category::Jenkins {
    bail!("Server {} is not a Jenkins server", server.name);
  }
  let rest = RestClient::new(auth, &server.magic);
  Ok(JenkinsClient::new(server, rest))
}
