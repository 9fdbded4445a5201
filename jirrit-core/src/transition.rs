//! # Transition Engine
//!
//! Walks an issue through an ordered chain of target states. Legal
//! transitions are rediscovered from the service before every step, so the
//! chain can pass through states whose prerequisites are not known up front.

use std::future::Future;
use std::ops::AsyncFnOnce;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{ActionError, ActionResult};
use crate::issue::IssueRecord;
use crate::prompts::Prompter;

/// A legal transition from the issue's current state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transition {
  /// Name matched against step labels
  pub name: String,
  /// Identifier the service expects when executing; may equal the name
  pub id: String,
  pub comment_required: bool,
}

impl Transition {
  pub fn named(name: impl Into<String>) -> Self {
    let name = name.into();
    Self {
      id: name.clone(),
      name,
      comment_required: false,
    }
  }
}

/// Current state and the transitions leaving it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Discovery {
  pub current: String,
  pub transitions: Vec<Transition>,
}

/// A service whose issues move through a state machine
pub trait TransitionService {
  /// Query the issue's current state and legal transitions
  fn discover(&self, issue: &IssueRecord) -> impl Future<Output = ActionResult<Discovery>>;

  /// Body used when the chain has no body builder
  fn default_body(&self, transition: &Transition, issue: &IssueRecord) -> Value;

  /// Apply one transition
  fn execute(
    &self,
    issue: &IssueRecord,
    transition: &Transition,
    body: &Value,
  ) -> impl Future<Output = ActionResult<()>>;
}

/// What a body builder knows about the step being executed
#[derive(Debug)]
pub struct StepContext<'a> {
  pub transition: &'a Transition,
  pub issue: &'a IssueRecord,
  pub is_last: bool,
}

type BodyBuilder<'a> = dyn Fn(&StepContext<'_>) -> Value + 'a;

/// Outcome of a finished chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
  /// Transitions that were applied, in order
  pub executed: Vec<String>,
  /// Step labels with no matching transition at the time
  pub skipped: Vec<String>,
}

/// Pick the transition for `step`.
///
/// A non-empty label must match a discovered name exactly, otherwise the step
/// has no valid result. An empty label asks the operator.
pub fn choose_transition(prompter: &dyn Prompter, step: &str, discovery: &Discovery) -> ActionResult<Transition> {
  if !step.is_empty() {
    return discovery
      .transitions
      .iter()
      .find(|transition| transition.name == step)
      .cloned()
      .ok_or_else(|| ActionError::no_valid_results(format!("no transition to {} from {}", step, discovery.current)));
  }

  if !prompter.is_interactive() {
    return Err(ActionError::invalid_input("a transition must be chosen"));
  }
  let names: Vec<String> = discovery.transitions.iter().map(|t| t.name.clone()).collect();
  let prompt = format!("Transition from {}", discovery.current);
  match prompter.select(&prompt, &names)? {
    Some(index) => discovery.transitions.get(index).cloned().ok_or(ActionError::Cancelled),
    None => Err(ActionError::Cancelled),
  }
}

/// An ordered list of target states with an optional body builder
pub struct StepChain<'a> {
  steps: Vec<String>,
  body: Option<Box<BodyBuilder<'a>>>,
}

impl<'a> StepChain<'a> {
  pub fn new(steps: Vec<String>) -> Self {
    Self { steps, body: None }
  }

  /// Build each step's request body with `builder` instead of the service default
  pub fn with_body(mut self, builder: impl Fn(&StepContext<'_>) -> Value + 'a) -> Self {
    self.body = Some(Box::new(builder));
    self
  }

  pub fn steps(&self) -> &[String] {
    &self.steps
  }

  /// Walk the chain
  pub async fn run<S: TransitionService>(
    &self,
    service: &S,
    prompter: &dyn Prompter,
    issue: &IssueRecord,
  ) -> ActionResult<ChainReport> {
    self.run_with_hook(service, prompter, issue, async || Ok(())).await
  }

  /// Run `hook` first, then walk the chain.
  ///
  /// Intermediate steps that cannot be reached or fail are logged and
  /// skipped. The last step is the one that matters, so when it cannot be
  /// reached or fails the chain ends with that error.
  pub async fn run_with_hook<S, H>(
    &self,
    service: &S,
    prompter: &dyn Prompter,
    issue: &IssueRecord,
    hook: H,
  ) -> ActionResult<ChainReport>
  where
    S: TransitionService,
    H: AsyncFnOnce() -> ActionResult<()>,
  {
    if self.steps.is_empty() {
      return Err(ActionError::no_valid_results(format!("no steps to walk for {}", issue.id())));
    }
    hook().await?;

    let mut report = ChainReport::default();
    for (index, step) in self.steps.iter().enumerate() {
      let is_last = index + 1 == self.steps.len();

      // Every step starts from a fresh discovery, skipped ones included
      let discovery = service.discover(issue).await?;
      if discovery.transitions.is_empty() {
        return Err(ActionError::no_valid_results(format!(
          "no valid transitions from {}",
          discovery.current
        )));
      }

      let transition = match choose_transition(prompter, step, &discovery) {
        Ok(transition) => transition,
        Err(err) if err.is_no_valid_results() && !is_last => {
          debug!("Skipping step {}: {}", step, err);
          report.skipped.push(step.clone());
          continue;
        }
        Err(err) => return Err(err),
      };

      let context = StepContext {
        transition: &transition,
        issue,
        is_last,
      };
      let body = match &self.body {
        Some(builder) => builder(&context),
        None => service.default_body(&transition, issue),
      };

      match service.execute(issue, &transition, &body).await {
        Ok(()) => {
          info!("{}: {} -> {}", issue.id(), discovery.current, transition.name);
          report.executed.push(transition.name.clone());
        }
        Err(err) if is_last => return Err(err),
        Err(err) => warn!("Step {} on {} failed, continuing: {}", step, issue.id(), err),
      }
    }
    Ok(report)
  }
}
