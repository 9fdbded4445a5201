//! # Server Descriptors
//!
//! Configured service endpoints, their category, per-server field dictionary
//! and state vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Service category of a configured server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
  Jira,
  Gerrit,
  Bugzilla,
  Jenkins,
  /// Category name with no catalog behind it
  Other(String),
}

impl Category {
  pub const KNOWN: [Category; 4] = [Category::Jira, Category::Gerrit, Category::Bugzilla, Category::Jenkins];

  pub fn as_str(&self) -> &str {
    match self {
      Category::Jira => "JIRA",
      Category::Gerrit => "Gerrit",
      Category::Bugzilla => "Bugzilla",
      Category::Jenkins => "Jenkins",
      Category::Other(name) => name,
    }
  }

  pub fn is_known(&self) -> bool {
    !matches!(self, Category::Other(_))
  }
}

impl From<String> for Category {
  fn from(value: String) -> Self {
    match value.trim().to_ascii_lowercase().as_str() {
      "jira" => Category::Jira,
      "gerrit" => Category::Gerrit,
      "bugzilla" => Category::Bugzilla,
      "jenkins" => Category::Jenkins,
      _ => Category::Other(value),
    }
  }
}

impl From<Category> for String {
  fn from(value: Category) -> Self {
    value.as_str().to_string()
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Semantic type of a configured state literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StateType {
  Open,
  NotOpen,
  TransitionReject,
  TransitionClose,
  ResolutionReject,
  ResolutionResolved,
  Other(String),
}

impl StateType {
  pub fn as_str(&self) -> &str {
    match self {
      StateType::Open => "open",
      StateType::NotOpen => "not open",
      StateType::TransitionReject => "transition reject",
      StateType::TransitionClose => "transition close",
      StateType::ResolutionReject => "rejected",
      StateType::ResolutionResolved => "resolved",
      StateType::Other(name) => name,
    }
  }
}

impl From<String> for StateType {
  fn from(value: String) -> Self {
    match value.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
      "open" => StateType::Open,
      "not open" => StateType::NotOpen,
      "transition reject" => StateType::TransitionReject,
      "transition close" => StateType::TransitionClose,
      "rejected" | "resolution reject" => StateType::ResolutionReject,
      "resolved" | "resolution resolved" => StateType::ResolutionResolved,
      _ => StateType::Other(value),
    }
  }
}

impl From<StateType> for String {
  fn from(value: StateType) -> Self {
    value.as_str().to_string()
  }
}

/// A `(type, literal)` pair in a server's state vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBinding {
  #[serde(rename = "@type")]
  pub kind: StateType,
  #[serde(rename = "$text", default)]
  pub text: String,
}

impl StateBinding {
  pub fn new(kind: StateType, text: impl Into<String>) -> Self {
    Self {
      kind,
      text: text.into(),
    }
  }
}

/// Password element, used both globally and per server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordBlock {
  #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(rename = "$text", default)]
  pub secret: String,
}

impl PasswordBlock {
  pub fn new(kind: Option<&str>, secret: impl Into<String>) -> Self {
    Self {
      kind: kind.map(str::to_string),
      secret: secret.into(),
    }
  }
}

/// Per-server custom field identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDictionary {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub testpre: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub teststep: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub testexp: String,
  #[serde(default, alias = "reject_rsn", skip_serializing_if = "String::is_empty")]
  pub rejectrsn: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub solution: Vec<String>,
}

impl FieldDictionary {
  /// Whether all three test fields are unset
  pub fn test_fields_empty(&self) -> bool {
    self.testpre.is_empty() && self.teststep.is_empty() && self.testexp.is_empty()
  }
}

/// One configured server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
  #[serde(rename = "@type")]
  pub category: Category,
  #[serde(rename = "@name", default)]
  pub name: String,
  #[serde(default)]
  pub url: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub user: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pass: Option<PasswordBlock>,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub magic: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub score: String,
  /// Remembered project prefix for smart IDs
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub proj: Option<String>,
  #[serde(default)]
  pub fields: FieldDictionary,
  #[serde(rename = "state", default, skip_serializing_if = "Vec::is_empty")]
  pub states: Vec<StateBinding>,
}

impl ServerDescriptor {
  /// Create a descriptor with only the essentials set
  pub fn new(category: Category, name: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      category,
      name: name.into(),
      url: url.into(),
      user: String::new(),
      pass: None,
      magic: String::new(),
      score: String::new(),
      proj: None,
      fields: FieldDictionary::default(),
      states: Vec::new(),
    }
  }

  /// Base URL without a trailing slash
  pub fn base_url(&self) -> &str {
    self.url.trim().trim_end_matches('/')
  }

  /// Whether the URL parses with a non-empty scheme and host
  pub fn has_valid_url(&self) -> bool {
    match Url::parse(self.url.trim()) {
      Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|host| !host.is_empty()),
      Err(_) => false,
    }
  }

  /// Literal state texts bound to a semantic type, in configured order
  pub fn make_states(&self, kind: &StateType) -> Vec<String> {
    self
      .states
      .iter()
      .filter(|binding| &binding.kind == kind && !binding.text.is_empty())
      .map(|binding| binding.text.clone())
      .collect()
  }

  /// First literal for a semantic type, if any
  pub fn first_state(&self, kind: &StateType) -> Option<String> {
    self.make_states(kind).into_iter().next()
  }
}

impl fmt::Display for ServerDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} - {}", self.category, self.name)
  }
}
