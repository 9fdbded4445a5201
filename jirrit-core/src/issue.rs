//! # Issue Records
//!
//! The flat, string-valued record every action consumes and produces, and the
//! field names shared by the adapters.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Field names used in issue records
pub mod keys {
  pub const ID: &str = "id";
  pub const KEY: &str = "key";
  pub const SUMMARY: &str = "summary";
  pub const SUBJECT: &str = "subject";
  pub const DESCRIPTION: &str = "description";
  pub const PROJECT: &str = "project";
  pub const COMPONENT: &str = "component";
  pub const BRANCH: &str = "branch";
  pub const STATUS: &str = "status";
  pub const REV_CUR: &str = "current_revision";
  pub const NUMBER: &str = "_number";
  pub const SUBMITTABLE: &str = "submittable";
  pub const MERGEABLE: &str = "mergeable";
  pub const SUBMIT_TYPE: &str = "submit_type";
  pub const TOPIC: &str = "topic";
  pub const COMMENTS: &str = "comments";
  pub const FILE: &str = "file";
  pub const SIZE: &str = "size";
  pub const LINK: &str = "link";
  pub const SOLUTION: &str = "solution";
  pub const BINARY: &str = "binary";
  pub const NAME: &str = "name";
  pub const DISPLAY_NAME: &str = "displayName";
  pub const AUTHOR: &str = "author";
  pub const DATE: &str = "date";
  pub const MESSAGE: &str = "message";
  pub const URL: &str = "url";
  pub const RESULT: &str = "result";
  pub const BUILDING: &str = "building";
  pub const CHERRY_PICK: &str = "Cherry Pick";
  pub const PARENTS: &str = "parents";
  pub const DATA: &str = "data";
}

/// A flat mapping of field names to string values
///
/// An absent key and an empty value are equivalent: setting a field to the
/// empty string removes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IssueRecord(BTreeMap<String, String>);

/// Ordered result of an action
pub type IssueSet = Vec<IssueRecord>;

impl IssueRecord {
  /// Create an empty record
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a record carrying only an ID
  pub fn with_id(id: impl Into<String>) -> Self {
    let mut record = Self::new();
    record.set(keys::ID, id);
    record
  }

  /// Value of a field, or the empty string
  pub fn get(&self, key: &str) -> &str {
    self.0.get(key).map(String::as_str).unwrap_or_default()
  }

  /// Whether a field holds a non-empty value
  pub fn has(&self, key: &str) -> bool {
    !self.get(key).is_empty()
  }

  /// Set a field; an empty value clears it
  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    let value = value.into();
    if value.is_empty() {
      self.0.remove(&key);
    } else {
      self.0.insert(key, value);
    }
  }

  /// Builder-style variant of [`IssueRecord::set`]
  pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.set(key, value);
    self
  }

  /// Remove a field, returning its old value
  pub fn take(&mut self, key: &str) -> Option<String> {
    self.0.remove(key)
  }

  /// The record's ID
  pub fn id(&self) -> &str {
    self.get(keys::ID)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Iterate fields in name order
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Copy every non-empty field of `other` into this record
  pub fn merge(&mut self, other: &IssueRecord) {
    for (key, value) in other.iter() {
      self.set(key, value);
    }
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IssueRecord {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut record = Self::new();
    for (key, value) in iter {
      record.set(key, value);
    }
    record
  }
}

impl fmt::Display for IssueRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (key, value) in self.iter() {
      writeln!(f, "\t{}={}", key, value.replace('\n', "\n\t\t"))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_value_clears_field() {
    let mut record = IssueRecord::with_id("X-1");
    record.set(keys::SUMMARY, "title");
    assert!(record.has(keys::SUMMARY));

    record.set(keys::SUMMARY, "");
    assert!(!record.has(keys::SUMMARY));
    assert_eq!(record.get(keys::SUMMARY), "");
    assert_eq!(record.len(), 1);
  }

  #[test]
  fn test_display_indents_multiline_values() {
    let record = IssueRecord::with_id("c1").field(keys::MESSAGE, "line one\nline two");
    assert_eq!(record.to_string(), "\tid=c1\n\tmessage=line one\n\t\tline two\n");
  }

  #[test]
  fn test_merge_keeps_existing_fields() {
    let mut seed = IssueRecord::with_id("X-1").field(keys::BRANCH, "main");
    seed.merge(&IssueRecord::new().field(keys::STATUS, "NEW"));
    assert_eq!(seed.get(keys::BRANCH), "main");
    assert_eq!(seed.get(keys::STATUS), "NEW");
  }
}
