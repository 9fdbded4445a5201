//! # Response Field Projection
//!
//! Walks decoded JSON (`serde_json::Value`) and projects named fields into
//! flat [`IssueRecord`]s. Adapters describe what they want as field lists or
//! `(path, key)` dictionaries instead of hand-writing a parser per endpoint.

use serde_json::{Map, Value};
use tracing::trace;

use crate::errors::{ActionError, ActionResult};
use crate::issue::{IssueRecord, IssueSet};

/// A dotted path into a JSON document and the record key it lands in
pub type FieldPath<'a> = (&'a str, &'a str);

/// Text form of a scalar JSON value.
///
/// Strings are taken as-is, numbers in their shortest decimal form without an
/// exponent, booleans as `"true"`/`"false"`. Containers and null have none.
pub fn scalar_text(value: &Value) -> Option<String> {
  match value {
    Value::String(text) => Some(text.clone()),
    Value::Bool(flag) => Some(flag.to_string()),
    Value::Number(number) => Some(match (number.as_i64(), number.as_u64(), number.as_f64()) {
      (Some(i), _, _) => i.to_string(),
      (None, Some(u), _) => u.to_string(),
      (None, None, Some(f)) => f.to_string(),
      _ => number.to_string(),
    }),
    Value::Null | Value::Array(_) | Value::Object(_) => None,
  }
}

/// Project `names` out of a map, descending into nested maps.
///
/// Scalars at the current level are taken first; nested maps then fill the
/// names still missing. The same name list applies at every depth.
pub fn project_fields(map: &Map<String, Value>, names: &[&str]) -> IssueRecord {
  let mut record = IssueRecord::new();
  collect_named(map, names, &mut record);
  record
}

fn collect_named(map: &Map<String, Value>, names: &[&str], record: &mut IssueRecord) {
  for (key, value) in map {
    if !names.contains(&key.as_str()) || record.has(key) {
      continue;
    }
    match scalar_text(value) {
      Some(text) => record.set(key.as_str(), text),
      None if value.is_object() || value.is_array() || value.is_null() => {}
      None => trace!("Skipping field {} of unsupported type", key),
    }
  }
  for value in map.values() {
    if let Value::Object(sub) = value {
      collect_named(sub, names, record);
    }
  }
}

/// Follow a dotted path (`fields.status.name`) through nested maps
pub fn pick<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
  path.split('.').try_fold(value, |current, segment| current.get(segment))
}

/// Text at a dotted path, if it is a scalar
pub fn pick_text(value: &Value, path: &str) -> Option<String> {
  pick(value, path).and_then(scalar_text)
}

/// Build a record from a `(path, key)` dictionary
pub fn project_paths(value: &Value, dictionary: &[FieldPath<'_>]) -> IssueRecord {
  let mut record = IssueRecord::new();
  for (path, key) in dictionary {
    if let Some(text) = pick_text(value, path) {
      record.set(*key, text);
    }
  }
  record
}

/// The array stored under `key`, or an out-of-bound error naming it
pub fn array_at<'a>(map: &'a Map<String, Value>, key: &str) -> ActionResult<&'a Vec<Value>> {
  match map.get(key) {
    Some(Value::Array(items)) => Ok(items),
    Some(_) => Err(ActionError::out_of_bound(format!("'{}' is not a list", key))),
    None => Err(ActionError::out_of_bound(format!("no '{}' in response", key))),
  }
}

/// Map every object under `key` through `parse`, skipping non-objects
pub fn parse_list<F>(map: &Map<String, Value>, key: &str, mut parse: F) -> ActionResult<IssueSet>
where
  F: FnMut(&Map<String, Value>) -> Option<IssueRecord>,
{
  Ok(array_at(map, key)?.iter().filter_map(Value::as_object).filter_map(&mut parse).collect())
}

/// Depth-first search for the first occurrence of `key` at any depth.
///
/// Object members are visited in key order, each member's subtree before the
/// next member.
pub fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
  match value {
    Value::Object(map) => {
      if let Some(found) = map.get(key) {
        return Some(found);
      }
      map.values().find_map(|child| find_key(child, key))
    }
    Value::Array(items) => items.iter().find_map(|child| find_key(child, key)),
    _ => None,
  }
}

/// Gather every string stored under `key`, through arrays and maps
pub fn collect_strings(value: &Value, key: &str) -> Vec<String> {
  let mut found = Vec::new();
  gather_strings(value, key, &mut found);
  found
}

fn gather_strings(value: &Value, key: &str, found: &mut Vec<String>) {
  match value {
    Value::Object(map) => {
      for (name, child) in map {
        match child {
          Value::String(text) if name == key => found.push(text.clone()),
          _ => gather_strings(child, key, found),
        }
      }
    }
    Value::Array(items) => items.iter().for_each(|child| gather_strings(child, key, found)),
    _ => {}
  }
}
