//! Generic operations over JSON settings trees
//!
//! Dotted-path addressing (`"graphics.lighting.key.brightness"`) and deep merge
//! over `serde_json::Value`. Both the config store and the history controller
//! build on these, so neither needs to know the shape of a category.

use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::error::{ConfigError, Result};

/// Split a dotted path into its segments.
/// Rejects empty paths and empty segments (`"a..b"`, `".a"`, `"a."`).
pub fn split_path(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Err(ConfigError::invalid_path(path, "path is empty"));
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::invalid_path(path, "path contains an empty segment"));
    }
    Ok(segments)
}

/// Walk `segments` down from `root`.
/// Returns `None` as soon as a segment is missing or its parent is not an object.
pub fn get_path<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(*segment))
}

/// Same as [`get_path`] but starting from an object.
pub fn get_in_map<'a>(root: &'a Map<String, Value>, segments: &[&str]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    get_path(root.get(*first)?, rest)
}

/// Write `value` at `segments` below `root`, creating intermediate objects.
///
/// An intermediate node that exists but is not an object is replaced by an
/// empty object so the path becomes reachable.
pub fn set_in_map(root: &mut Map<String, Value>, segments: &[&str], value: Value) {
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };

    let mut node = root;
    for segment in parents {
        let entry = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            warn!(segment = %segment, replaced = %entry, "Replacing non-object node on settings path");
            *entry = Value::Object(Map::new());
        }
        let Some(map) = entry.as_object_mut() else {
            return;
        };
        node = map;
    }
    node.insert(leaf.to_string(), value);
}

/// Recursively merge `patch` into `target`.
///
/// Objects merge key by key; any other patch value (arrays included) replaces
/// the target value wholesale.
pub fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => merge_maps(target_map, patch_map),
        (target, patch) => *target = patch,
    }
}

/// [`deep_merge`] for two objects.
pub fn merge_maps(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, patch_value) in patch {
        match target.get_mut(&key) {
            Some(existing) if existing.is_object() && patch_value.is_object() => {
                deep_merge(existing, patch_value);
            }
            _ => {
                target.insert(key, patch_value);
            }
        }
    }
}

/// Convert an `f64` into a JSON number, writing whole values as integers.
/// Non-finite values have no JSON form and yield `None`.
pub fn number_from_f64(value: f64, whole_as_integer: bool) -> Option<Value> {
    if whole_as_integer && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Some(Value::Number(Number::from(value as i64)));
    }
    Number::from_f64(value).map(Value::Number)
}
