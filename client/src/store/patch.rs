use std::collections::BTreeMap;

use farm_api::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::StoreError;

/// A value written by a merge update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    Set(Value),
    /// Resolved to the store's clock when the write is applied.
    ServerTimestamp,
    /// Added to the current numeric value (missing counts as zero).
    Increment(f64),
    Delete,
}

/// Field paths (`/`-separated, relative to the document root) to new values.
pub type Patch = BTreeMap<String, FieldValue>;

/// Apply `patch` to a copy of `doc`, resolving server placeholders with
/// `server_now`. Fails if the result no longer forms a valid user document.
pub fn apply_patch(
    doc: &UserDocument,
    patch: &Patch,
    server_now: i64,
) -> Result<UserDocument, StoreError> {
    let mut root = serde_json::to_value(doc)?;
    for (path, field) in patch {
        apply_field(&mut root, path, field, server_now)?;
    }
    Ok(serde_json::from_value(root)?)
}

fn apply_field(
    root: &mut Value,
    path: &str,
    field: &FieldValue,
    server_now: i64,
) -> Result<(), StoreError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    let Some((last, parents)) = segments.split_last() else {
        return Err(StoreError::InvalidPath(path.to_string()));
    };

    let mut node = root;
    for segment in parents {
        node = as_object(node)
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }

    let map = as_object(node);
    match field {
        FieldValue::Set(value) => {
            map.insert(last.to_string(), value.clone());
        }
        FieldValue::ServerTimestamp => {
            map.insert(last.to_string(), json!(server_now));
        }
        FieldValue::Increment(delta) => {
            let current = map.get(*last).and_then(Value::as_f64).unwrap_or(0.0);
            map.insert(last.to_string(), json!(current + delta));
        }
        FieldValue::Delete => {
            map.remove(*last);
        }
    }
    Ok(())
}

// Replaces non-object nodes, like the document store does for nested writes.
fn as_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}
