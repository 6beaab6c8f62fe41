// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Structural diff between new state and the host's last applied state.
//!
//! The differ is a cheap approximation, not a minimal diff. Any change of
//! shape (added or removed field, resized array, kind change) replaces the
//! whole subtree at that path instead of patching it element-wise:
//!
//! ```text
//! new                      old                      patch
//! {a: [1, 2, 3]}           {a: [1, 9, 3]}           {"a[1]": 2}
//! {a: [1, 2]}              {a: [1, 2, 3]}           {"a": [1, 2]}
//! {a: {x: 1, y: 2}}        {a: {x: 1, y: 3}}        {"a.y": 2}
//! {a: {x: 1}}              {a: {x: 1, y: 3}}        {"a": {x: 1}}
//! {a: "1"}                 {a: 1}                   {"a": "1"}
//! ```
//!
//! Nothing here fails: missing or malformed old state degrades to a full
//! replace entry. A changed object with a field name that a field path
//! cannot spell (one containing `.`, `[` or `]`) is replaced whole, so
//! every emitted path parses.

mod kind;
mod patch;

pub use kind::{Scalar, ValueKind};
pub use patch::Patch;

use serde_json::{Map, Value};

use crate::config::PATH_DELIMITERS;

/// Diff every top-level field of `new_state` against `old_state`.
///
/// Top-level field names may be dotted (`$root.0,1`); the old value is
/// found by descending `old_state` one segment at a time.
///
/// # Example
///
/// ```
/// use view_sync::diff::diff;
/// use serde_json::json;
///
/// let new_state = json!({"$root.0": {"count": 2, "$k": "0"}});
/// let old_state = json!({"$root": {"0": {"count": 1, "$k": "0"}}});
///
/// let patch = diff(new_state.as_object().unwrap(), &old_state);
/// assert_eq!(patch.len(), 1);
/// assert_eq!(patch.get("$root.0.count"), Some(&json!(2)));
/// ```
pub fn diff(new_state: &Map<String, Value>, old_state: &Value) -> Patch {
    let mut patch = Patch::new();
    for (key, value) in new_state {
        compare(&mut patch, key, Some(value), resolve_dotted(old_state, key));
    }
    patch
}

/// Diff one value at `path` against an optional old value.
pub fn diff_at(path: &str, new_value: &Value, old_value: Option<&Value>) -> Patch {
    let mut patch = Patch::new();
    compare(&mut patch, path, Some(new_value), old_value);
    patch
}

/// Follow a dotted key into `root`. `None` as soon as a segment is missing.
///
/// Numeric segments index into arrays.
pub fn resolve_dotted<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in key.split('.') {
        current = match current {
            Value::Object(fields) => fields.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn compare(patch: &mut Patch, path: &str, new_value: Option<&Value>, old_value: Option<&Value>) {
    let Some(new) = new_value else { return };
    if old_value.is_some_and(|old| std::ptr::eq(new, old)) {
        return;
    }

    match (ValueKind::of(Some(new)), ValueKind::of(old_value)) {
        (ValueKind::Null, ValueKind::Null) => {}
        (new_kind, old_kind) if new_kind.is_nullish() || old_kind.is_nullish() => {
            patch.set(path, new.clone());
        }
        (ValueKind::Sequence(new_items), ValueKind::Sequence(old_items)) => {
            if new_items.len() != old_items.len() {
                patch.set(path, new.clone());
                return;
            }
            for (i, (n, o)) in new_items.iter().zip(old_items).enumerate() {
                compare(patch, &format!("{path}[{i}]"), Some(n), Some(o));
            }
        }
        (ValueKind::Keyed(new_fields), ValueKind::Keyed(old_fields)) => {
            if !same_field_names(new_fields, old_fields) {
                patch.set(path, new.clone());
                return;
            }
            if all_addressable(new_fields) {
                for (field, n) in new_fields {
                    compare(patch, &format!("{path}.{field}"), Some(n), old_fields.get(field));
                }
                return;
            }
            // Child paths would not parse; diff only to learn whether anything changed
            let mut changed = Patch::new();
            for (field, n) in new_fields {
                compare(&mut changed, &format!("{path}.{field}"), Some(n), old_fields.get(field));
            }
            if !changed.is_empty() {
                patch.set(path, new.clone());
            }
        }
        (ValueKind::Scalar(n), ValueKind::Scalar(o)) => {
            if !n.same_as(&o) {
                patch.set(path, new.clone());
            }
        }
        _ => patch.set(path, new.clone()),
    }
}

fn same_field_names(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len() && a.keys().all(|k| b.contains_key(k))
}

fn all_addressable(fields: &Map<String, Value>) -> bool {
    !fields.keys().any(|k| k.contains(PATH_DELIMITERS))
}
