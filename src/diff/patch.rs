//! Sparse field-path patches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::throttle::Coalesce;

/// Field path → replacement value.
///
/// A path present means "set the host's value at this path, overwriting
/// whatever was there"; a path absent means "unchanged". Paths are kept
/// sorted, which puts every path before its own descendants (`a` <
/// `a.b` < `a[0]`), so applying entries in iteration order is safe.
///
/// # Example
///
/// ```
/// use view_sync::Patch;
/// use serde_json::json;
///
/// let mut patch = Patch::new();
/// patch.set("$root.0.count", json!(2));
/// patch.set("$root.0.items[1]", json!("b"));
///
/// assert_eq!(patch.len(), 2);
/// assert_eq!(patch.get("$root.0.count"), Some(&json!(2)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    entries: BTreeMap<String, Value>,
}

impl Patch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    #[must_use]
    pub fn contains_path(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Record a replacement, overwriting any earlier value at `path` and
    /// dropping earlier entries below `path` (the new value replaces them).
    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        let path = path.into();
        let stale: Vec<String> = self
            .entries
            .range::<str, _>((std::ops::Bound::Excluded(path.as_str()), std::ops::Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(path.as_str()))
            .filter(|k| is_descendant(k, &path))
            .cloned()
            .collect();
        for key in stale {
            self.entries.remove(&key);
        }
        self.entries.insert(path, value);
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// The patch as the single JSON object handed to a host.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.entries.into_iter().collect::<Map<String, Value>>())
    }
}

/// `candidate` addresses something strictly inside `ancestor`.
fn is_descendant(candidate: &str, ancestor: &str) -> bool {
    candidate.len() > ancestor.len()
        && candidate.starts_with(ancestor)
        && matches!(candidate.as_bytes()[ancestor.len()], b'.' | b'[')
}

impl Coalesce for Patch {
    /// Field-wise overwrite: for every path in `later`, the later value wins.
    fn coalesce(&mut self, later: Self) {
        for (path, value) in later.entries {
            self.set(path, value);
        }
    }

    fn entry_count(&self) -> usize {
        self.len()
    }
}

impl IntoIterator for Patch {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Value)> for Patch {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut patch = Patch::new();
        for (path, value) in iter {
            patch.set(path, value);
        }
        patch
    }
}
