//! Tree flattening.
//!
//! [`TreeFlattener`] turns a component subtree into a [`Snapshot`]: one
//! record per live component, keyed by `namespace.pathkey`. A record is the
//! component's own fields (state, then inputs, then computed, later sources
//! shadowing earlier ones) plus three addressing fields owned by the sync
//! layer:
//!
//! | field | meaning                          | example  |
//! |-------|----------------------------------|----------|
//! | `$k`  | path key                         | `0,1`    |
//! | `$kk` | path key + separator (prefix)    | `0,1,`   |
//! | `$p`  | parent's path key (`""` at root) | `0`      |
//!
//! Records hold owned copies of the component's values, so a snapshot never
//! aliases live component state.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SyncError;
use crate::keypath::{KeyPathEncoder, PathKey};
use crate::tree::{ComponentTree, NodeId, StateSource};

/// Record field holding the path key.
pub const KEY_FIELD: &str = "$k";
/// Record field holding the descendant prefix.
pub const PREFIX_FIELD: &str = "$kk";
/// Record field holding the parent's path key.
pub const PARENT_FIELD: &str = "$p";

/// Flat, path-keyed view of a subtree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: Map<String, Value>,
}

impl Snapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, record: Map<String, Value>) {
        self.records.insert(key, Value::Object(record));
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.records.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }

    /// Records as the left-hand operand of [`diff`](crate::diff::diff).
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.records
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.records
    }
}

/// Builds records and snapshots from a [`ComponentTree`].
#[derive(Debug, Clone, Default)]
pub struct TreeFlattener {
    encoder: KeyPathEncoder,
}

impl TreeFlattener {
    pub fn new(encoder: KeyPathEncoder) -> Self {
        Self { encoder }
    }

    #[must_use]
    pub fn encoder(&self) -> &KeyPathEncoder {
        &self.encoder
    }

    /// Snapshot of every live component under (and including) `root`.
    ///
    /// Destroyed components and everything below them are left out. A
    /// destroyed `root` yields an empty snapshot.
    pub fn flatten<T: ComponentTree + ?Sized>(
        &self,
        tree: &T,
        root: NodeId,
    ) -> Result<Snapshot, SyncError> {
        if !tree.contains(root) {
            return Err(SyncError::UnknownNode(root));
        }

        let mut snapshot = Snapshot::new();
        let mut stack: Vec<(NodeId, PathKey)> = vec![(root, self.encoder.encode(tree, root))];
        while let Some((id, key)) = stack.pop() {
            if tree.is_destroyed(id) {
                continue;
            }
            // Reverse so siblings pop in declaration order.
            for &child in tree.children(id).iter().rev() {
                let child_key = self.encoder.child(Some(&key), tree.component_key(child));
                stack.push((child, child_key));
            }
            snapshot.insert(self.encoder.snapshot_key(&key), self.record(tree, id, &key));
        }

        debug!(root = %root, records = snapshot.len(), "Subtree flattened");
        Ok(snapshot)
    }

    /// Snapshot holding only `id`'s own record. No tree walk beyond the
    /// ancestor chain needed for its key.
    pub fn format<T: ComponentTree + ?Sized>(
        &self,
        tree: &T,
        id: NodeId,
    ) -> Result<Snapshot, SyncError> {
        if !tree.contains(id) {
            return Err(SyncError::UnknownNode(id));
        }
        let key = self.encoder.encode(tree, id);
        let mut snapshot = Snapshot::new();
        snapshot.insert(self.encoder.snapshot_key(&key), self.record(tree, id, &key));
        Ok(snapshot)
    }

    /// Own fields of `id` merged across sources, plus addressing fields.
    pub fn record<T: ComponentTree + ?Sized>(
        &self,
        tree: &T,
        id: NodeId,
        key: &PathKey,
    ) -> Map<String, Value> {
        let mut record = Map::new();
        for source in StateSource::ALL {
            if let Some(fields) = tree.state(id, source) {
                for (name, value) in fields {
                    record.insert(name.clone(), value.clone());
                }
            }
        }
        record.insert(KEY_FIELD.to_string(), Value::String(key.as_str().to_string()));
        record.insert(PREFIX_FIELD.to_string(), Value::String(key.prefix().to_string()));
        record.insert(PARENT_FIELD.to_string(), Value::String(key.parent().to_string()));
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ComponentArena;
    use serde_json::json;

    fn tree_with_children() -> (ComponentArena, NodeId, NodeId, NodeId) {
        let mut tree = ComponentArena::new();
        let root = tree.insert_root(Some("0")).unwrap();
        let a = tree.insert_child(root, "1").unwrap();
        let b = tree.insert_child(root, "2").unwrap();
        tree.set_field(root, StateSource::State, "title", json!("home")).unwrap();
        tree.set_field(a, StateSource::State, "count", json!(1)).unwrap();
        tree.set_field(b, StateSource::Inputs, "label", json!("ok")).unwrap();
        (tree, root, a, b)
    }

    #[test]
    fn test_flatten_visits_every_live_node_once() {
        let (tree, root, _, _) = tree_with_children();
        let snapshot = TreeFlattener::default().flatten(&tree, root).unwrap();

        let keys: Vec<&String> = snapshot.keys().collect();
        assert_eq!(keys, vec!["$root.0", "$root.0,1", "$root.0,2"]);
        assert_eq!(snapshot.get("$root.0,1").unwrap()["count"], json!(1));
        assert_eq!(snapshot.get("$root.0,2").unwrap()["label"], json!("ok"));
    }

    #[test]
    fn test_record_addressing_fields() {
        let (tree, root, a, _) = tree_with_children();
        let snapshot = TreeFlattener::default().flatten(&tree, root).unwrap();

        let child = snapshot.get("$root.0,1").unwrap();
        assert_eq!(child[KEY_FIELD], json!("0,1"));
        assert_eq!(child[PREFIX_FIELD], json!("0,1,"));
        assert_eq!(child[PARENT_FIELD], json!("0"));

        let root_record = snapshot.get("$root.0").unwrap();
        assert_eq!(root_record[PARENT_FIELD], json!(""));

        let single = TreeFlattener::default().format(&tree, a).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single.get("$root.0,1"), snapshot.get("$root.0,1"));
    }

    #[test]
    fn test_later_sources_shadow_earlier() {
        let mut tree = ComponentArena::new();
        let root = tree.insert_root(Some("0")).unwrap();
        tree.set_field(root, StateSource::State, "value", json!("state")).unwrap();
        tree.set_field(root, StateSource::Inputs, "value", json!("input")).unwrap();
        tree.set_field(root, StateSource::Computed, "value", json!("computed")).unwrap();
        tree.set_field(root, StateSource::Inputs, "other", json!(1)).unwrap();

        let snapshot = TreeFlattener::default().format(&tree, root).unwrap();
        let record = snapshot.get("$root.0").unwrap();
        assert_eq!(record["value"], json!("computed"));
        assert_eq!(record["other"], json!(1));
    }

    #[test]
    fn test_destroyed_subtree_left_out() {
        let (mut tree, root, a, _) = tree_with_children();
        let nested = tree.insert_child(a, "1").unwrap();
        tree.destroy(a).unwrap();

        let snapshot = TreeFlattener::default().flatten(&tree, root).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get("$root.0,1").is_none());
        assert!(snapshot.get("$root.0,1,1").is_none());
        assert!(tree.is_destroyed(nested));
    }

    #[test]
    fn test_flatten_subtree_keeps_full_keys() {
        let (mut tree, _, a, _) = tree_with_children();
        let nested = tree.insert_child(a, "5").unwrap();
        tree.set_field(nested, StateSource::State, "x", json!(true)).unwrap();

        let snapshot = TreeFlattener::default().flatten(&tree, a).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("$root.0,1,5").unwrap()[PARENT_FIELD], json!("0,1"));
    }

    #[test]
    fn test_deep_tree_does_not_recurse() {
        let mut tree = ComponentArena::new();
        let mut current = tree.insert_root(Some("0")).unwrap();
        let root = current;
        for _ in 0..1_000 {
            current = tree.insert_child(current, "1").unwrap();
        }
        let snapshot = TreeFlattener::default().flatten(&tree, root).unwrap();
        assert_eq!(snapshot.len(), 1_001);
    }

    #[test]
    fn test_unknown_root() {
        let tree = ComponentArena::new();
        let result = TreeFlattener::default().flatten(&tree, NodeId(3));
        assert!(matches!(result, Err(SyncError::UnknownNode(_))));
    }
}
