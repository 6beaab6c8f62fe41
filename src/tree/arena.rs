//! Arena-backed component tree.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::PATH_DELIMITERS;
use crate::error::SyncError;

use super::{ComponentTree, NodeId, StateSource};

/// A component stored in a [`ComponentArena`].
#[derive(Debug, Clone, Default)]
pub struct ComponentNode {
    key: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    state: Map<String, Value>,
    inputs: Map<String, Value>,
    computed: Map<String, Value>,
    destroyed: bool,
}

impl ComponentNode {
    fn source(&self, source: StateSource) -> &Map<String, Value> {
        match source {
            StateSource::State => &self.state,
            StateSource::Inputs => &self.inputs,
            StateSource::Computed => &self.computed,
        }
    }

    fn source_mut(&mut self, source: StateSource) -> &mut Map<String, Value> {
        match source {
            StateSource::State => &mut self.state,
            StateSource::Inputs => &mut self.inputs,
            StateSource::Computed => &mut self.computed,
        }
    }
}

/// Component tree stored in a flat vector, addressed by [`NodeId`].
///
/// Nodes are never removed from the arena, so ids stay valid; destroyed
/// nodes stay in place with their flag set. Nodes never move either, so a
/// node's path key is fixed for its lifetime.
///
/// Keys are checked on insert: a key must be non-empty, free of field path
/// delimiters (`.`, `[`, `]`) and unique among its live siblings. Live
/// roots count as siblings of each other.
///
/// # Example
///
/// ```
/// use view_sync::{ComponentArena, ComponentTree, StateSource};
/// use serde_json::json;
///
/// let mut tree = ComponentArena::new();
/// let root = tree.insert_root(Some("0")).unwrap();
/// let child = tree.insert_child(root, "1").unwrap();
/// tree.set_field(child, StateSource::State, "count", json!(1)).unwrap();
///
/// assert_eq!(tree.parent(child), Some(root));
/// assert_eq!(tree.children(root), &[child]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ComponentArena {
    nodes: Vec<ComponentNode>,
}

impl ComponentArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever inserted (destroyed included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert a parentless node. A keyless root contributes nothing to its
    /// descendants' path keys.
    pub fn insert_root(&mut self, key: Option<&str>) -> Result<NodeId, SyncError> {
        if let Some(key) = key {
            check_key(key)?;
        }
        let taken = self
            .nodes
            .iter()
            .any(|n| n.parent.is_none() && !n.destroyed && n.key.as_deref() == key);
        if taken {
            return Err(SyncError::InvalidKey {
                key: key.unwrap_or_default().to_string(),
                reason: "already used by a live root",
            });
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(ComponentNode {
            key: key.map(str::to_string),
            ..Default::default()
        });
        Ok(id)
    }

    /// Insert a node as the last child of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, key: &str) -> Result<NodeId, SyncError> {
        if !self.contains(parent) {
            return Err(SyncError::UnknownNode(parent));
        }
        check_key(key)?;
        let taken = self.nodes[parent.0].children.iter().any(|child| {
            let sibling = &self.nodes[child.0];
            !sibling.destroyed && sibling.key.as_deref() == Some(key)
        });
        if taken {
            return Err(SyncError::InvalidKey {
                key: key.to_string(),
                reason: "already used by a live sibling",
            });
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(ComponentNode {
            key: Some(key.to_string()),
            parent: Some(parent),
            ..Default::default()
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Set one field of one state source.
    pub fn set_field(
        &mut self,
        id: NodeId,
        source: StateSource,
        name: &str,
        value: Value,
    ) -> Result<(), SyncError> {
        let node = self.node_mut(id)?;
        node.source_mut(source).insert(name.to_string(), value);
        Ok(())
    }

    /// Remove one field of one state source, returning its old value.
    pub fn remove_field(
        &mut self,
        id: NodeId,
        source: StateSource,
        name: &str,
    ) -> Result<Option<Value>, SyncError> {
        let node = self.node_mut(id)?;
        Ok(node.source_mut(source).remove(name))
    }

    /// Mutable access to a whole state source.
    pub fn state_mut(
        &mut self,
        id: NodeId,
        source: StateSource,
    ) -> Result<&mut Map<String, Value>, SyncError> {
        Ok(self.node_mut(id)?.source_mut(source))
    }

    /// Mark `id` and all of its descendants destroyed.
    ///
    /// Returns how many nodes changed state.
    pub fn destroy(&mut self, id: NodeId) -> Result<usize, SyncError> {
        if !self.contains(id) {
            return Err(SyncError::UnknownNode(id));
        }
        let mut changed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.0];
            if !node.destroyed {
                node.destroyed = true;
                changed += 1;
            }
            stack.extend(node.children.iter().copied());
        }
        debug!(node = %id, destroyed = changed, "Component subtree destroyed");
        Ok(changed)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut ComponentNode, SyncError> {
        self.nodes.get_mut(id.0).ok_or(SyncError::UnknownNode(id))
    }
}

fn check_key(key: &str) -> Result<(), SyncError> {
    let reason = if key.is_empty() {
        "empty"
    } else if key.contains(PATH_DELIMITERS) {
        "contains a field path delimiter"
    } else {
        return Ok(());
    };
    Err(SyncError::InvalidKey { key: key.to_string(), reason })
}

impl ComponentTree for ComponentArena {
    fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    fn component_key(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).and_then(|n| n.key.as_deref())
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map_or(&[], |n| n.children.as_slice())
    }

    fn state(&self, id: NodeId, source: StateSource) -> Option<&Map<String, Value>> {
        self.nodes.get(id.0).map(|n| n.source(source))
    }

    fn is_destroyed(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|n| n.destroyed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> (ComponentArena, NodeId, NodeId, NodeId) {
        let mut tree = ComponentArena::new();
        let root = tree.insert_root(Some("0")).unwrap();
        let a = tree.insert_child(root, "1").unwrap();
        let b = tree.insert_child(a, "1").unwrap();
        (tree, root, a, b)
    }

    #[test]
    fn test_links() {
        let (tree, root, a, b) = sample();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.parent(b), Some(a));
        assert_eq!(tree.children(root), &[a]);
        assert_eq!(tree.root_of(b), root);
        assert_eq!(tree.component_key(b), Some("1"));
    }

    #[test]
    fn test_insert_under_unknown_parent() {
        let mut tree = ComponentArena::new();
        let result = tree.insert_child(NodeId(7), "1");
        assert!(matches!(result, Err(SyncError::UnknownNode(NodeId(7)))));
    }

    #[test]
    fn test_fields_per_source() {
        let (mut tree, _, a, _) = sample();
        tree.set_field(a, StateSource::State, "count", json!(1)).unwrap();
        tree.set_field(a, StateSource::Computed, "double", json!(2)).unwrap();

        assert_eq!(tree.state(a, StateSource::State).unwrap()["count"], json!(1));
        assert!(tree.state(a, StateSource::Inputs).unwrap().is_empty());

        let old = tree.remove_field(a, StateSource::State, "count").unwrap();
        assert_eq!(old, Some(json!(1)));
        assert!(tree.state(a, StateSource::State).unwrap().is_empty());
    }

    #[test]
    fn test_destroy_marks_subtree() {
        let (mut tree, root, a, b) = sample();
        assert_eq!(tree.destroy(a).unwrap(), 2);
        assert!(!tree.is_destroyed(root));
        assert!(tree.is_destroyed(a));
        assert!(tree.is_destroyed(b));

        // Idempotent
        assert_eq!(tree.destroy(a).unwrap(), 0);
    }

    #[test]
    fn test_rejects_unaddressable_keys() {
        let (mut tree, root, _, _) = sample();
        for key in ["", "a.b", "c[1]", "x]"] {
            let result = tree.insert_child(root, key);
            assert!(matches!(result, Err(SyncError::InvalidKey { .. })), "{key:?} accepted");
            assert!(matches!(tree.insert_root(Some(key)), Err(SyncError::InvalidKey { .. })));
        }
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_rejects_duplicate_live_sibling() {
        let (mut tree, root, a, _) = sample();
        let result = tree.insert_child(root, "1");
        assert!(matches!(result, Err(SyncError::InvalidKey { ref key, .. }) if key == "1"));

        // Same key under a different parent is a different path
        tree.insert_child(a, "2").unwrap();
        tree.insert_child(root, "2").unwrap();

        // A destroyed sibling frees its key
        tree.destroy(a).unwrap();
        let again = tree.insert_child(root, "1").unwrap();
        assert_eq!(tree.children(root).len(), 3);
        assert_eq!(tree.component_key(again), Some("1"));
    }

    #[test]
    fn test_rejects_duplicate_live_root() {
        let (mut tree, root, _, _) = sample();
        assert!(matches!(tree.insert_root(Some("0")), Err(SyncError::InvalidKey { .. })));
        tree.insert_root(Some("9")).unwrap();

        tree.insert_root(None).unwrap();
        assert!(matches!(tree.insert_root(None), Err(SyncError::InvalidKey { .. })));

        tree.destroy(root).unwrap();
        tree.insert_root(Some("0")).unwrap();
    }

    #[test]
    fn test_unknown_ids_read_empty() {
        let tree = ComponentArena::new();
        assert!(!tree.contains(NodeId(0)));
        assert!(tree.children(NodeId(0)).is_empty());
        assert!(tree.state(NodeId(0), StateSource::State).is_none());
        assert!(!tree.is_destroyed(NodeId(0)));
    }
}
