//! Component tree interface.
//!
//! The sync layer never owns the component tree. It reads it through the
//! [`ComponentTree`] trait: a node's local key, its parent, its ordered
//! children, its three state sources and its destroyed flag.
//!
//! # Design
//!
//! Nodes are addressed by [`NodeId`], an index into an arena. Children are
//! owned by their parent (forward edges); the parent link is a plain id and
//! never implies ownership.
//!
//! ```text
//! ComponentArena
//! ├── #0 "0"           parent: None
//! │   ├── #1 "1"       parent: #0
//! │   └── #2 "2"       parent: #0
//! │       └── #3 "1"   parent: #2
//! ```
//!
//! [`ComponentArena`] is the bundled implementation; any other tree can be
//! synced by implementing the trait.

mod arena;

pub use arena::{ComponentArena, ComponentNode};

use serde_json::{Map, Value};

/// Index of a component in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The three places a component keeps fields that must reach the host.
///
/// Order matters: when a field name appears in several sources, the later
/// source wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSource {
    /// Declared reactive state
    State,
    /// Declared external inputs passed down by the parent
    Inputs,
    /// Computed fields
    Computed,
}

impl StateSource {
    /// All sources in shadowing order (earliest first).
    pub const ALL: [StateSource; 3] = [StateSource::State, StateSource::Inputs, StateSource::Computed];
}

impl std::fmt::Display for StateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State => write!(f, "state"),
            Self::Inputs => write!(f, "inputs"),
            Self::Computed => write!(f, "computed"),
        }
    }
}

/// Read access to a component tree.
pub trait ComponentTree {
    /// Whether `id` names a node of this tree.
    fn contains(&self, id: NodeId) -> bool;

    /// The node's key among its siblings. `None` for a keyless (root) node.
    fn component_key(&self, id: NodeId) -> Option<&str>;

    /// The node's parent, `None` for a root.
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Ordered children. May include destroyed nodes; callers filter.
    fn children(&self, id: NodeId) -> &[NodeId];

    /// One of the node's state mappings, `None` if the node has none.
    fn state(&self, id: NodeId, source: StateSource) -> Option<&Map<String, Value>>;

    /// Destroyed nodes are never synchronized again.
    fn is_destroyed(&self, id: NodeId) -> bool;

    /// Topmost ancestor of `id` (itself if it has no parent).
    fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }
}
