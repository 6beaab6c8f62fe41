// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hierarchical path keys for components.
//!
//! A component's path key joins the local keys of its ancestors and itself,
//! root first:
//!
//! ```text
//! "0"              root
//! └── "1"          path key "0,1"
//!     └── "2"      path key "0,1,2"
//! ```
//!
//! Path keys are stored in the host under a single namespace field, so the
//! snapshot key of `0,1` is `$root.0,1`. Because the separator is never
//! the field-path delimiter `.`, the differ can resolve `$root.0,1` against
//! host state as `host["$root"]["0,1"]`.

use crate::config::SyncConfig;
use crate::tree::{ComponentTree, NodeId};

/// A component's position in its tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey {
    own: String,
    prefix: String,
    parent: String,
}

impl PathKey {
    /// Full key, e.g. `0,1,2`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.own
    }

    /// Key followed by the separator, e.g. `0,1,2,`. Every descendant's key
    /// starts with this prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Parent's key, empty for a root.
    #[must_use]
    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// Whether `other` lies strictly below this key.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &PathKey) -> bool {
        other.own.starts_with(&self.prefix)
    }
}

impl std::fmt::Display for PathKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.own)
    }
}

/// Derives [`PathKey`]s from a tree and namespaces them for the host.
#[derive(Debug, Clone)]
pub struct KeyPathEncoder {
    separator: String,
    namespace: String,
}

impl KeyPathEncoder {
    pub fn new(separator: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            namespace: namespace.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.key_separator.clone(), config.root_namespace.clone())
    }

    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Path key of `id`, built from its ancestor chain.
    ///
    /// Keyless ancestors (normally the root) contribute nothing.
    pub fn encode<T: ComponentTree + ?Sized>(&self, tree: &T, id: NodeId) -> PathKey {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = tree.parent(current) {
            chain.push(parent);
            current = parent;
        }

        let mut key: Option<PathKey> = None;
        for node in chain.into_iter().rev() {
            key = Some(self.child(key.as_ref(), tree.component_key(node)));
        }
        // chain always holds `id`
        key.unwrap_or_else(|| self.child(None, None))
    }

    /// Key of a child with local key `local` under `parent`.
    pub fn child(&self, parent: Option<&PathKey>, local: Option<&str>) -> PathKey {
        let parent_key = parent.map_or("", PathKey::as_str);
        let mut own = String::with_capacity(parent_key.len() + self.separator.len() + 8);
        own.push_str(parent_key);
        if let Some(local) = local.filter(|k| !k.is_empty()) {
            if !own.is_empty() {
                own.push_str(&self.separator);
            }
            own.push_str(local);
        }
        let prefix = format!("{own}{}", self.separator);
        PathKey {
            own,
            prefix,
            parent: parent_key.to_string(),
        }
    }

    /// Host-facing key: `namespace.pathkey`.
    #[must_use]
    pub fn snapshot_key(&self, key: &PathKey) -> String {
        format!("{}.{}", self.namespace, key.own)
    }
}

impl Default for KeyPathEncoder {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}
