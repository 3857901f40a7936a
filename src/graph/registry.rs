// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Live node set in creation order

use super::{Node, NodeId};
use ahash::{AHashMap, AHashSet};

/// Live nodes, iterable in creation order
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: AHashMap<NodeId, Node>,
    order: Vec<NodeId>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) {
        let id = node.id();
        if self.nodes.insert(id, node).is_none() {
            self.order.push(id);
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;
        self.order.retain(|n| *n != id);
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `prefix` followed by the lowest integer suffix not in `taken`
    pub fn unique_name<'a>(prefix: &str, taken: impl IntoIterator<Item = &'a str>) -> String {
        let taken: AHashSet<&str> = taken.into_iter().collect();
        (0u64..)
            .map(|i| format!("{prefix}{i}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| prefix.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_name_fills_gaps() {
        assert_eq!(NodeRegistry::unique_name("c", ["c0", "c2"]), "c1");
        assert_eq!(NodeRegistry::unique_name("c", []), "c0");
        assert_eq!(NodeRegistry::unique_name("c", ["c0", "c1", "circle"]), "c2");
    }

    #[test]
    fn test_order_is_stable() {
        let mut registry = NodeRegistry::new();
        for i in [3, 1, 2] {
            registry.insert(Node::new(NodeId(i), "Point3d"));
        }
        registry.remove(NodeId(1));
        let ids: Vec<_> = registry.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec![NodeId(3), NodeId(2)]);
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains(NodeId(1)));
    }
}
