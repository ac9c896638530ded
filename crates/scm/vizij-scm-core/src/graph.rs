//! Directed graph of causal variables.

use indexmap::IndexMap;

use crate::types::NodeId;

/// Parent lists keyed by node, both kept in insertion order.
///
/// Cycles are representable; they are rejected by [`topo_order`](crate::topo::topo_order)
/// when a sampler asks for an evaluation order.
#[derive(Debug, Clone, Default)]
pub struct CausalGraph {
    parents: IndexMap<NodeId, Vec<NodeId>>,
}

impl CausalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` if it is not already present.
    pub fn add_node(&mut self, id: impl Into<NodeId>) {
        self.parents.entry(id.into()).or_default();
    }

    /// Add the edge `parent -> child`, creating either endpoint on demand.
    /// Duplicate edges are ignored.
    pub fn add_edge(&mut self, parent: impl Into<NodeId>, child: impl Into<NodeId>) {
        let parent = parent.into();
        self.add_node(parent.clone());
        let list = self.parents.entry(child.into()).or_default();
        if !list.contains(&parent) {
            list.push(parent);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.parents.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.parents.keys()
    }

    /// Index of `id` in insertion order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.parents.get_index_of(id)
    }

    pub fn parents(&self, id: &str) -> &[NodeId] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.parents
            .iter()
            .filter(move |(_, ps)| ps.iter().any(|p| p == id))
            .map(|(child, _)| child)
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.parents(id).len()
    }

    /// A root has no parents; its value is its noise draw.
    pub fn is_root(&self, id: &str) -> bool {
        self.in_degree(id) == 0
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
