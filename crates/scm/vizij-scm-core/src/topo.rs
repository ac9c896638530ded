use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::error::ScmError;
use crate::graph::CausalGraph;
use crate::types::NodeId;

/// Order nodes so that every parent precedes its children.
///
/// Kahn's algorithm seeded in insertion order; ties always resolve the same way for
/// the same graph.
pub fn topo_order(graph: &CausalGraph) -> Result<Vec<NodeId>, ScmError> {
    let mut indeg: HashMap<&str, usize> = HashMap::with_capacity(graph.len());
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();

    for id in graph.nodes() {
        indeg.insert(id.as_str(), graph.in_degree(id));
        for parent in graph.parents(id) {
            adj.entry(parent.as_str()).or_default().push(id.as_str());
        }
    }

    let mut q: VecDeque<&str> = graph
        .nodes()
        .map(|id| id.as_str())
        .filter(|id| indeg.get(id).copied() == Some(0))
        .collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(u) = q.pop_front() {
        order.push(u.to_string());
        if let Some(vs) = adj.get(u) {
            for v in vs {
                if let Some(d) = indeg.get_mut(v) {
                    *d -= 1;
                    if *d == 0 {
                        q.push_back(*v);
                    }
                }
            }
        }
    }

    if order.len() != graph.len() {
        let remaining = graph
            .nodes()
            .filter(|id| indeg.get(id.as_str()).copied().unwrap_or(0) > 0)
            .cloned()
            .collect();
        return Err(ScmError::CyclicGraph { remaining });
    }
    Ok(order)
}
