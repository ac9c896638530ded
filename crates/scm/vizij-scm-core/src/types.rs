use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::noise::NoiseSpec;

pub type NodeId = String;

/// Serialized form of a structural causal model.
///
/// ```json
/// {
///   "nodes": ["A", "B"],
///   "edges": [["A", "B"]],
///   "equations": { "B": "lambda A: 2 * A" },
///   "noise": { "A": "N(0, 1)", "B": "N(0, 0.1)" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScmSpec {
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    #[serde(default)]
    pub edges: Vec<(NodeId, NodeId)>,
    #[serde(default)]
    pub equations: IndexMap<NodeId, String>,
    #[serde(default)]
    pub noise: IndexMap<NodeId, NoiseSpec>,
}

/// Per-node sample arrays produced by a single sampling call.
///
/// Every array has the same length (the requested sample count). Nodes appear in the
/// order they were evaluated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleBatch {
    columns: IndexMap<NodeId, Vec<f64>>,
}

impl SampleBatch {
    pub(crate) fn with_capacity(nodes: usize) -> Self {
        SampleBatch {
            columns: IndexMap::with_capacity(nodes),
        }
    }

    pub(crate) fn insert(&mut self, node: NodeId, data: Vec<f64>) {
        self.columns.insert(node, data);
    }

    /// Samples drawn for `node`, if it was part of the model.
    pub fn get(&self, node: &str) -> Option<&[f64]> {
        self.columns.get(node).map(Vec::as_slice)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.columns.contains_key(node)
    }

    /// Number of samples per node (0 for an empty batch).
    pub fn len(&self) -> usize {
        self.columns.values().next().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node identifiers in evaluation order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Sample mean for `node`; `None` when the node is absent or the batch is empty.
    pub fn mean(&self, node: &str) -> Option<f64> {
        let data = self.columns.get(node)?;
        if data.is_empty() {
            return None;
        }
        Some(data.iter().sum::<f64>() / data.len() as f64)
    }

    pub fn into_inner(self) -> IndexMap<NodeId, Vec<f64>> {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_reports_length_and_mean() {
        let mut batch = SampleBatch::with_capacity(2);
        batch.insert("a".into(), vec![1.0, 2.0, 3.0]);
        batch.insert("b".into(), vec![0.0, 0.0, 0.0]);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.mean("a"), Some(2.0));
        assert_eq!(batch.mean("missing"), None);
        assert_eq!(batch.nodes().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn batch_membership_and_ownership() {
        let mut batch = SampleBatch::default();
        batch.insert("x".into(), vec![4.0]);
        assert!(batch.contains("x"));
        assert!(!batch.contains("y"));
        let columns = batch.into_inner();
        assert_eq!(columns.get("x"), Some(&vec![4.0]));
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn spec_parses_from_json() {
        let spec: ScmSpec = serde_json::from_str(
            r#"{
                "nodes": ["A", "B"],
                "edges": [["A", "B"]],
                "equations": { "B": "lambda A: A + 1" },
                "noise": { "A": "N(0, 1)" }
            }"#,
        )
        .expect("spec should parse");
        assert_eq!(spec.edges, vec![("A".to_string(), "B".to_string())]);
        assert_eq!(spec.equations["B"], "lambda A: A + 1");
        assert_eq!(spec.noise["A"].as_str(), "N(0, 1)");
    }
}
