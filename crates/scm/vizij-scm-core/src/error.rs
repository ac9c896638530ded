use thiserror::Error;

use crate::types::NodeId;

/// Errors produced while loading a structural causal model or sampling from it.
///
/// Every variant is fatal for the call that raised it; samplers never hand back a
/// partially filled batch.
#[derive(Debug, Error)]
pub enum ScmError {
    #[error("malformed structural equation '{spec}': {reason}")]
    SpecParse { spec: String, reason: String },
    #[error("node '{node}' references '{param}', which is not among its computed parents")]
    MissingParent { node: NodeId, param: String },
    #[error("evaluating node '{node}' failed at sample {index}: {cause}")]
    Evaluation {
        node: NodeId,
        index: usize,
        cause: String,
    },
    #[error("cycle detected in causal graph (unscheduled nodes: {remaining:?})")]
    CyclicGraph { remaining: Vec<NodeId> },
    #[error("cannot resolve noise '{spec}' for node '{node}': {reason}")]
    UnknownDistribution {
        node: NodeId,
        spec: String,
        reason: String,
    },
    #[error("invalid intervention on '{node}': {reason}")]
    InvalidIntervention { node: NodeId, reason: String },
    #[error("unknown node '{0}'")]
    UnknownNode(NodeId),
    #[error("node '{0}' has no structural equation")]
    MissingEquation(NodeId),
    #[error("root node '{0}' has no noise specification")]
    MissingNoise(NodeId),
    #[error("scm json parse error: {0}")]
    InvalidSpec(#[from] serde_json::Error),
}

impl ScmError {
    /// Node the error is attributed to, when there is one.
    pub fn node(&self) -> Option<&str> {
        match self {
            ScmError::MissingParent { node, .. }
            | ScmError::Evaluation { node, .. }
            | ScmError::UnknownDistribution { node, .. }
            | ScmError::InvalidIntervention { node, .. } => Some(node),
            ScmError::UnknownNode(node)
            | ScmError::MissingEquation(node)
            | ScmError::MissingNoise(node) => Some(node),
            ScmError::SpecParse { .. } | ScmError::CyclicGraph { .. } | ScmError::InvalidSpec(_) => {
                None
            }
        }
    }

    pub(crate) fn spec_parse(spec: &str, reason: impl Into<String>) -> Self {
        ScmError::SpecParse {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}
