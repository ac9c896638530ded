//! Interventions (`do(X = x)`) and the parser that normalizes loosely structured input.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::error::ScmError;
use crate::types::NodeId;

/// How an intervened node produces its samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intervention {
    /// Scalar broadcast to every sample.
    Constant(f64),
    /// `{ "value": x }`; behaves exactly like [`Intervention::Constant`].
    ValueWrapper(f64),
    /// Structured entry without `value`: the node keeps its registered equation (plus
    /// its own noise, when it has a noise specification) as a soft intervention.
    CustomFunction,
}

impl Intervention {
    /// The broadcast value for the hard (constant) kinds.
    pub fn constant_value(&self) -> Option<f64> {
        match *self {
            Intervention::Constant(v) | Intervention::ValueWrapper(v) => Some(v),
            Intervention::CustomFunction => None,
        }
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, Intervention::CustomFunction)
    }
}

pub type InterventionMap = IndexMap<NodeId, Intervention>;

fn scalar(node: &str, value: &JsonValue) -> Result<f64, ScmError> {
    let invalid = |reason: String| ScmError::InvalidIntervention {
        node: node.to_string(),
        reason,
    };
    match value {
        JsonValue::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{n} is not representable as f64"))),
        JsonValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("'{s}' is not a number"))),
        other => Err(invalid(format!("expected a number, found {other}"))),
    }
}

/// Normalize raw intervention input into an [`InterventionMap`].
///
/// Accepted per-node forms:
/// - `1.5`, `"1.5"` or a boolean (`true` is 1, `false` is 0) → [`Intervention::Constant`]
/// - `{ "value": 1.5 }` → [`Intervention::ValueWrapper`]
/// - `{ ... }` without `value` → [`Intervention::CustomFunction`]
pub fn parse_interventions(raw: &JsonValue) -> Result<InterventionMap, ScmError> {
    let entries = match raw {
        JsonValue::Object(map) => map,
        JsonValue::Null => return Ok(InterventionMap::new()),
        other => {
            return Err(ScmError::InvalidIntervention {
                node: String::new(),
                reason: format!("expected an object keyed by node, found {other}"),
            })
        }
    };

    let mut out = InterventionMap::with_capacity(entries.len());
    for (node, entry) in entries {
        let parsed = match entry {
            JsonValue::Number(_) | JsonValue::String(_) | JsonValue::Bool(_) => {
                Intervention::Constant(scalar(node, entry)?)
            }
            JsonValue::Object(fields) => match fields.get("value") {
                Some(value) => Intervention::ValueWrapper(scalar(node, value)?),
                None => Intervention::CustomFunction,
            },
            other => {
                return Err(ScmError::InvalidIntervention {
                    node: node.clone(),
                    reason: format!("unsupported intervention entry {other}"),
                })
            }
        };
        out.insert(node.clone(), parsed);
    }
    Ok(out)
}
