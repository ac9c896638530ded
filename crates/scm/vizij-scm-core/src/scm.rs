//! The structural causal model: graph, compiled equations and noise descriptors.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::equation::{CompiledEquation, EquationCache};
use crate::error::ScmError;
use crate::graph::CausalGraph;
use crate::intervention::{Intervention, InterventionMap};
use crate::noise::NoiseSpec;
use crate::types::{NodeId, ScmSpec};

/// A loaded SCM. Read-only once built; samplers borrow it.
#[derive(Debug)]
pub struct Scm {
    graph: CausalGraph,
    equations: IndexMap<NodeId, Arc<CompiledEquation>>,
    noise: IndexMap<NodeId, NoiseSpec>,
}

impl Scm {
    /// Build and validate a model, compiling every structural equation once.
    pub fn from_spec(spec: ScmSpec) -> Result<Self, ScmError> {
        let mut graph = CausalGraph::new();
        for id in &spec.nodes {
            graph.add_node(id.clone());
        }
        for (parent, child) in &spec.edges {
            graph.add_edge(parent.clone(), child.clone());
        }

        let mut cache = EquationCache::new();
        let mut equations = IndexMap::with_capacity(spec.equations.len());
        for (node, text) in &spec.equations {
            if !graph.contains(node) {
                return Err(ScmError::UnknownNode(node.clone()));
            }
            let compiled = cache.get_or_compile(text)?;
            let parents = graph.parents(node);
            if let Some(param) = compiled.params().iter().find(|p| !parents.contains(*p)) {
                return Err(ScmError::MissingParent {
                    node: node.clone(),
                    param: param.clone(),
                });
            }
            if parents.is_empty() {
                log::warn!(
                    "root node '{node}' has equation '{text}'; only soft interventions will use it"
                );
            }
            equations.insert(node.clone(), compiled);
        }

        for node in graph.nodes() {
            if !graph.is_root(node) && !equations.contains_key(node) {
                return Err(ScmError::MissingEquation(node.clone()));
            }
        }

        for node in spec.noise.keys() {
            if !graph.contains(node) {
                return Err(ScmError::UnknownNode(node.clone()));
            }
        }

        log::debug!(
            "loaded scm: {} nodes, {} equations ({} distinct), {} noise terms",
            graph.len(),
            equations.len(),
            cache.len(),
            spec.noise.len()
        );

        Ok(Scm {
            graph,
            equations,
            noise: spec.noise,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, ScmError> {
        let spec: ScmSpec = serde_json::from_str(text)?;
        Self::from_spec(spec)
    }

    pub fn graph(&self) -> &CausalGraph {
        &self.graph
    }

    pub fn equation(&self, node: &str) -> Option<&CompiledEquation> {
        self.equations.get(node).map(|eq| eq.as_ref())
    }

    pub fn noise(&self, node: &str) -> Option<&NoiseSpec> {
        self.noise.get(node)
    }

    /// Resolve `interventions` against this model.
    ///
    /// The model itself is not modified; the returned context carries the active
    /// interventions for a single sampling call.
    pub fn intervene(
        &self,
        interventions: InterventionMap,
    ) -> Result<InterventionContext<'_>, ScmError> {
        for (node, intervention) in &interventions {
            if !self.graph.contains(node) {
                return Err(ScmError::UnknownNode(node.clone()));
            }
            if intervention.is_soft() && !self.equations.contains_key(node) {
                return Err(ScmError::MissingEquation(node.clone()));
            }
        }
        log::debug!(
            "intervening on [{}]",
            interventions.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(InterventionContext {
            scm: self,
            active: interventions,
        })
    }
}

/// A model paired with the interventions active for one sampling call.
#[derive(Debug)]
pub struct InterventionContext<'a> {
    scm: &'a Scm,
    active: InterventionMap,
}

impl<'a> InterventionContext<'a> {
    pub fn scm(&self) -> &'a Scm {
        self.scm
    }

    pub fn get(&self, node: &str) -> Option<&Intervention> {
        self.active.get(node)
    }

    pub fn is_intervened(&self, node: &str) -> bool {
        self.active.contains_key(node)
    }

    pub fn interventions(&self) -> &InterventionMap {
        &self.active
    }
}
