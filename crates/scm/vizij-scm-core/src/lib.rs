//! Structural causal model (SCM) sampling.
//!
//! An [`Scm`] is loaded from a JSON [`ScmSpec`]: a DAG of named nodes, a lambda-style
//! structural equation per non-root node and a noise descriptor per node. A [`Sampler`]
//! draws observational batches ([`Sampler::sample_observational`], rung one) or batches
//! under `do(...)` interventions ([`Sampler::sample_interventional`], rung two).
//!
//! ```no_run
//! use vizij_scm_core::{Sampler, SamplerConfig, Scm};
//!
//! let scm = Scm::from_json(r#"{
//!     "nodes": ["X", "Y"],
//!     "edges": [["X", "Y"]],
//!     "equations": { "Y": "lambda X: 2 * X" },
//!     "noise": { "X": "N(0, 1)", "Y": "N(0, 0.1)" }
//! }"#)?;
//! let mut sampler = Sampler::new(&SamplerConfig::seeded(7));
//! let batch = sampler.sample_interventional(&scm, 100, &serde_json::json!({ "X": 1.0 }))?;
//! assert_eq!(batch.get("X").map(|xs| xs[0]), Some(1.0));
//! # Ok::<(), vizij_scm_core::ScmError>(())
//! ```

pub mod config;
pub mod equation;
pub mod error;
pub mod graph;
pub mod intervention;
pub mod noise;
pub mod sample;
pub mod scm;
pub mod topo;
pub mod types;

pub use config::SamplerConfig;
pub use equation::{parse_parameters, CompiledEquation, EquationCache};
pub use error::ScmError;
pub use graph::CausalGraph;
pub use intervention::{parse_interventions, Intervention, InterventionMap};
pub use noise::{DistributionFactory, NoiseDistribution, NoiseFactory, NoiseSpec};
pub use sample::{sample_l1, sample_l2, Sampler};
pub use scm::{InterventionContext, Scm};
pub use topo::topo_order;
pub use types::{NodeId, SampleBatch, ScmSpec};
