//! Observational (L1) and interventional (L2) sampling.
//!
//! Both samplers walk the causal graph in [`topo_order`] and fill a fresh
//! [`SampleBatch`]:
//!
//! - [`Sampler::sample_observational`] draws noise for every node up front, then sets
//!   roots to their noise and every other node to `f(parents) + noise`.
//! - [`Sampler::sample_intervened`] dispatches on the active [`Intervention`] for each
//!   node and draws noise lazily, only for nodes that actually consume it.
//!
//! Any error aborts the call; the batch is only returned once every node is filled.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value as JsonValue;

use crate::config::SamplerConfig;
use crate::equation::CompiledEquation;
use crate::error::ScmError;
use crate::intervention::{parse_interventions, Intervention};
use crate::noise::{DistributionFactory, NoiseFactory, NoiseSpec};
use crate::scm::{InterventionContext, Scm};
use crate::topo::topo_order;
use crate::types::SampleBatch;


/// Draws sample batches from an [`Scm`], owning the noise RNG and factory.
pub struct Sampler<F: NoiseFactory = DistributionFactory> {
    factory: F,
    rng: StdRng,
}

impl Sampler {
    pub fn new(config: &SamplerConfig) -> Self {
        Self::with_factory(config, DistributionFactory)
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(&SamplerConfig::default())
    }
}

impl<F: NoiseFactory> Sampler<F> {
    pub fn with_factory(config: &SamplerConfig, factory: F) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Sampler { factory, rng }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Observational samples: the model exactly as specified.
    pub fn sample_observational(&mut self, scm: &Scm, n: usize) -> Result<SampleBatch, ScmError> {
        let order = topo_order(scm.graph())?;
        log::debug!("observational sampling: {} nodes x {n} samples", order.len());

        let mut noise = Vec::with_capacity(order.len());
        for node in scm.graph().nodes() {
            noise.push(self.node_noise(scm, node, n)?);
        }

        let mut data = SampleBatch::with_capacity(order.len());
        for node in &order {
            let idx = scm
                .graph()
                .position(node)
                .ok_or_else(|| ScmError::UnknownNode(node.clone()))?;
            let eps = std::mem::take(&mut noise[idx]);
            let values = if scm.graph().is_root(node) {
                eps
            } else {
                let eq = scm
                    .equation(node)
                    .ok_or_else(|| ScmError::MissingEquation(node.clone()))?;
                add_noise(structural(scm, node, eq, &data, n)?, &eps)
            };
            log::trace!("sampled '{node}'");
            data.insert(node.clone(), values);
        }
        Ok(data)
    }

    /// Interventional samples under the interventions carried by `ctx`.
    pub fn sample_intervened(
        &mut self,
        ctx: &InterventionContext<'_>,
        n: usize,
    ) -> Result<SampleBatch, ScmError> {
        let scm = ctx.scm();
        let order = topo_order(scm.graph())?;
        log::debug!(
            "interventional sampling: {} nodes x {n} samples, {} intervened",
            order.len(),
            ctx.interventions().len()
        );

        let mut data = SampleBatch::with_capacity(order.len());
        for node in &order {
            let values = match ctx.get(node) {
                Some(Intervention::Constant(v)) | Some(Intervention::ValueWrapper(v)) => {
                    vec![*v; n]
                }
                Some(Intervention::CustomFunction) => {
                    let eq = scm
                        .equation(node)
                        .ok_or_else(|| ScmError::MissingEquation(node.clone()))?;
                    let values = structural(scm, node, eq, &data, n)?;
                    match scm.noise(node) {
                        Some(spec) => add_noise(values, &self.draw(node, spec, n)?),
                        None => values,
                    }
                }
                None if scm.graph().is_root(node) => self.node_noise(scm, node, n)?,
                None => {
                    let eq = scm
                        .equation(node)
                        .ok_or_else(|| ScmError::MissingEquation(node.clone()))?;
                    let values = structural(scm, node, eq, &data, n)?;
                    add_noise(values, &self.node_noise(scm, node, n)?)
                }
            };
            log::trace!("sampled '{node}' (intervened: {})", ctx.is_intervened(node));
            data.insert(node.clone(), values);
        }
        Ok(data)
    }

    /// Parse `interventions`, apply them to `scm` and sample.
    pub fn sample_interventional(
        &mut self,
        scm: &Scm,
        n: usize,
        interventions: &JsonValue,
    ) -> Result<SampleBatch, ScmError> {
        let ctx = scm.intervene(parse_interventions(interventions)?)?;
        self.sample_intervened(&ctx, n)
    }

    /// Noise consumed by `node` in its normal generative rule. Roots must have a noise
    /// specification; other nodes without one get a zero vector.
    fn node_noise(&mut self, scm: &Scm, node: &str, n: usize) -> Result<Vec<f64>, ScmError> {
        match scm.noise(node) {
            Some(spec) => self.draw(node, spec, n),
            None if scm.graph().is_root(node) => Err(ScmError::MissingNoise(node.to_string())),
            None => Ok(vec![0.0; n]),
        }
    }

    fn draw(&mut self, node: &str, spec: &NoiseSpec, n: usize) -> Result<Vec<f64>, ScmError> {
        let dist = self.factory.distribution(node, spec)?;
        let draws = dist.sample(&mut self.rng, n);
        if draws.len() != n {
            return Err(ScmError::UnknownDistribution {
                node: node.to_string(),
                spec: spec.to_string(),
                reason: format!("sampler returned {} values, expected {n}", draws.len()),
            });
        }
        Ok(draws)
    }
}

/// Evaluate the structural equation of `node`, reading only its declared parents.
fn structural(
    scm: &Scm,
    node: &str,
    eq: &CompiledEquation,
    data: &SampleBatch,
    n: usize,
) -> Result<Vec<f64>, ScmError> {
    let parents = scm.graph().parents(node);
    eq.evaluate(
        node,
        |name| {
            if parents.iter().any(|p| p == name) {
                data.get(name)
            } else {
                None
            }
        },
        n,
    )
}

fn add_noise(mut values: Vec<f64>, noise: &[f64]) -> Vec<f64> {
    for (v, e) in values.iter_mut().zip(noise) {
        *v += e;
    }
    values
}

/// Observational samples with a default (entropy-seeded) sampler.
pub fn sample_l1(scm: &Scm, n: usize) -> Result<SampleBatch, ScmError> {
    Sampler::new(&SamplerConfig::default()).sample_observational(scm, n)
}

/// Interventional samples with a default (entropy-seeded) sampler.
pub fn sample_l2(scm: &Scm, n: usize, interventions: &JsonValue) -> Result<SampleBatch, ScmError> {
    Sampler::new(&SamplerConfig::default()).sample_interventional(scm, n, interventions)
}
