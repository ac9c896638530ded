//! Exogenous noise: descriptors, the factory that resolves them, and the samplers it
//! produces.
//!
//! A [`NoiseSpec`] is a short textual descriptor such as `N(0, 1)`, `uniform(-1, 1)`
//! or `zero`. The sampler resolves descriptors through a [`NoiseFactory`], so callers can
//! swap in their own distributions (or fixed draws) without touching the engine.

use std::fmt;

use rand::distributions::{Bernoulli, Distribution, Uniform};
use rand::RngCore;
use rand_distr::{Cauchy, Exp, LogNormal, Normal};
use serde::{Deserialize, Serialize};

use crate::error::ScmError;

/// Textual noise descriptor: `family(arg, ...)` or a bare `family`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoiseSpec(String);

impl NoiseSpec {
    pub fn new(text: impl Into<String>) -> Self {
        NoiseSpec(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into a lowercase family name and numeric arguments.
    pub fn parts(&self) -> Result<(String, Vec<f64>), String> {
        let text = self.0.trim();
        let (name, args) = match text.split_once('(') {
            Some((name, rest)) => {
                let inner = rest
                    .trim_end()
                    .strip_suffix(')')
                    .ok_or_else(|| "missing closing ')'".to_string())?;
                (name, inner)
            }
            None => (text, ""),
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err("empty distribution name".to_string());
        }
        let args = args
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| {
                a.parse::<f64>()
                    .map_err(|_| format!("argument '{a}' is not a number"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((name, args))
    }
}

impl fmt::Display for NoiseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoiseSpec {
    fn from(text: &str) -> Self {
        NoiseSpec::new(text)
    }
}

/// Draws `n` independent values per call.
pub trait NoiseDistribution {
    fn sample(&self, rng: &mut dyn RngCore, n: usize) -> Vec<f64>;
}

/// Resolves a noise descriptor into a sampler.
pub trait NoiseFactory {
    fn distribution(
        &self,
        node: &str,
        spec: &NoiseSpec,
    ) -> Result<Box<dyn NoiseDistribution>, ScmError>;
}

/// Adapter from any `rand` distribution over `f64`.
struct RandNoise<D>(D);

impl<D: Distribution<f64>> NoiseDistribution for RandNoise<D> {
    fn sample(&self, rng: &mut dyn RngCore, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.0.sample(&mut *rng)).collect()
    }
}

struct BernoulliNoise(Bernoulli);

impl NoiseDistribution for BernoulliNoise {
    fn sample(&self, rng: &mut dyn RngCore, n: usize) -> Vec<f64> {
        (0..n)
            .map(|_| if self.0.sample(&mut *rng) { 1.0 } else { 0.0 })
            .collect()
    }
}

/// Degenerate distribution returning the same value every draw.
pub struct ConstantNoise(pub f64);

impl NoiseDistribution for ConstantNoise {
    fn sample(&self, _rng: &mut dyn RngCore, n: usize) -> Vec<f64> {
        vec![self.0; n]
    }
}

/// Default [`NoiseFactory`] backed by `rand_distr`.
///
/// | family | arguments (defaults) |
/// | --- | --- |
/// | `normal`, `gaussian`, `n` | mean (0), std (1) |
/// | `uniform`, `u` | low (0), high (1) |
/// | `exponential`, `exp` | rate (1) |
/// | `lognormal` | mu (0), sigma (1) |
/// | `cauchy` | median (0), scale (1) |
/// | `bernoulli` | p (0.5) |
/// | `constant`, `delta` | value |
/// | `zero` | |
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionFactory;

fn with_defaults<const N: usize>(args: &[f64], defaults: [f64; N]) -> Result<[f64; N], String> {
    if args.len() > N {
        return Err(format!("expected at most {N} argument(s), got {}", args.len()));
    }
    let mut out = defaults;
    out[..args.len()].copy_from_slice(args);
    Ok(out)
}

impl DistributionFactory {
    fn build(spec: &NoiseSpec) -> Result<Box<dyn NoiseDistribution>, String> {
        let (family, args) = spec.parts()?;
        let dist: Box<dyn NoiseDistribution> = match family.as_str() {
            "normal" | "gaussian" | "n" => {
                let [mean, std] = with_defaults(&args, [0.0, 1.0])?;
                Box::new(RandNoise(Normal::new(mean, std).map_err(|e| e.to_string())?))
            }
            "uniform" | "u" => {
                let [low, high] = with_defaults(&args, [0.0, 1.0])?;
                if !(low < high) || !low.is_finite() || !high.is_finite() {
                    return Err(format!("uniform bounds must satisfy low < high, got [{low}, {high})"));
                }
                Box::new(RandNoise(Uniform::new(low, high)))
            }
            "exponential" | "exp" => {
                let [rate] = with_defaults(&args, [1.0])?;
                Box::new(RandNoise(Exp::new(rate).map_err(|e| e.to_string())?))
            }
            "lognormal" => {
                let [mu, sigma] = with_defaults(&args, [0.0, 1.0])?;
                Box::new(RandNoise(LogNormal::new(mu, sigma).map_err(|e| e.to_string())?))
            }
            "cauchy" => {
                let [median, scale] = with_defaults(&args, [0.0, 1.0])?;
                Box::new(RandNoise(Cauchy::new(median, scale).map_err(|e| e.to_string())?))
            }
            "bernoulli" => {
                let [p] = with_defaults(&args, [0.5])?;
                Box::new(BernoulliNoise(Bernoulli::new(p).map_err(|e| e.to_string())?))
            }
            "constant" | "delta" => match args.as_slice() {
                [value] => Box::new(ConstantNoise(*value)),
                _ => return Err(format!("expected 1 argument, got {}", args.len())),
            },
            "zero" => {
                with_defaults(&args, [])?;
                Box::new(ConstantNoise(0.0))
            }
            other => return Err(format!("unknown distribution family '{other}'")),
        };
        Ok(dist)
    }
}

impl NoiseFactory for DistributionFactory {
    fn distribution(
        &self,
        node: &str,
        spec: &NoiseSpec,
    ) -> Result<Box<dyn NoiseDistribution>, ScmError> {
        Self::build(spec).map_err(|reason| ScmError::UnknownDistribution {
            node: node.to_string(),
            spec: spec.to_string(),
            reason,
        })
    }
}
