use serde::{Deserialize, Serialize};

/// Sampler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Seed for the noise RNG. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl SamplerConfig {
    pub fn seeded(seed: u64) -> Self {
        SamplerConfig { seed: Some(seed) }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        assert_eq!(SamplerConfig::from_json("{}").unwrap(), SamplerConfig::default());
        assert_eq!(
            SamplerConfig::from_json(r#"{ "seed": 42 }"#).unwrap(),
            SamplerConfig::seeded(42)
        );
    }
}
