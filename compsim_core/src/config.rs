//! Simulation configuration
//!
//! Describes the parts of a simulation that are data rather than topology:
//! the clock epoch, the master seed, state normalizers, and named duration
//! samplers. Loadable from TOML or YAML.
//!
//! ```toml
//! initial_time = 0
//! seed = 7
//!
//! [normalizers]
//! age = 100.0
//!
//! [samplers.compute]
//! kind = "gamma"
//! k = 2.0
//! theta = 3.0
//! offset = 10.0
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::normalize::NormalizerSet;
use crate::sampler::{
    DurationSampler, FixedDuration, GammaDistributionSampler, GaussianTimeSampler,
    SequenceDuration,
};
use crate::time::{Clock, Time};

fn default_gain() -> f64 {
    1.0
}

fn default_scale() -> f64 {
    1.0
}

fn default_seed() -> u64 {
    42
}

/// Serializable description of a [`DurationSampler`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DurationSpec {
    Fixed {
        value: f64,
    },
    Gaussian {
        mu: f64,
        std: f64,
        #[serde(default = "default_gain")]
        gain: f64,
        #[serde(default)]
        offset: f64,
    },
    Gamma {
        k: f64,
        theta: f64,
        #[serde(default = "default_gain")]
        gain: f64,
        #[serde(default)]
        offset: f64,
    },
    Sequence {
        values: Vec<Time>,
    },
}

impl DurationSpec {
    /// Build the sampler with its random stream seeded from `seed`
    pub fn build(&self, seed: u64) -> SimResult<Box<dyn DurationSampler>> {
        let mut sampler: Box<dyn DurationSampler> = match self {
            DurationSpec::Fixed { value } => Box::new(FixedDuration::new(*value)),
            DurationSpec::Gaussian {
                mu,
                std,
                gain,
                offset,
            } => Box::new(GaussianTimeSampler::new(*mu, *std, *gain, *offset)?),
            DurationSpec::Gamma {
                k,
                theta,
                gain,
                offset,
            } => Box::new(GammaDistributionSampler::with_gain_offset(
                *k, *theta, *gain, *offset,
            )?),
            DurationSpec::Sequence { values } => Box::new(SequenceDuration::new(values.clone())?),
        };
        sampler.reset(seed);
        Ok(sampler)
    }
}

/// Constant normalizers per state quantity kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizerSpec {
    #[serde(default = "default_scale")]
    pub age: f64,
    #[serde(default = "default_scale")]
    pub occupancy: f64,
    #[serde(default = "default_scale")]
    pub count: f64,
}

impl Default for NormalizerSpec {
    fn default() -> Self {
        Self {
            age: 1.0,
            occupancy: 1.0,
            count: 1.0,
        }
    }
}

impl NormalizerSpec {
    pub fn build(&self) -> SimResult<NormalizerSet> {
        for (name, value) in [
            ("age", self.age),
            ("occupancy", self.occupancy),
            ("count", self.count),
        ] {
            if value == 0.0 || !value.is_finite() {
                return Err(SimError::config(format!(
                    "Normalizer '{}' must be a finite non-zero constant, got {}",
                    name, value
                )));
            }
        }
        Ok(NormalizerSet::constant(self.age, self.occupancy, self.count))
    }
}

/// Top-level simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub initial_time: Time,
    /// Master seed; every named sampler derives its own stream from it
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub normalizers: NormalizerSpec,
    #[serde(default)]
    pub samplers: BTreeMap<String, DurationSpec>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_time: 0,
            seed: default_seed(),
            normalizers: NormalizerSpec::default(),
            samplers: BTreeMap::new(),
        }
    }
}

impl SimulationConfig {
    /// Load config from a file (format chosen by extension)
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SimError::config(format!(
                "Failed to read simulation config {}: {}",
                path.display(),
                e
            ))
        })?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => Self::from_yaml_str(&contents).or_else(|_| Self::from_toml_str(&contents)),
        }
    }

    pub fn from_toml_str(contents: &str) -> SimResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_yaml_str(contents: &str) -> SimResult<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| SimError::config(format!("Failed to parse simulation YAML: {}", e)))
    }

    /// Save config to a file (TOML for `.toml`, YAML otherwise)
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SimResult<()> {
        let path = path.as_ref();
        let contents = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::to_string_pretty(self)?,
            _ => serde_yaml::to_string(self)?,
        };
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn clock(&self) -> Clock {
        Clock::new(self.initial_time)
    }

    pub fn normalizer_set(&self) -> SimResult<NormalizerSet> {
        self.normalizers.build()
    }

    /// Seed for the random stream called `stream`, derived from the master
    /// seed. Distinct names get statistically independent seeds.
    pub fn stream_seed(&self, stream: &str) -> u64 {
        splitmix64(self.seed ^ fnv1a(stream.as_bytes()))
    }

    /// Build the named sampler with its own derived seed
    pub fn sampler(&self, name: &str) -> SimResult<Box<dyn DurationSampler>> {
        let spec = self
            .samplers
            .get(name)
            .ok_or_else(|| SimError::config(format!("Sampler '{}' not found in config", name)))?;
        spec.build(self.stream_seed(name))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_CONFIG: &str = r#"
initial_time = 100
seed = 7

[normalizers]
age = 50.0

[samplers.jitter]
kind = "gaussian"
mu = 0.0
std = 2.0

[samplers.compute]
kind = "gamma"
k = 2.0
theta = 3.0
offset = 10.0

[samplers.fixed]
kind = "fixed"
value = 5
"#;

    #[test]
    fn test_parse_toml() {
        let config = SimulationConfig::from_toml_str(TOML_CONFIG).unwrap();
        assert_eq!(config.initial_time, 100);
        assert_eq!(config.seed, 7);
        assert_eq!(config.normalizers.age, 50.0);
        assert_eq!(config.normalizers.count, 1.0);
        assert_eq!(
            config.samplers["jitter"],
            DurationSpec::Gaussian {
                mu: 0.0,
                std: 2.0,
                gain: 1.0,
                offset: 0.0
            }
        );
        assert_eq!(config.clock().get_time(), 100);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
seed: 3
samplers:
  period:
    kind: sequence
    values: [1, 2, 3]
"#;
        let config = SimulationConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.initial_time, 0);
        let mut sampler = config.sampler("period").unwrap();
        assert_eq!(
            (sampler.sample(), sampler.sample(), sampler.sample()),
            (1, 2, 3)
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let bad = "[samplers.x]\nkind = \"poisson\"\nlambda = 1.0\n";
        assert!(matches!(
            SimulationConfig::from_toml_str(bad),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn test_named_samplers_reproducible() {
        let config = SimulationConfig::from_toml_str(TOML_CONFIG).unwrap();
        let draw = |name: &str| {
            let mut sampler = config.sampler(name).unwrap();
            (0..20).map(|_| sampler.sample()).collect::<Vec<_>>()
        };
        assert_eq!(draw("compute"), draw("compute"));
        assert!(draw("compute").iter().all(|&t| t >= 10));
        assert_eq!(draw("fixed"), vec![5; 20]);
        assert!(config.sampler("missing").is_err());
    }

    #[test]
    fn test_stream_seeds_differ() {
        let config = SimulationConfig::default();
        assert_ne!(config.stream_seed("a"), config.stream_seed("b"));
        assert_eq!(config.stream_seed("a"), config.stream_seed("a"));

        let other = SimulationConfig {
            seed: 43,
            ..SimulationConfig::default()
        };
        assert_ne!(config.stream_seed("a"), other.stream_seed("a"));
    }

    #[test]
    fn test_zero_normalizer_rejected() {
        let spec = NormalizerSpec {
            age: 0.0,
            ..NormalizerSpec::default()
        };
        assert!(spec.build().is_err());
    }

    #[test]
    fn test_file_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = SimulationConfig::from_toml_str(TOML_CONFIG)?;

        for name in ["sim.toml", "sim.yaml"] {
            let path = dir.path().join(name);
            config.save(&path)?;
            assert_eq!(SimulationConfig::from_file(&path)?, config);
        }
        Ok(())
    }
}
