//! Duration samplers
//!
//! Samplers model sensor jitter and simulated compute durations. Every
//! sampler owns its own seeded random stream, so reseeding one sampler never
//! shifts the sequence produced by another.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Gamma, Normal};

use crate::error::{SimError, SimResult};
use crate::time::{round_to_time, Time};

/// Seed used by samplers that were never explicitly reseeded
pub const DEFAULT_SAMPLER_SEED: u64 = 0;

/// A seeded, resettable distribution over durations
pub trait DurationSampler: Send {
    /// Draw the next duration, rounded to the time step
    fn sample(&mut self) -> Time;

    /// Restart the random stream from `seed`
    fn reset(&mut self, seed: u64);
}

impl<S: DurationSampler + ?Sized> DurationSampler for Box<S> {
    fn sample(&mut self) -> Time {
        (**self).sample()
    }

    fn reset(&mut self, seed: u64) {
        (**self).reset(seed)
    }
}

/// A constant duration without any stochasticity
#[derive(Debug, Clone, PartialEq)]
pub struct FixedDuration {
    value: f64,
}

impl FixedDuration {
    pub fn new(value: impl Into<f64>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl DurationSampler for FixedDuration {
    fn sample(&mut self) -> Time {
        round_to_time(self.value)
    }

    fn reset(&mut self, _seed: u64) {}
}

/// Normally distributed durations, `gain * N(mu, std) + offset`.
///
/// Negative draws are rejected and redrawn, so the sampler never produces a
/// negative duration.
#[derive(Debug, Clone)]
pub struct GaussianTimeSampler {
    normal: Normal<f64>,
    gain: f64,
    offset: f64,
    rng: ChaCha8Rng,
}

impl GaussianTimeSampler {
    pub fn new(mu: f64, std: f64, gain: f64, offset: f64) -> SimResult<Self> {
        let normal = Normal::new(mu, std).map_err(|e| {
            SimError::invalid_input(format!("Gaussian sampler N({mu}, {std}): {e}"))
        })?;
        Ok(Self {
            normal,
            gain,
            offset,
            rng: ChaCha8Rng::seed_from_u64(DEFAULT_SAMPLER_SEED),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reset(seed);
        self
    }
}

impl DurationSampler for GaussianTimeSampler {
    fn sample(&mut self) -> Time {
        loop {
            let value = self.normal.sample(&mut self.rng) * self.gain + self.offset;
            if value >= 0.0 {
                return round_to_time(value);
            }
        }
    }

    fn reset(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}

/// Gamma distributed durations, `gain * Gamma(k, theta) + offset`
#[derive(Debug, Clone)]
pub struct GammaDistributionSampler {
    gamma: Gamma<f64>,
    gain: f64,
    offset: f64,
    rng: ChaCha8Rng,
}

impl GammaDistributionSampler {
    pub fn new(k: f64, theta: f64) -> SimResult<Self> {
        Self::with_gain_offset(k, theta, 1.0, 0.0)
    }

    pub fn with_gain_offset(k: f64, theta: f64, gain: f64, offset: f64) -> SimResult<Self> {
        let gamma = Gamma::new(k, theta).map_err(|e| {
            SimError::invalid_input(format!("Gamma sampler ({k}, {theta}): {e}"))
        })?;
        Ok(Self {
            gamma,
            gain,
            offset,
            rng: ChaCha8Rng::seed_from_u64(DEFAULT_SAMPLER_SEED),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reset(seed);
        self
    }
}

impl DurationSampler for GammaDistributionSampler {
    fn sample(&mut self) -> Time {
        round_to_time(self.gamma.sample(&mut self.rng) * self.gain + self.offset)
    }

    fn reset(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}

/// Replays a scripted list of durations, wrapping around at the end.
///
/// `reset` rewinds to the first entry; the seed is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDuration {
    values: Vec<Time>,
    cursor: usize,
}

impl SequenceDuration {
    pub fn new(values: Vec<Time>) -> SimResult<Self> {
        if values.is_empty() {
            return Err(SimError::invalid_input(
                "SequenceDuration needs at least one value",
            ));
        }
        Ok(Self { values, cursor: 0 })
    }
}

impl DurationSampler for SequenceDuration {
    fn sample(&mut self) -> Time {
        let value = self.values[self.cursor];
        self.cursor = (self.cursor + 1) % self.values.len();
        value
    }

    fn reset(&mut self, _seed: u64) {
        self.cursor = 0;
    }
}
