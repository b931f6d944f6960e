//! State normalization
//!
//! Nodes emit their state as flat `f32` vectors. Each emitted quantity is one
//! of three kinds (age, occupancy, measurement count) and is scaled by the
//! normalizer configured for its kind.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::message::Header;
use crate::time::{as_age, Time};

/// Width of [`header_state`]
pub const HEADER_STATE_LEN: usize = 4;

/// Scales one raw state variable
pub trait StateNormalizer: Send + Sync + fmt::Debug {
    fn normalize(&self, value: f64) -> f64;
}

/// Divides by a fixed constant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantNormalizer {
    constant: f64,
}

impl ConstantNormalizer {
    pub fn new(constant: f64) -> Self {
        Self { constant }
    }
}

impl Default for ConstantNormalizer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl StateNormalizer for ConstantNormalizer {
    fn normalize(&self, value: f64) -> f64 {
        value / self.constant
    }
}

/// The normalizers a node applies to its state, one per quantity kind
#[derive(Debug, Clone)]
pub struct NormalizerSet {
    pub age: Arc<dyn StateNormalizer>,
    pub occupancy: Arc<dyn StateNormalizer>,
    pub count: Arc<dyn StateNormalizer>,
}

impl NormalizerSet {
    pub fn new(
        age: impl StateNormalizer + 'static,
        occupancy: impl StateNormalizer + 'static,
        count: impl StateNormalizer + 'static,
    ) -> Self {
        Self {
            age: Arc::new(age),
            occupancy: Arc::new(occupancy),
            count: Arc::new(count),
        }
    }

    /// Constant normalizers for each kind
    pub fn constant(age: f64, occupancy: f64, count: f64) -> Self {
        Self::new(
            ConstantNormalizer::new(age),
            ConstantNormalizer::new(occupancy),
            ConstantNormalizer::new(count),
        )
    }

    pub fn age(&self, value: Time) -> f32 {
        self.age.normalize(value as f64) as f32
    }

    pub fn occupancy(&self, value: f64) -> f32 {
        self.occupancy.normalize(value) as f32
    }

    pub fn count(&self, value: u64) -> f32 {
        self.count.normalize(value as f64) as f32
    }
}

impl Default for NormalizerSet {
    fn default() -> Self {
        Self::constant(1.0, 1.0, 1.0)
    }
}

/// `[age_oldest, age_youngest, age_average, count]` of a header at `now`
pub fn header_state(header: &Header, now: Time, norms: &NormalizerSet) -> [f32; HEADER_STATE_LEN] {
    [
        norms.age(as_age(header.t_measure_oldest, now)),
        norms.age(as_age(header.t_measure_youngest, now)),
        norms.age(as_age(header.t_measure_average, now)),
        norms.count(header.num_measurements),
    ]
}

/// State of an absent message
pub fn empty_header_state(norms: &NormalizerSet) -> [f32; HEADER_STATE_LEN] {
    [norms.age(0), norms.age(0), norms.age(0), norms.count(0)]
}

/// `[occupancy, age_oldest, age_youngest, age_average, count]` for an
/// optional message slot
pub fn slot_state(header: Option<&Header>, now: Time, norms: &NormalizerSet) -> [f32; 5] {
    let (occupancy, ages) = match header {
        Some(header) => (norms.occupancy(1.0), header_state(header, now, norms)),
        None => (norms.occupancy(0.0), empty_header_state(norms)),
    };
    [occupancy, ages[0], ages[1], ages[2], ages[3]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_normalizer() {
        assert_relative_eq!(ConstantNormalizer::new(4.0).normalize(2.0), 0.5);
        assert_relative_eq!(ConstantNormalizer::default().normalize(3.0), 3.0);
    }

    #[test]
    fn test_header_state() {
        let header = Header::new(1, 2, 3).with_measurements(7);
        let state = header_state(&header, 6, &NormalizerSet::default());
        assert_eq!(state, [5.0, 4.0, 3.0, 7.0]);

        let norms = NormalizerSet::constant(10.0, 2.0, 0.1);
        let state = header_state(&header, 6, &norms);
        assert_relative_eq!(state[0], 0.5);
        assert_relative_eq!(state[1], 0.4);
        assert_relative_eq!(state[2], 0.3);
        assert_relative_eq!(state[3], 70.0, max_relative = 1e-6);
    }

    #[test]
    fn test_slot_state_empty() {
        let norms = NormalizerSet::constant(10.0, 2.0, 0.1);
        assert_eq!(slot_state(None, 100, &norms), [0.0; 5]);
    }

    #[test]
    #[should_panic]
    fn test_header_state_future_stamp() {
        header_state(&Header::measured_at(10), 5, &NormalizerSet::default());
    }
}
