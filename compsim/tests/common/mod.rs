//! Shared helpers for the end-to-end tests

#![allow(dead_code)]

use approx::abs_diff_eq;

/// Compare a state vector element-wise with a small absolute tolerance
pub fn assert_state(actual: &[f32], expected: &[f64]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "state length mismatch: {actual:?} vs {expected:?}"
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            abs_diff_eq!(f64::from(*a), *e, epsilon = 1.0e-5),
            "state[{i}] = {a}, expected {e} (full state {actual:?})"
        );
    }
}
