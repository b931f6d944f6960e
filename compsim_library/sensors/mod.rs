//! Sensor strategies for source nodes
//!
//! A [`SourceNode`](crate::nodes::SourceNode) owns one sensor and asks it,
//! once per update, whether a new measurement is due.
//!
//! # Available Sensors
//!
//! - `periodic_epoch` - Periodic schedule anchored at an epoch, with a
//!   sampled disturbance on every send time

pub mod periodic_epoch;

pub use periodic_epoch::PeriodicEpochSensor;

use compsim_core::{Message, Time};

/// Timer-like measurement source driven by the simulation clock
pub trait Sensor: Send {
    /// Advance the sensor to `time`
    fn update(&mut self, time: Time);

    /// Whether the last `update` produced a measurement
    fn has_measurement(&self) -> bool;

    /// The measurement produced by the last `update`, if any
    fn get_measurement(&self) -> Option<Message>;

    /// Sensor-specific state, empty by default
    fn generate_state(&self) -> Vec<f32> {
        Vec::new()
    }

    fn reset(&mut self);
}

impl<S: Sensor + ?Sized> Sensor for Box<S> {
    fn update(&mut self, time: Time) {
        (**self).update(time)
    }

    fn has_measurement(&self) -> bool {
        (**self).has_measurement()
    }

    fn get_measurement(&self) -> Option<Message> {
        (**self).get_measurement()
    }

    fn generate_state(&self) -> Vec<f32> {
        (**self).generate_state()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
