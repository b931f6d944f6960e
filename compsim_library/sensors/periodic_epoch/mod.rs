//! Periodic sensor anchored at an epoch
//!
//! Sends are scheduled on a nominal grid `epoch + n * period`. Each actual
//! send time is the nominal time plus one disturbance sample, so jitter never
//! accumulates into drift.

use compsim_core::{DurationSampler, Header, Message, Time};
use log::trace;

use super::Sensor;

/// Periodic measurement source with sampled send-time disturbance
pub struct PeriodicEpochSensor<D = Box<dyn DurationSampler>>
where
    D: DurationSampler,
{
    epoch: Time,
    period: Time,
    disturbance: D,

    // State
    nominal_send_time: Time,
    actual_send_time: Time,
    last_update_time: Option<Time>,
    has_measurement: bool,
}

impl<D: DurationSampler> PeriodicEpochSensor<D> {
    /// Create a sensor whose first send is due at `epoch`.
    ///
    /// # Panics
    ///
    /// Panics if `period` is not positive.
    pub fn new(epoch: Time, period: Time, disturbance: D) -> Self {
        assert!(period > 0, "Sensor period must be positive, got {period}");
        Self {
            epoch,
            period,
            disturbance,
            nominal_send_time: epoch,
            actual_send_time: epoch,
            last_update_time: None,
            has_measurement: false,
        }
    }

    pub fn period(&self) -> Time {
        self.period
    }

    /// Time at which the next measurement is due
    pub fn next_send_time(&self) -> Time {
        self.actual_send_time
    }

    pub fn disturbance_mut(&mut self) -> &mut D {
        &mut self.disturbance
    }
}

impl<D: DurationSampler> Sensor for PeriodicEpochSensor<D> {
    fn update(&mut self, time: Time) {
        self.last_update_time = Some(time);
        if time < self.actual_send_time {
            self.has_measurement = false;
            return;
        }

        self.nominal_send_time += self.period;
        self.actual_send_time = self.nominal_send_time + self.disturbance.sample();
        // Resample until the next send lies in the future. The nominal grid
        // only moves while it is itself behind `time`.
        while self.actual_send_time <= time {
            if self.nominal_send_time <= time {
                self.nominal_send_time += self.period;
            }
            self.actual_send_time = self.nominal_send_time + self.disturbance.sample();
        }
        trace!(
            "Sensor fired at {}, next send at {}",
            time,
            self.actual_send_time
        );
        self.has_measurement = true;
    }

    fn has_measurement(&self) -> bool {
        self.has_measurement
    }

    fn get_measurement(&self) -> Option<Message> {
        match (self.has_measurement, self.last_update_time) {
            (true, Some(t)) => Some(Message::with_payload(
                Header::measured_at(t),
                serde_json::Value::Object(serde_json::Map::new()),
            )),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.nominal_send_time = self.epoch;
        self.actual_send_time = self.epoch;
        self.last_update_time = None;
        self.has_measurement = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compsim_core::{FixedDuration, SequenceDuration};

    fn sensor(disturbance: Vec<Time>) -> PeriodicEpochSensor<SequenceDuration> {
        PeriodicEpochSensor::new(4, 10, SequenceDuration::new(disturbance).unwrap())
    }

    /// Counts how often the wrapped sampler is drawn from
    struct Counting<D> {
        inner: D,
        calls: usize,
    }

    impl<D: DurationSampler> DurationSampler for Counting<D> {
        fn sample(&mut self) -> Time {
            self.calls += 1;
            self.inner.sample()
        }

        fn reset(&mut self, seed: u64) {
            self.inner.reset(seed)
        }
    }

    #[test]
    fn test_state_is_empty() {
        assert!(sensor(vec![0]).generate_state().is_empty());
    }

    #[test]
    fn test_update_no_disturbance() {
        let mut sensor = sensor(vec![0]);

        sensor.update(0);
        assert!(!sensor.has_measurement());

        sensor.update(4);
        assert!(sensor.has_measurement());
        sensor.update(5);
        assert!(!sensor.has_measurement());
        sensor.update(13);
        assert!(!sensor.has_measurement());
        sensor.update(14);
        assert!(sensor.has_measurement());
    }

    #[test]
    fn test_update_negative_disturbance() {
        let mut sensor = PeriodicEpochSensor::new(
            4,
            10,
            Counting {
                inner: SequenceDuration::new(vec![-10, 0]).unwrap(),
                calls: 0,
            },
        );

        sensor.update(4);
        assert!(sensor.has_measurement());
        sensor.update(13);
        assert!(!sensor.has_measurement());

        assert_eq!(sensor.disturbance_mut().calls, 2);
    }

    #[test]
    fn test_negative_disturbance_resamples_without_skipping_period() {
        let mut sensor = sensor(vec![-10, 0]);

        sensor.update(4);
        assert!(sensor.has_measurement());
        assert_eq!(sensor.next_send_time(), 14);

        sensor.update(14);
        assert!(sensor.has_measurement());
        assert_eq!(sensor.next_send_time(), 24);
    }

    #[test]
    fn test_update_positive_disturbance() {
        let mut sensor = sensor(vec![1]);

        sensor.update(4);
        assert!(sensor.has_measurement());
        sensor.update(14);
        assert!(!sensor.has_measurement());
        sensor.update(15);
        assert!(sensor.has_measurement());
    }

    #[test]
    fn test_update_skip_once() {
        let mut sensor = sensor(vec![10]);

        sensor.update(4);
        assert!(sensor.has_measurement());
        for i in 0..20 {
            sensor.update(4 + i);
            assert!(!sensor.has_measurement());
        }
        sensor.update(24);
        assert!(sensor.has_measurement());
    }

    #[test]
    fn test_catch_up_fires_once_per_update() {
        let mut sensor = PeriodicEpochSensor::new(4, 10, FixedDuration::new(10));

        sensor.update(4);
        assert!(sensor.has_measurement());
        assert_eq!(sensor.next_send_time(), 24);

        // Several nominal periods elapsed between the two updates.
        sensor.update(64);
        assert!(sensor.has_measurement());
        assert!(sensor.next_send_time() > 64);

        sensor.update(65);
        assert!(!sensor.has_measurement());
    }

    #[test]
    fn test_reset() {
        let mut sensor = sensor(vec![1]);

        sensor.update(4);
        assert!(sensor.has_measurement());
        sensor.update(4);
        assert!(!sensor.has_measurement());
        sensor.reset();
        sensor.update(4);
        assert!(sensor.has_measurement());
    }

    #[test]
    fn test_get_measurement() {
        let mut sensor = sensor(vec![0]);

        assert!(sensor.get_measurement().is_none());
        sensor.update(4);
        let result = sensor.get_measurement().unwrap();

        // Later updates must not touch the message already handed out.
        sensor.update(10);
        assert_eq!(result.header.t_measure_average, 4);
        assert_eq!(result.header.t_measure_oldest, 4);
        assert_eq!(result.header.t_measure_youngest, 4);
        assert_eq!(result.header.num_measurements, 1);
    }

    #[test]
    #[should_panic]
    fn test_zero_period_rejected() {
        PeriodicEpochSensor::new(0, 0, FixedDuration::new(0));
    }
}
