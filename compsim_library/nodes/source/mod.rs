//! Source Node - timer-driven message emitter
//!
//! Wraps a [`Sensor`] and forwards every measurement it produces to all
//! declared outputs. Sources have no inputs.

use std::any::Any;

use compsim_core::{
    DrawOptions, Message, Node, NodeId, NodeVisitor, Outbox, SimError, SimResult, TimeProvider,
};

use crate::sensors::Sensor;

/// Emits sensor measurements to its outputs
///
/// # Example
///
/// ```rust,ignore
/// use compsim_library::{PeriodicEpochSensor, SourceNode};
/// use compsim_core::{Clock, FixedDuration};
///
/// let clock = Clock::new(0);
/// let sensor = PeriodicEpochSensor::new(0, 100, FixedDuration::new(0));
/// let mut source = SourceNode::new("camera", clock.as_readonly(), sensor);
/// source.add_output("camera_buffer")?;
/// ```
pub struct SourceNode<S = Box<dyn Sensor>>
where
    S: Sensor,
{
    id: NodeId,
    time: TimeProvider,
    sensor: S,
    outputs: Vec<NodeId>,
}

impl<S: Sensor> SourceNode<S> {
    pub fn new(id: impl Into<NodeId>, time: TimeProvider, sensor: S) -> Self {
        Self {
            id: id.into(),
            time,
            sensor,
            outputs: Vec::new(),
        }
    }

    /// Forward measurements to `output` as well. Each output may be added once.
    pub fn add_output(&mut self, output: impl Into<NodeId>) -> SimResult<()> {
        let output = output.into();
        if self.outputs.contains(&output) {
            return Err(SimError::graph(format!(
                "Source '{}' already outputs to '{}'",
                self.id, output
            )));
        }
        self.outputs.push(output);
        Ok(())
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

impl<S: Sensor + 'static> Node for SourceNode<S> {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn outputs(&self) -> Vec<NodeId> {
        self.outputs.clone()
    }

    fn receive(&mut self, _message: Message, _outbox: &mut Outbox) -> SimResult<()> {
        Err(SimError::communication(format!(
            "Source node '{}' cannot receive a message",
            self.id
        )))
    }

    fn generate_state(&self) -> Vec<f32> {
        self.sensor.generate_state()
    }

    fn update(&mut self, outbox: &mut Outbox) -> SimResult<()> {
        self.sensor.update(self.time.time());
        if let Some(measurement) = self.sensor.get_measurement() {
            for output in &self.outputs {
                outbox.send(output.clone(), measurement.addressed(&self.id, output));
            }
        }
        Ok(())
    }

    fn trigger(&mut self, _outbox: &mut Outbox) -> SimResult<()> {
        Ok(())
    }

    fn reset(&mut self) {
        self.sensor.reset();
    }

    fn visit(&self, visitor: &mut dyn NodeVisitor) {
        visitor.visit_node(self);
    }

    fn draw_options(&self) -> DrawOptions {
        DrawOptions {
            color: "darkblue".to_string(),
            shape: "triangle-right".to_string(),
            hover_text: format!("has_measurement = {}", self.sensor.has_measurement()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compsim_core::{Clock, Header, Time};

    /// Scripted sensor: fires on the listed update times
    struct ScriptedSensor {
        fire_at: Vec<Time>,
        last: Option<Time>,
        updates: usize,
        resets: usize,
    }

    impl ScriptedSensor {
        fn new(fire_at: Vec<Time>) -> Self {
            Self {
                fire_at,
                last: None,
                updates: 0,
                resets: 0,
            }
        }
    }

    impl Sensor for ScriptedSensor {
        fn update(&mut self, time: Time) {
            self.updates += 1;
            self.last = Some(time);
        }

        fn has_measurement(&self) -> bool {
            self.last.is_some_and(|t| self.fire_at.contains(&t))
        }

        fn get_measurement(&self) -> Option<Message> {
            match self.last {
                Some(t) if self.has_measurement() => Some(Message::new(Header::measured_at(t))),
                _ => None,
            }
        }

        fn reset(&mut self) {
            self.resets += 1;
            self.last = None;
        }
    }

    fn setup(fire_at: Vec<Time>) -> (SourceNode<ScriptedSensor>, Clock) {
        let clock = Clock::new(0);
        let node = SourceNode::new("Geralt", clock.as_readonly(), ScriptedSensor::new(fire_at));
        (node, clock)
    }

    #[test]
    fn test_id() {
        let (node, _) = setup(vec![]);
        assert_eq!(node.id().as_str(), "Geralt");
    }

    #[test]
    fn test_receive_raises() {
        let (mut node, _) = setup(vec![]);
        let err = node
            .receive(Message::new(Header::default()), &mut Outbox::new())
            .unwrap_err();
        assert!(err.is_communication());
    }

    #[test]
    fn test_outputs() {
        let (mut node, _) = setup(vec![]);
        assert!(node.outputs().is_empty());

        node.add_output("n1").unwrap();
        node.add_output("n2").unwrap();
        let outputs: Vec<String> = node.outputs().iter().map(|o| o.to_string()).collect();
        assert_eq!(outputs, vec!["n1", "n2"]);

        assert!(node.add_output("n1").unwrap_err().is_graph_definition());
    }

    #[test]
    fn test_update_without_measurement() {
        let (mut node, clock) = setup(vec![5]);
        node.add_output("out").unwrap();

        clock.advance(1);
        let mut outbox = Outbox::new();
        node.update(&mut outbox).unwrap();
        assert!(outbox.is_empty());
        assert_eq!(node.sensor().updates, 1);
    }

    #[test]
    fn test_update_forwards_copy_to_every_output() {
        let (mut node, clock) = setup(vec![1]);
        node.add_output("a").unwrap();
        node.add_output("b").unwrap();

        clock.advance(1);
        let mut outbox = Outbox::new();
        node.update(&mut outbox).unwrap();

        let sent: Vec<_> = outbox.drain().collect();
        assert_eq!(sent.len(), 2);
        for ((dest, msg), expected) in sent.iter().zip(["a", "b"]) {
            assert_eq!(dest.as_str(), expected);
            assert_eq!(msg.header.sender_id.as_ref().map(NodeId::as_str), Some("Geralt"));
            assert_eq!(msg.header.destination_id.as_ref(), Some(dest));
            assert_eq!(msg.header.t_measure_oldest, 1);
        }
    }

    #[test]
    fn test_reset_resets_sensor() {
        let (mut node, _) = setup(vec![]);
        node.reset();
        assert_eq!(node.sensor().resets, 1);
    }
}
