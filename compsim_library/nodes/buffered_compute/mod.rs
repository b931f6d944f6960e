//! Buffered Compute Node - per-sender input buffers in front of one compute node
//!
//! Incoming messages are demultiplexed by `header.sender_id` into a dedicated
//! buffer per sender. Buffers forward into the wrapped compute node, which
//! is owned here and never registered with the system on its own.

use std::any::Any;

use compsim_core::{
    DrawOptions, Message, Node, NodeId, NodeVisitor, Outbox, SimError, SimResult,
};
use log::trace;

/// Composite node: sender-keyed buffers feeding one compute node
pub struct BufferedComputeNode {
    id: NodeId,
    compute: Box<dyn Node>,
    buffers: Vec<(NodeId, Box<dyn Node>)>,
}

impl BufferedComputeNode {
    pub fn new(id: impl Into<NodeId>, compute: impl Node + 'static) -> Self {
        Self::from_boxed(id, Box::new(compute))
    }

    pub fn from_boxed(id: impl Into<NodeId>, compute: Box<dyn Node>) -> Self {
        Self {
            id: id.into(),
            compute,
            buffers: Vec::new(),
        }
    }

    /// Route messages from `sender` through `buffer`.
    ///
    /// The buffer must already list the compute node among its outputs.
    /// Registering a sender twice replaces its buffer in place.
    pub fn set_buffer_for_sender(
        &mut self,
        sender: impl Into<NodeId>,
        buffer: impl Node + 'static,
    ) -> SimResult<()> {
        let sender = sender.into();
        let compute_id = self.compute.id();
        if !buffer.outputs().contains(compute_id) {
            return Err(SimError::graph(format!(
                "Cannot add buffer '{}', because the compute node '{}' is not one of its outputs",
                buffer.id(),
                compute_id
            )));
        }

        let buffer: Box<dyn Node> = Box::new(buffer);
        match self.buffers.iter_mut().find(|(id, _)| *id == sender) {
            Some((_, slot)) => *slot = buffer,
            None => self.buffers.push((sender, buffer)),
        }
        Ok(())
    }

    pub fn compute_node(&self) -> &dyn Node {
        self.compute.as_ref()
    }

    pub fn compute_node_mut(&mut self) -> &mut dyn Node {
        self.compute.as_mut()
    }

    /// Typed access to the wrapped compute node
    pub fn compute_as<T: Node + 'static>(&self) -> Option<&T> {
        self.compute.as_any().downcast_ref::<T>()
    }

    /// Buffer registered for `sender`
    pub fn buffer_for(&self, sender: &NodeId) -> Option<&dyn Node> {
        self.buffers
            .iter()
            .find(|(id, _)| id == sender)
            .map(|(_, buffer)| buffer.as_ref())
    }

    /// Typed access to the buffer registered for `sender`
    pub fn buffer_as<T: Node + 'static>(&self, sender: &NodeId) -> Option<&T> {
        self.buffer_for(sender)?.as_any().downcast_ref::<T>()
    }

    /// Senders in registration order
    pub fn senders(&self) -> impl Iterator<Item = &NodeId> {
        self.buffers.iter().map(|(sender, _)| sender)
    }
}

/// Hand messages addressed to the compute node to it, everything else leaves
/// through `outer`.
fn route(compute: &mut dyn Node, mut local: Outbox, outer: &mut Outbox) -> SimResult<()> {
    while let Some((destination, message)) = local.pop() {
        if destination == *compute.id() {
            trace!("Routing message to inner compute node '{}'", destination);
            let mut responses = Outbox::new();
            compute.receive(message, &mut responses)?;
            route(compute, responses, outer)?;
        } else {
            outer.send(destination, message);
        }
    }
    Ok(())
}

impl Node for BufferedComputeNode {
    fn id(&self) -> &NodeId {
        &self.id
    }

    /// The compute node's outputs, then any buffer output other than the
    /// compute node (e.g. overflow sinks)
    fn outputs(&self) -> Vec<NodeId> {
        let compute_id = self.compute.id();
        let mut outputs = self.compute.outputs();
        for (_, buffer) in &self.buffers {
            for output in buffer.outputs() {
                if output != *compute_id && !outputs.contains(&output) {
                    outputs.push(output);
                }
            }
        }
        outputs
    }

    fn receive(&mut self, message: Message, outbox: &mut Outbox) -> SimResult<()> {
        let sender = message.header.sender_id.clone();
        let buffer = self
            .buffers
            .iter_mut()
            .find(|(id, _)| Some(id) == sender.as_ref())
            .map(|(_, buffer)| buffer)
            .ok_or_else(|| {
                SimError::communication(format!(
                    "BufferedComputeNode '{}' received a message from sender {:?}, but no input buffer is set for this sender",
                    self.id,
                    sender.as_ref().map(NodeId::as_str)
                ))
            })?;

        let mut local = Outbox::new();
        buffer.receive(message, &mut local)?;
        route(self.compute.as_mut(), local, outbox)
    }

    fn generate_state(&self) -> Vec<f32> {
        let mut state: Vec<f32> = self
            .buffers
            .iter()
            .flat_map(|(_, buffer)| buffer.generate_state())
            .collect();
        state.extend(self.compute.generate_state());
        state
    }

    fn update(&mut self, outbox: &mut Outbox) -> SimResult<()> {
        for (_, buffer) in self.buffers.iter_mut() {
            let mut local = Outbox::new();
            buffer.update(&mut local)?;
            route(self.compute.as_mut(), local, outbox)?;
        }
        let mut local = Outbox::new();
        self.compute.update(&mut local)?;
        route(self.compute.as_mut(), local, outbox)
    }

    fn trigger(&mut self, outbox: &mut Outbox) -> SimResult<()> {
        for (_, buffer) in self.buffers.iter_mut() {
            let mut local = Outbox::new();
            buffer.trigger(&mut local)?;
            route(self.compute.as_mut(), local, outbox)?;
        }
        let mut local = Outbox::new();
        self.compute.trigger(&mut local)?;
        route(self.compute.as_mut(), local, outbox)
    }

    fn reset(&mut self) {
        for (_, buffer) in self.buffers.iter_mut() {
            buffer.reset();
        }
        self.compute.reset();
    }

    fn visit(&self, visitor: &mut dyn NodeVisitor) {
        for (_, buffer) in &self.buffers {
            buffer.visit(visitor);
        }
        self.compute.visit(visitor);
    }

    fn draw_options(&self) -> DrawOptions {
        self.compute.draw_options()
    }

    fn is_busy(&self) -> bool {
        self.compute.is_busy()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
