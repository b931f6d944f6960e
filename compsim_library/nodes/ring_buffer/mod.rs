//! Ring Buffer Node - bounded FIFO with overflow routing
//!
//! Holds up to `capacity` messages. A message arriving at a full buffer
//! displaces the oldest one, which is forwarded to the overflow output if one
//! is configured and dropped otherwise.

use std::any::Any;
use std::collections::VecDeque;

use compsim_core::{
    slot_state, DrawOptions, Message, Node, NodeId, NodeVisitor, NormalizerSet, Outbox, SimError,
    SimResult, TimeProvider,
};
use log::trace;

/// Per-slot state width: occupancy plus the header state
pub const SLOT_STATE_LEN: usize = 5;

/// Bounded FIFO buffer node
pub struct RingBufferNode {
    id: NodeId,
    time: TimeProvider,
    buffer: VecDeque<Message>,
    capacity: usize,
    normalizers: NormalizerSet,
    output: Option<NodeId>,
    overflow_output: Option<NodeId>,
    trigger_on_receive: bool,
}

impl RingBufferNode {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(id: impl Into<NodeId>, time: TimeProvider, capacity: usize) -> Self {
        assert!(capacity > 0, "Ring buffer capacity must be positive");
        Self {
            id: id.into(),
            time,
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            normalizers: NormalizerSet::default(),
            output: None,
            overflow_output: None,
            trigger_on_receive: false,
        }
    }

    pub fn with_normalizers(mut self, normalizers: NormalizerSet) -> Self {
        self.normalizers = normalizers;
        self
    }

    /// Forward each received message immediately, as if triggered
    pub fn with_trigger_on_receive(mut self, enabled: bool) -> Self {
        self.trigger_on_receive = enabled;
        self
    }

    pub fn set_output(&mut self, output: impl Into<NodeId>) {
        self.output = Some(output.into());
    }

    pub fn set_overflow_output(&mut self, output: impl Into<NodeId>) {
        self.overflow_output = Some(output.into());
    }

    pub fn set_trigger_on_receive(&mut self, enabled: bool) {
        self.trigger_on_receive = enabled;
    }

    pub fn output(&self) -> Option<&NodeId> {
        self.output.as_ref()
    }

    pub fn num_entries(&self) -> usize {
        self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    /// Take the oldest message without forwarding it
    pub fn pop(&mut self) -> Option<Message> {
        self.buffer.pop_front()
    }

    /// Buffered messages, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.buffer.iter()
    }
}

impl Node for RingBufferNode {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn outputs(&self) -> Vec<NodeId> {
        self.output
            .iter()
            .chain(self.overflow_output.iter())
            .cloned()
            .collect()
    }

    fn receive(&mut self, message: Message, outbox: &mut Outbox) -> SimResult<()> {
        if self.is_full() {
            if let Some(oldest) = self.buffer.pop_front() {
                match &self.overflow_output {
                    Some(overflow) => {
                        trace!("Buffer '{}' overflow, routing to '{}'", self.id, overflow);
                        outbox.send(overflow.clone(), oldest);
                    }
                    None => trace!("Buffer '{}' overflow, dropping oldest", self.id),
                }
            }
        }
        self.buffer.push_back(message);
        if self.trigger_on_receive {
            self.trigger(outbox)?;
        }
        Ok(())
    }

    fn generate_state(&self) -> Vec<f32> {
        let now = self.time.time();
        let mut state = Vec::with_capacity(self.capacity * SLOT_STATE_LEN);
        for message in &self.buffer {
            state.extend(slot_state(Some(&message.header), now, &self.normalizers));
        }
        for _ in self.buffer.len()..self.capacity {
            state.extend(slot_state(None, now, &self.normalizers));
        }
        state
    }

    fn update(&mut self, _outbox: &mut Outbox) -> SimResult<()> {
        Ok(())
    }

    fn trigger(&mut self, outbox: &mut Outbox) -> SimResult<()> {
        let output = self.output.as_ref().ok_or_else(|| {
            SimError::graph(format!(
                "RingBufferNode '{}' was triggered, but has no output",
                self.id
            ))
        })?;
        if let Some(message) = self.buffer.pop_front() {
            outbox.send(output.clone(), message);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }

    fn visit(&self, visitor: &mut dyn NodeVisitor) {
        visitor.visit_node(self);
    }

    fn draw_options(&self) -> DrawOptions {
        let color = if self.is_full() {
            "darkred"
        } else if self.buffer.is_empty() {
            "darkgreen"
        } else {
            "darkorange"
        };
        let hover_text = self
            .generate_state()
            .chunks(SLOT_STATE_LEN)
            .map(|slot| {
                format!(
                    "is_occupied = {}<br>msg.age_oldest = {}<br>msg.age_youngest = {}<br>msg.age_average = {}<br>msg.num_measurements = {}<br>",
                    slot[0], slot[1], slot[2], slot[3], slot[4]
                )
            })
            .collect();
        DrawOptions {
            color: color.to_string(),
            shape: "square".to_string(),
            hover_text,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
