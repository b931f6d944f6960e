//! Sink Node - counts messages received since the last step
//!
//! Typically the overflow target of a buffer or the fail output of a compute
//! node, so its single state value reads as "losses this step".

use std::any::Any;

use compsim_core::{
    DrawOptions, Message, Node, NodeId, NodeVisitor, NormalizerSet, Outbox, SimResult, Time,
    TimeProvider,
};

pub struct SinkNode {
    id: NodeId,
    time: TimeProvider,
    normalizers: NormalizerSet,
    received_messages: Vec<Message>,
    received_times: Vec<Time>,
}

impl SinkNode {
    pub fn new(id: impl Into<NodeId>, time: TimeProvider) -> Self {
        Self {
            id: id.into(),
            time,
            normalizers: NormalizerSet::default(),
            received_messages: Vec::new(),
            received_times: Vec::new(),
        }
    }

    pub fn with_normalizers(mut self, normalizers: NormalizerSet) -> Self {
        self.normalizers = normalizers;
        self
    }

    pub fn received_messages(&self) -> &[Message] {
        &self.received_messages
    }

    /// Arrival times, parallel to [`Self::received_messages`]
    pub fn received_times(&self) -> &[Time] {
        &self.received_times
    }

    pub fn count(&self) -> usize {
        self.received_messages.len()
    }

    fn clear(&mut self) {
        self.received_messages.clear();
        self.received_times.clear();
    }
}

impl Node for SinkNode {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn outputs(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn receive(&mut self, message: Message, _outbox: &mut Outbox) -> SimResult<()> {
        self.received_messages.push(message);
        self.received_times.push(self.time.time());
        Ok(())
    }

    fn generate_state(&self) -> Vec<f32> {
        vec![self.normalizers.count(self.count() as u64)]
    }

    fn update(&mut self, _outbox: &mut Outbox) -> SimResult<()> {
        self.clear();
        Ok(())
    }

    fn trigger(&mut self, _outbox: &mut Outbox) -> SimResult<()> {
        Ok(())
    }

    fn reset(&mut self) {
        self.clear();
    }

    fn visit(&self, visitor: &mut dyn NodeVisitor) {
        visitor.visit_node(self);
    }

    fn draw_options(&self) -> DrawOptions {
        DrawOptions {
            color: "gray".to_string(),
            shape: "x".to_string(),
            hover_text: format!("count = {}", self.count()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
