//! Output Node - terminal holder of the last received message

use std::any::Any;
use std::fmt;

use compsim_core::{
    slot_state, DrawOptions, Message, Node, NodeId, NodeVisitor, NormalizerSet, Outbox,
    SimResult, Time, TimeProvider,
};

/// Callback invoked with every message an [`OutputNode`] receives
pub type ReceiveCallback = Box<dyn FnMut(&Message) + Send>;

/// Keeps a copy of the most recent message it received
pub struct OutputNode {
    id: NodeId,
    time: TimeProvider,
    normalizers: NormalizerSet,
    receive_cb: Option<ReceiveCallback>,
    last_received: Option<Message>,
    last_received_time: Option<Time>,
}

impl OutputNode {
    pub fn new(id: impl Into<NodeId>, time: TimeProvider) -> Self {
        Self {
            id: id.into(),
            time,
            normalizers: NormalizerSet::default(),
            receive_cb: None,
            last_received: None,
            last_received_time: None,
        }
    }

    pub fn with_normalizers(mut self, normalizers: NormalizerSet) -> Self {
        self.normalizers = normalizers;
        self
    }

    pub fn with_receive_callback(mut self, callback: impl FnMut(&Message) + Send + 'static) -> Self {
        self.receive_cb = Some(Box::new(callback));
        self
    }

    pub fn set_receive_callback(&mut self, callback: impl FnMut(&Message) + Send + 'static) {
        self.receive_cb = Some(Box::new(callback));
    }

    pub fn last_received(&self) -> Option<&Message> {
        self.last_received.as_ref()
    }

    /// Simulation time at which [`Self::last_received`] arrived
    pub fn last_received_time(&self) -> Option<Time> {
        self.last_received_time
    }
}

impl fmt::Debug for OutputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputNode")
            .field("id", &self.id)
            .field("last_received", &self.last_received)
            .field("last_received_time", &self.last_received_time)
            .finish_non_exhaustive()
    }
}

impl Node for OutputNode {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn outputs(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn receive(&mut self, message: Message, _outbox: &mut Outbox) -> SimResult<()> {
        if let Some(callback) = self.receive_cb.as_mut() {
            callback(&message);
        }
        self.last_received = Some(message);
        self.last_received_time = Some(self.time.time());
        Ok(())
    }

    fn generate_state(&self) -> Vec<f32> {
        let header = self.last_received.as_ref().map(|m| &m.header);
        slot_state(header, self.time.time(), &self.normalizers).to_vec()
    }

    fn update(&mut self, _outbox: &mut Outbox) -> SimResult<()> {
        Ok(())
    }

    fn trigger(&mut self, _outbox: &mut Outbox) -> SimResult<()> {
        Ok(())
    }

    fn reset(&mut self) {
        self.last_received = None;
        self.last_received_time = None;
    }

    fn visit(&self, visitor: &mut dyn NodeVisitor) {
        visitor.visit_node(self);
    }

    fn draw_options(&self) -> DrawOptions {
        DrawOptions {
            color: "black".to_string(),
            shape: "triangle-left".to_string(),
            hover_text: format!("last_received_time = {:?}", self.last_received_time),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
