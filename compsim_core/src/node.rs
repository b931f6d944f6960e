//! The node contract
//!
//! Every vertex of a simulated graph implements [`Node`]. Nodes never hold
//! references to each other: they name their downstream nodes by [`NodeId`]
//! and hand outgoing messages to an [`Outbox`]. Whoever owns the node (the
//! system, or a composite node) delivers the outbox right after the call
//! returns.

use std::any::Any;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::message::{Message, NodeId};

/// Messages produced by a node operation, waiting for delivery
#[derive(Debug, Default)]
pub struct Outbox {
    queue: VecDeque<(NodeId, Message)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `message` for `destination`
    pub fn send(&mut self, destination: NodeId, message: Message) {
        self.queue.push_back((destination, message));
    }

    /// Take the oldest queued message
    pub fn pop(&mut self) -> Option<(NodeId, Message)> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Remove and return all queued messages in send order
    pub fn drain(&mut self) -> impl Iterator<Item = (NodeId, Message)> + '_ {
        self.queue.drain(..)
    }
}

/// Cosmetic attributes for external graph drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawOptions {
    pub color: String,
    pub shape: String,
    pub hover_text: String,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            color: "black".to_string(),
            shape: "circle".to_string(),
            hover_text: String::new(),
        }
    }
}

/// Double-dispatch hook for external tooling
pub trait NodeVisitor {
    fn visit_node(&mut self, node: &dyn Node);
}

/// A unit of the simulated dataflow graph
pub trait Node: Send {
    /// Unique id within the owning system
    fn id(&self) -> &NodeId;

    /// Downstream nodes this node forwards to, in a stable order
    fn outputs(&self) -> Vec<NodeId>;

    /// Accept a message. The node owns `message` from here on.
    fn receive(&mut self, message: Message, outbox: &mut Outbox) -> SimResult<()>;

    /// Fresh state vector computed from the current fields.
    ///
    /// The length must not change while the graph is unchanged.
    fn generate_state(&self) -> Vec<f32>;

    /// Time-driven step, reading the shared clock
    fn update(&mut self, outbox: &mut Outbox) -> SimResult<()>;

    /// Action-driven state transition
    fn trigger(&mut self, outbox: &mut Outbox) -> SimResult<()>;

    /// Return to the construction-time state
    fn reset(&mut self);

    /// Call back into `visitor` with this node (and any owned children)
    fn visit(&self, visitor: &mut dyn NodeVisitor);

    fn draw_options(&self) -> DrawOptions {
        DrawOptions::default()
    }

    /// Whether the node is in the middle of a simulated task
    fn is_busy(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
