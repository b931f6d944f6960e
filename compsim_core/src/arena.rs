//! Node storage and message delivery
//!
//! The arena owns every node of a system, keyed by [`NodeId`]. Edges are not
//! stored here: they are read from each node's [`Node::outputs`] when the
//! system computes its update order.

use std::collections::BTreeMap;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::message::{Message, NodeId};
use crate::node::{Node, Outbox};

/// Operation that can be invoked on a node by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeOp {
    Trigger,
    Update,
    Reset,
}

/// A `(node, operation)` pair resolved through the arena at call time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeCommand {
    pub node: NodeId,
    pub op: NodeOp,
}

impl NodeCommand {
    pub fn trigger(node: impl Into<NodeId>) -> Self {
        Self {
            node: node.into(),
            op: NodeOp::Trigger,
        }
    }

    pub fn update(node: impl Into<NodeId>) -> Self {
        Self {
            node: node.into(),
            op: NodeOp::Update,
        }
    }

    pub fn reset(node: impl Into<NodeId>) -> Self {
        Self {
            node: node.into(),
            op: NodeOp::Reset,
        }
    }
}

/// Owner of all nodes in a system
#[derive(Default)]
pub struct NodeArena {
    nodes: BTreeMap<NodeId, Box<dyn Node>>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node; ids must be unique
    pub fn insert(&mut self, node: Box<dyn Node>) -> SimResult<()> {
        let id = node.id().clone();
        if self.nodes.contains_key(&id) {
            return Err(SimError::DuplicateNode(id));
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &dyn Node)> {
        self.nodes.iter().map(|(id, node)| (id, node.as_ref()))
    }

    pub fn get(&self, id: &NodeId) -> Option<&dyn Node> {
        self.nodes.get(id).map(|node| node.as_ref())
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut (dyn Node + 'static)> {
        self.nodes.get_mut(id).map(|node| node.as_mut())
    }

    fn require_mut(&mut self, id: &NodeId) -> SimResult<&mut (dyn Node + 'static)> {
        self.get_mut(id)
            .ok_or_else(|| SimError::NodeNotFound(id.clone()))
    }

    /// Typed access to a node
    pub fn node<T: Node + 'static>(&self, id: &NodeId) -> SimResult<&T> {
        let node = self
            .get(id)
            .ok_or_else(|| SimError::NodeNotFound(id.clone()))?;
        node.as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| SimError::NodeTypeMismatch {
                node: id.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Typed mutable access to a node
    pub fn node_mut<T: Node + 'static>(&mut self, id: &NodeId) -> SimResult<&mut T> {
        let node = self.require_mut(id)?;
        node.as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| SimError::NodeTypeMismatch {
                node: id.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Run `command` and deliver everything it sent
    pub fn execute(&mut self, command: &NodeCommand) -> SimResult<()> {
        let mut outbox = Outbox::new();
        let node = self.require_mut(&command.node)?;
        match command.op {
            NodeOp::Trigger => node.trigger(&mut outbox)?,
            NodeOp::Update => node.update(&mut outbox)?,
            NodeOp::Reset => node.reset(),
        }
        self.deliver(outbox)
    }

    /// Deliver a single message from outside the graph
    pub fn send(&mut self, destination: NodeId, message: Message) -> SimResult<()> {
        let mut outbox = Outbox::new();
        outbox.send(destination, message);
        self.deliver(outbox)
    }

    /// Deliver queued messages in send order.
    ///
    /// Whatever a receiver sends in response is delivered before the next
    /// queued message, matching a synchronous call chain.
    pub fn deliver(&mut self, mut outbox: Outbox) -> SimResult<()> {
        while let Some((destination, message)) = outbox.pop() {
            let node = self.get_mut(&destination).ok_or_else(|| {
                SimError::communication(format!(
                    "Message addressed to unknown node '{}'",
                    destination
                ))
            })?;
            trace!("Delivering message to '{}'", destination);
            let mut responses = Outbox::new();
            node.receive(message, &mut responses)?;
            if !responses.is_empty() {
                self.deliver(responses)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::any::Any;

    use super::*;
    use crate::message::Header;
    use crate::node::NodeVisitor;

    /// Forwards everything it receives and records what it saw
    pub(crate) struct RelayNode {
        pub id: NodeId,
        pub outputs: Vec<NodeId>,
        pub seen: Vec<Message>,
        pub log: Vec<String>,
        pub busy: bool,
    }

    impl RelayNode {
        pub fn new(id: &str, outputs: &[&str]) -> Self {
            Self {
                id: id.into(),
                outputs: outputs.iter().map(|o| NodeId::from(*o)).collect(),
                seen: Vec::new(),
                log: Vec::new(),
                busy: false,
            }
        }
    }

    impl Node for RelayNode {
        fn id(&self) -> &NodeId {
            &self.id
        }

        fn outputs(&self) -> Vec<NodeId> {
            self.outputs.clone()
        }

        fn receive(&mut self, message: Message, outbox: &mut Outbox) -> SimResult<()> {
            for output in &self.outputs {
                outbox.send(output.clone(), message.clone());
            }
            self.seen.push(message);
            Ok(())
        }

        fn generate_state(&self) -> Vec<f32> {
            vec![self.seen.len() as f32]
        }

        fn update(&mut self, _outbox: &mut Outbox) -> SimResult<()> {
            self.log.push("update".to_string());
            Ok(())
        }

        fn trigger(&mut self, outbox: &mut Outbox) -> SimResult<()> {
            self.log.push("trigger".to_string());
            for output in &self.outputs {
                outbox.send(output.clone(), Message::new(Header::measured_at(0)));
            }
            Ok(())
        }

        fn reset(&mut self) {
            self.seen.clear();
            self.log.push("reset".to_string());
        }

        fn visit(&self, visitor: &mut dyn NodeVisitor) {
            visitor.visit_node(self);
        }

        fn is_busy(&self) -> bool {
            self.busy
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut arena = NodeArena::new();
        arena.insert(Box::new(RelayNode::new("a", &[]))).unwrap();
        let err = arena.insert(Box::new(RelayNode::new("a", &[]))).unwrap_err();
        assert!(matches!(err, SimError::DuplicateNode(_)));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_execute_delivers_chain() {
        let mut arena = NodeArena::new();
        arena.insert(Box::new(RelayNode::new("a", &["b"]))).unwrap();
        arena.insert(Box::new(RelayNode::new("b", &["c"]))).unwrap();
        arena.insert(Box::new(RelayNode::new("c", &[]))).unwrap();

        arena.execute(&NodeCommand::trigger("a")).unwrap();

        let c = arena.node::<RelayNode>(&"c".into()).unwrap();
        assert_eq!(c.seen.len(), 1);
        let a = arena.node::<RelayNode>(&"a".into()).unwrap();
        assert_eq!(a.log, vec!["trigger".to_string()]);
    }

    #[test]
    fn test_deliver_unknown_destination() {
        let mut arena = NodeArena::new();
        arena.insert(Box::new(RelayNode::new("a", &["ghost"]))).unwrap();
        let err = arena.execute(&NodeCommand::trigger("a")).unwrap_err();
        assert!(err.is_communication());
    }

    #[test]
    fn test_typed_access_mismatch() {
        struct Other;
        impl Node for Other {
            fn id(&self) -> &NodeId {
                unreachable!()
            }
            fn outputs(&self) -> Vec<NodeId> {
                Vec::new()
            }
            fn receive(&mut self, _: Message, _: &mut Outbox) -> SimResult<()> {
                Ok(())
            }
            fn generate_state(&self) -> Vec<f32> {
                Vec::new()
            }
            fn update(&mut self, _: &mut Outbox) -> SimResult<()> {
                Ok(())
            }
            fn trigger(&mut self, _: &mut Outbox) -> SimResult<()> {
                Ok(())
            }
            fn reset(&mut self) {}
            fn visit(&self, visitor: &mut dyn NodeVisitor) {
                visitor.visit_node(self);
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        let mut arena = NodeArena::new();
        arena.insert(Box::new(RelayNode::new("a", &[]))).unwrap();
        let err = arena.node::<Other>(&"a".into()).err().unwrap();
        assert!(matches!(err, SimError::NodeTypeMismatch { .. }));

        let err = arena.node::<RelayNode>(&"zz".into()).err().unwrap();
        assert!(matches!(err, SimError::NodeNotFound(_)));
    }
}
