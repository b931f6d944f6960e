//! The simulation container
//!
//! [`System`] owns the nodes and the actions of one simulation. It validates
//! the node graph, caches a deterministic topological update order, walks the
//! nodes in that order on every step, and dispatches the external action
//! vector.
//!
//! ## Update order
//!
//! The graph must be acyclic and weakly connected. Among the nodes whose
//! predecessors have all been visited, the one with the smallest id goes
//! first, so two systems built from the same nodes always step identically
//! regardless of insertion order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use log::{debug, warn};
use petgraph::algo::{connected_components, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::action::{unpack_action, Action};
use crate::arena::NodeArena;
use crate::error::{SimError, SimResult};
use crate::message::{Message, NodeId};
use crate::node::{DrawOptions, Node, NodeVisitor, Outbox};

/// Vertex of the read-only graph view
#[derive(Debug, Clone, PartialEq)]
pub struct GraphVertex {
    pub id: NodeId,
    pub draw_options: DrawOptions,
}

/// Snapshot of the node graph for drawing and inspection
pub type SystemGraph = DiGraph<GraphVertex, ()>;

/// Nodes, actions and the cached update order of one simulation
#[derive(Default)]
pub struct System {
    arena: NodeArena,
    actions: Vec<Action>,
    update_order: Option<Vec<NodeId>>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_nodes(&self) -> usize {
        self.arena.len()
    }

    pub fn num_action(&self) -> usize {
        self.actions.len()
    }

    /// Add a node. Its current outputs become edges of the graph.
    pub fn add_node<N: Node + 'static>(&mut self, node: N) -> SimResult<()> {
        self.add_boxed_node(Box::new(node))
    }

    pub fn add_boxed_node(&mut self, node: Box<dyn Node>) -> SimResult<()> {
        self.arena.insert(node)?;
        self.update_order = None;
        Ok(())
    }

    /// Append an action; its index is its position in the action vector
    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Mutable access to all nodes. Drops the cached order, since outputs
    /// may change.
    pub fn arena_mut(&mut self) -> &mut NodeArena {
        self.update_order = None;
        &mut self.arena
    }

    /// Typed access to a node
    pub fn node<T: Node + 'static>(&self, id: impl Into<NodeId>) -> SimResult<&T> {
        self.arena.node::<T>(&id.into())
    }

    /// Typed mutable access to a node. Drops the cached order.
    pub fn node_mut<T: Node + 'static>(&mut self, id: impl Into<NodeId>) -> SimResult<&mut T> {
        self.update_order = None;
        self.arena.node_mut::<T>(&id.into())
    }

    /// Validate the graph and compute the update order now instead of on
    /// the next step
    pub fn compile(&mut self) -> SimResult<()> {
        self.ensure_order().map(|_| ())
    }

    /// The cached update order, recomputed if stale
    pub fn update_order(&mut self) -> SimResult<&[NodeId]> {
        self.ensure_order()?;
        Ok(self.update_order.as_deref().unwrap_or(&[]))
    }

    fn ensure_order(&mut self) -> SimResult<&[NodeId]> {
        if self.update_order.is_none() {
            let order = compute_update_order(&self.arena)?;
            debug!("Computed update order for {} nodes: {:?}", order.len(), order);
            self.update_order = Some(order);
        }
        Ok(self.update_order.as_deref().unwrap_or(&[]))
    }

    /// Advance every node once, in update order
    pub fn update(&mut self) -> SimResult<()> {
        let order = self.ensure_order()?.to_vec();
        for id in &order {
            let mut outbox = Outbox::new();
            let node = self
                .arena
                .get_mut(id)
                .ok_or_else(|| SimError::NodeNotFound(id.clone()))?;
            node.update(&mut outbox)?;
            self.arena.deliver(outbox)?;
        }
        Ok(())
    }

    /// Fire every action whose flag is set
    pub fn act(&mut self, action_flags: &[bool]) -> SimResult<()> {
        if action_flags.len() != self.actions.len() {
            return Err(SimError::ActionCountMismatch {
                expected: self.actions.len(),
                actual: action_flags.len(),
            });
        }
        for (action, &active) in self.actions.iter_mut().zip(action_flags) {
            if active {
                action.act(&mut self.arena)?;
            }
        }
        Ok(())
    }

    /// Fire actions from a packed action id (see [`unpack_action`])
    pub fn act_packed(&mut self, action_id: u64) -> SimResult<()> {
        if self.actions.is_empty() {
            if action_id != 0 {
                return Err(SimError::invalid_input(format!(
                    "Invalid action id {action_id} for a system without actions."
                )));
            }
            return Ok(());
        }
        let num_dims = u32::try_from(self.actions.len())
            .map_err(|_| SimError::invalid_input("Too many actions to pack"))?;
        let flags = unpack_action(num_dims, action_id)?;
        self.act(&flags)
    }

    /// Concatenated node states, in update order
    pub fn state(&mut self) -> SimResult<Vec<f32>> {
        let order = self.ensure_order()?.to_vec();
        let mut state = Vec::new();
        for id in &order {
            let node = self
                .arena
                .get(id)
                .ok_or_else(|| SimError::NodeNotFound(id.clone()))?;
            state.extend(node.generate_state());
        }
        Ok(state)
    }

    /// Reset every node, in update order
    pub fn reset(&mut self) -> SimResult<()> {
        let order = self.ensure_order()?.to_vec();
        for id in &order {
            if let Some(node) = self.arena.get_mut(id) {
                node.reset();
            }
        }
        Ok(())
    }

    /// Deliver a message from outside the graph
    pub fn send(&mut self, destination: impl Into<NodeId>, message: Message) -> SimResult<()> {
        self.arena.send(destination.into(), message)
    }

    /// Walk all nodes in update order
    pub fn visit(&mut self, visitor: &mut dyn NodeVisitor) -> SimResult<()> {
        let order = self.ensure_order()?.to_vec();
        for id in &order {
            if let Some(node) = self.arena.get(id) {
                node.visit(visitor);
            }
        }
        Ok(())
    }

    /// Read-only snapshot of the graph with per-node drawing attributes
    pub fn graph(&self) -> SimResult<SystemGraph> {
        let (graph, _) = build_graph(&self.arena)?;
        Ok(graph.map(
            |_, id| GraphVertex {
                id: id.clone(),
                draw_options: self
                    .arena
                    .get(id)
                    .map(|node| node.draw_options())
                    .unwrap_or_default(),
            },
            |_, _| (),
        ))
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("nodes", &self.arena.ids().collect::<Vec<_>>())
            .field("actions", &self.actions)
            .field("update_order", &self.update_order)
            .finish()
    }
}

/// Build the directed graph from every node's current outputs
fn build_graph(
    arena: &NodeArena,
) -> SimResult<(DiGraph<NodeId, ()>, BTreeMap<NodeId, NodeIndex>)> {
    let mut graph = DiGraph::with_capacity(arena.len(), arena.len());
    let mut indices = BTreeMap::new();
    for id in arena.ids() {
        indices.insert(id.clone(), graph.add_node(id.clone()));
    }
    for (id, node) in arena.iter() {
        let from = indices[id];
        for output in node.outputs() {
            let to = *indices.get(&output).ok_or_else(|| {
                warn!("Node '{}' outputs to unregistered node '{}'", id, output);
                SimError::graph(format!(
                    "Node '{}' outputs to '{}', which is not part of the system",
                    id, output
                ))
            })?;
            graph.add_edge(from, to, ());
        }
    }
    Ok((graph, indices))
}

/// Validate the graph and compute a topological order, smallest id first
fn compute_update_order(arena: &NodeArena) -> SimResult<Vec<NodeId>> {
    let (graph, indices) = build_graph(arena)?;

    if is_cyclic_directed(&graph) {
        warn!("Node graph contains a cycle");
        return Err(SimError::graph("The node graph contains a cycle"));
    }
    let components = connected_components(&graph);
    if graph.node_count() > 0 && components != 1 {
        warn!("Node graph has {} weakly connected components", components);
        return Err(SimError::graph(format!(
            "The node graph must be connected, found {} components",
            components
        )));
    }

    let mut in_degree: BTreeMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|n| (n, graph.edges_directed(n, Direction::Incoming).count()))
        .collect();
    let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(n, _)| Reverse(graph[*n].clone()))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(id)) = ready.pop() {
        let n = indices[&id];
        for edge in graph.edges_directed(n, Direction::Outgoing) {
            let target = edge.target();
            if let Some(degree) = in_degree.get_mut(&target) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(graph[target].clone()));
                }
            }
        }
        order.push(id);
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::tests::RelayNode;
    use crate::arena::NodeCommand;
    use crate::message::Header;

    fn system_of(nodes: Vec<RelayNode>) -> System {
        let mut system = System::new();
        for node in nodes {
            system.add_node(node).unwrap();
        }
        system
    }

    #[test]
    fn test_update_order_topologically_sorted() {
        // A -> B, B -> C, C -> D, C -> E, F -> C
        let nodes = vec![
            RelayNode::new("F", &["C"]),
            RelayNode::new("E", &[]),
            RelayNode::new("D", &[]),
            RelayNode::new("C", &["D", "E"]),
            RelayNode::new("B", &["C"]),
            RelayNode::new("A", &["B"]),
        ];
        let mut system = system_of(nodes);
        system.update().unwrap();

        let order: Vec<&str> = system
            .update_order()
            .unwrap()
            .iter()
            .map(NodeId::as_str)
            .collect();
        assert_eq!(order, vec!["A", "B", "F", "C", "D", "E"]);
        for id in ["A", "B", "C", "D", "E", "F"] {
            assert_eq!(system.node::<RelayNode>(id).unwrap().log, vec!["update"]);
        }
    }

    #[test]
    fn test_update_forest_fails() {
        let mut system = system_of(vec![
            RelayNode::new("b", &[]),
            RelayNode::new("c", &[]),
            RelayNode::new("a", &["b"]),
        ]);
        assert!(system.update().unwrap_err().is_graph_definition());
        assert!(system.state().unwrap_err().is_graph_definition());
        assert!(system.node::<RelayNode>("a").unwrap().log.is_empty());
    }

    #[test]
    fn test_update_cyclic_fails() {
        let mut system = system_of(vec![
            RelayNode::new("b", &["c"]),
            RelayNode::new("c", &["a"]),
            RelayNode::new("a", &["b"]),
        ]);
        assert!(system.update().unwrap_err().is_graph_definition());
        assert!(system.compile().unwrap_err().is_graph_definition());
    }

    #[test]
    fn test_unregistered_output_fails() {
        let mut system = system_of(vec![RelayNode::new("a", &["ghost"])]);
        assert!(system.compile().unwrap_err().is_graph_definition());
    }

    #[test]
    fn test_empty_system_is_valid() {
        let mut system = System::new();
        system.update().unwrap();
        assert!(system.state().unwrap().is_empty());
        system.act(&[]).unwrap();
        system.act_packed(0).unwrap();
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut system = system_of(vec![RelayNode::new("a", &[])]);
        let err = system.add_node(RelayNode::new("a", &[])).unwrap_err();
        assert!(matches!(err, SimError::DuplicateNode(_)));
        assert_eq!(system.num_nodes(), 1);
    }

    #[test]
    fn test_order_cache_invalidated_on_add() {
        let mut system = system_of(vec![RelayNode::new("b", &[])]);
        system.compile().unwrap();

        system.add_node(RelayNode::new("a", &["b"])).unwrap();
        let order: Vec<&str> = system
            .update_order()
            .unwrap()
            .iter()
            .map(NodeId::as_str)
            .collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_node_mut_invalidates_order() {
        let mut system = system_of(vec![RelayNode::new("a", &["b"]), RelayNode::new("b", &[])]);
        system.compile().unwrap();

        system.node_mut::<RelayNode>("b").unwrap().outputs = vec!["a".into()];
        assert!(system.compile().unwrap_err().is_graph_definition());
    }

    #[test]
    fn test_state_concatenated_in_order() {
        let mut system = system_of(vec![RelayNode::new("b", &[]), RelayNode::new("a", &["b"])]);
        system
            .send("a", Message::new(Header::measured_at(0)))
            .unwrap();
        assert_eq!(system.state().unwrap(), vec![1.0, 1.0]);
    }

    fn system_with_actions() -> System {
        let mut system = system_of(vec![RelayNode::new("a", &["b"]), RelayNode::new("b", &[])]);
        let mut first = Action::new("first");
        first.register_callback(NodeCommand::trigger("a"), 0, "trigger a");
        let mut second = Action::new("second");
        second.register_callback(NodeCommand::reset("b"), 0, "reset b");
        system.add_action(first);
        system.add_action(second);
        system
    }

    #[test]
    fn test_act_raises() {
        let mut system = system_with_actions();
        for flags in [&[true, true, true][..], &[true][..], &[][..]] {
            let err = system.act(flags).unwrap_err();
            assert!(err.is_action_count_mismatch());
        }
    }

    #[test]
    fn test_act_some() {
        let mut system = system_with_actions();
        system.act(&[false, true]).unwrap();
        assert!(system.node::<RelayNode>("a").unwrap().log.is_empty());
        assert_eq!(system.node::<RelayNode>("b").unwrap().log, vec!["reset"]);

        system.act(&[true, false]).unwrap();
        assert_eq!(system.node::<RelayNode>("a").unwrap().log, vec!["trigger"]);
        assert_eq!(system.node::<RelayNode>("b").unwrap().seen.len(), 1);
    }

    #[test]
    fn test_act_packed() {
        let mut system = system_with_actions();
        // 0b10: first action only
        system.act_packed(2).unwrap();
        assert_eq!(system.node::<RelayNode>("a").unwrap().log, vec!["trigger"]);
        assert!(system.act_packed(4).is_err());
        assert_eq!(system.num_action(), 2);
    }

    #[test]
    fn test_reset() {
        let mut system = system_of(vec![RelayNode::new("a", &["b"]), RelayNode::new("b", &[])]);
        system.update().unwrap();
        system.reset().unwrap();
        for id in ["a", "b"] {
            assert_eq!(
                system.node::<RelayNode>(id).unwrap().log,
                vec!["update", "reset"]
            );
        }
    }

    #[test]
    fn test_graph_view() {
        let system = system_of(vec![
            RelayNode::new("a", &["c"]),
            RelayNode::new("b", &["c"]),
            RelayNode::new("c", &[]),
        ]);
        let graph = system.graph().unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph
            .node_weights()
            .all(|v| v.draw_options == DrawOptions::default()));
    }

    #[test]
    fn test_visit_in_order() {
        struct Collect(Vec<String>);
        impl NodeVisitor for Collect {
            fn visit_node(&mut self, node: &dyn Node) {
                self.0.push(node.id().to_string());
            }
        }

        let mut system = system_of(vec![RelayNode::new("b", &[]), RelayNode::new("a", &["b"])]);
        let mut visitor = Collect(Vec::new());
        system.visit(&mut visitor).unwrap();
        assert_eq!(visitor.0, vec!["a", "b"]);
    }
}
