//! Actions
//!
//! An [`Action`] is one entry of the external action vector: a named bundle of
//! callbacks run in descending priority order, gated by a readiness predicate.
//! Callbacks usually name a node operation (pop a buffer, trigger a compute
//! node) that is resolved through the [`NodeArena`] when the action fires.

use std::cmp::Reverse;
use std::fmt;

use crate::arena::{NodeArena, NodeCommand};
use crate::error::{SimError, SimResult};
use crate::message::NodeId;

type CustomCallback = Box<dyn FnMut(&mut NodeArena) -> SimResult<()> + Send>;
type ReadinessCallback = Box<dyn Fn(&NodeArena) -> bool + Send>;

/// What an action callback does when invoked
pub enum CallbackTarget {
    /// Run an operation on a node by id
    Command(NodeCommand),
    /// Arbitrary code with access to the node arena
    Custom(CustomCallback),
}

impl CallbackTarget {
    pub fn custom<F>(callback: F) -> Self
    where
        F: FnMut(&mut NodeArena) -> SimResult<()> + Send + 'static,
    {
        CallbackTarget::Custom(Box::new(callback))
    }

    fn invoke(&mut self, arena: &mut NodeArena) -> SimResult<()> {
        match self {
            CallbackTarget::Command(command) => arena.execute(command),
            CallbackTarget::Custom(callback) => callback(arena),
        }
    }
}

impl From<NodeCommand> for CallbackTarget {
    fn from(command: NodeCommand) -> Self {
        CallbackTarget::Command(command)
    }
}

impl fmt::Debug for CallbackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackTarget::Command(command) => f.debug_tuple("Command").field(command).finish(),
            CallbackTarget::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug)]
pub struct ActionCallback {
    pub target: CallbackTarget,
    pub priority: i32,
    pub name: String,
}

/// Priority-ordered, readiness-gated bundle of callbacks
pub struct Action {
    name: String,
    callbacks: Vec<ActionCallback>,
    readiness: ReadinessCallback,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            callbacks: Vec::new(),
            readiness: Box::new(|_: &NodeArena| true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a callback. Higher priorities run first; equal priorities
    /// keep registration order.
    pub fn register_callback(
        &mut self,
        target: impl Into<CallbackTarget>,
        priority: i32,
        name: impl Into<String>,
    ) {
        self.callbacks.push(ActionCallback {
            target: target.into(),
            priority,
            name: name.into(),
        });
        self.callbacks.sort_by_key(|cb| Reverse(cb.priority));
    }

    /// Replace the readiness gate (always ready by default)
    pub fn register_readiness_callback<F>(&mut self, readiness: F)
    where
        F: Fn(&NodeArena) -> bool + Send + 'static,
    {
        self.readiness = Box::new(readiness);
    }

    pub fn is_ready(&self, arena: &NodeArena) -> bool {
        (self.readiness)(arena)
    }

    /// Run every callback in priority order if the action is ready.
    ///
    /// The first failing callback aborts the remaining ones.
    pub fn act(&mut self, arena: &mut NodeArena) -> SimResult<()> {
        if !self.is_ready(arena) {
            return Ok(());
        }
        for callback in &mut self.callbacks {
            callback.target.invoke(arena)?;
        }
        Ok(())
    }

    /// Callback names in execution order
    pub fn callback_names(&self) -> impl Iterator<Item = &str> {
        self.callbacks.iter().map(|cb| cb.name.as_str())
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action \"{}\" with {} callbacks.", self.name, self.len())
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

/// Readiness gate that holds while `node` exists and is not busy
pub fn node_idle(node: impl Into<NodeId>) -> impl Fn(&NodeArena) -> bool + Send + 'static {
    let node = node.into();
    move |arena: &NodeArena| arena.get(&node).is_some_and(|n| !n.is_busy())
}

/// Largest packed action id for `num_action_dims` binary actions
pub fn max_action_id(num_action_dims: u32) -> u64 {
    match num_action_dims {
        0 => 0,
        n if n >= u64::BITS => u64::MAX,
        n => (1u64 << n) - 1,
    }
}

/// Number of distinct packed actions (0 when there are no actions)
pub fn num_actions(num_action_dims: u32) -> u64 {
    if num_action_dims > 0 {
        max_action_id(num_action_dims).saturating_add(1)
    } else {
        0
    }
}

/// Unpack `action` into one flag per action, most significant bit first
pub fn unpack_action(num_action_dims: u32, action: u64) -> SimResult<Vec<bool>> {
    if num_action_dims == 0 || num_action_dims > u64::BITS {
        return Err(SimError::invalid_input(format!(
            "Unsupported number of action dimensions: {num_action_dims}"
        )));
    }
    if action > max_action_id(num_action_dims) {
        return Err(SimError::invalid_input(format!("Invalid action id {action}.")));
    }
    Ok((0..num_action_dims)
        .rev()
        .map(|bit| (action >> bit) & 1 == 1)
        .collect())
}
