//! # COMPSIM Core
//!
//! The simulation engine behind COMPSIM, a deterministic time-stepped model of
//! edge/fog compute pipelines. Sensors emit timestamped measurements, compute
//! stages fuse and filter them under simulated task durations, and buffers and
//! sinks absorb backpressure.
//!
//! This crate provides the building blocks:
//!
//! - **Time**: integer simulation clock and seeded duration samplers
//! - **Messages**: timestamped, copy-on-receive data records
//! - **Nodes**: the shared node contract and message delivery
//! - **Actions**: priority-ordered, readiness-gated callback bundles
//! - **System**: graph validation, deterministic update order, state vector
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use compsim_core::{Action, NodeCommand, System};
//!
//! let mut system = System::new();
//! system.add_node(my_source)?;
//! system.add_node(my_sink)?;
//!
//! let mut action = Action::new("drain");
//! action.register_callback(NodeCommand::trigger("buffer"), 0, "pop");
//! system.add_action(action);
//!
//! system.act(&[true])?;
//! system.update()?;
//! let observation = system.state()?;
//! ```

pub mod action;
pub mod arena;
pub mod config;
pub mod error;
pub mod message;
pub mod node;
pub mod normalize;
pub mod sampler;
pub mod system;
pub mod time;

// Re-export commonly used types for easy access
pub use action::{
    max_action_id, node_idle, num_actions, unpack_action, Action, ActionCallback,
    CallbackTarget,
};
pub use arena::{NodeArena, NodeCommand, NodeOp};
pub use config::{DurationSpec, NormalizerSpec, SimulationConfig};
pub use error::{SimError, SimResult};
pub use message::{Header, Message, NodeId};
pub use node::{DrawOptions, Node, NodeVisitor, Outbox};
pub use normalize::{
    empty_header_state, header_state, slot_state, ConstantNormalizer, NormalizerSet,
    StateNormalizer,
};
pub use sampler::{
    DurationSampler, FixedDuration, GammaDistributionSampler, GaussianTimeSampler,
    SequenceDuration,
};
pub use system::{GraphVertex, System, SystemGraph};
pub use time::{as_age, Clock, Time, TimeProvider};
