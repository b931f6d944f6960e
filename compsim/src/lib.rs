//! # COMPSIM - Compute Pipeline Simulation
//!
//! A deterministic, time-stepped simulation of sensing and compute nodes
//! arranged in a DAG, built as an environment for learning scheduling
//! policies on edge and fog devices.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use compsim::prelude::*;
//!
//! fn main() -> SimResult<()> {
//!     let clock = Clock::new(0);
//!     let time = clock.as_readonly();
//!
//!     let mut source = SourceNode::new(
//!         "camera",
//!         time.clone(),
//!         PeriodicEpochSensor::new(0, 100, FixedDuration::new(0)),
//!     );
//!     source.add_output("camera_buffer")?;
//!
//!     let mut buffer = RingBufferNode::new("camera_buffer", time.clone(), 2);
//!     buffer.set_output("output");
//!
//!     let mut system = System::new();
//!     system.add_node(source)?;
//!     system.add_node(buffer)?;
//!     system.add_node(OutputNode::new("output", time))?;
//!
//!     let mut forward = Action::new("forward");
//!     forward.register_callback(NodeCommand::trigger("camera_buffer"), 0, "pop");
//!     system.add_action(forward);
//!
//!     for _ in 0..10 {
//!         system.act(&[true])?;
//!         system.update()?;
//!         let _observation = system.state()?;
//!         clock.advance(10);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Deterministic stepping** with a fixed topological update order
//! - **Seeded duration samplers** with one independent stream each
//! - **Flat, fixed-length state vector** for learning agents
//! - **Packed action ids** for discrete action spaces

pub use compsim_core::{self, *};

// Re-export standard library with alias
pub use compsim_library as library;

pub use serde;

/// The COMPSIM prelude - everything needed to build and drive a simulation
pub mod prelude {
    // ============================================
    // Time & Sampling
    // ============================================
    pub use compsim_core::{
        Clock, DurationSampler, FixedDuration, GammaDistributionSampler, GaussianTimeSampler,
        SequenceDuration, Time, TimeProvider,
    };

    // ============================================
    // Messages & Nodes
    // ============================================
    pub use compsim_core::{DrawOptions, Header, Message, Node, NodeId, NodeVisitor, Outbox};
    pub use compsim_core::{ConstantNormalizer, NormalizerSet, StateNormalizer};

    // ============================================
    // Actions & System
    // ============================================
    pub use compsim_core::{
        max_action_id, node_idle, num_actions, unpack_action, Action, NodeCommand, NodeOp, System,
    };

    // ============================================
    // Configuration
    // ============================================
    pub use compsim_core::{DurationSpec, NormalizerSpec, SimulationConfig};

    // ============================================
    // Built-in Nodes & Sensors
    // ============================================
    pub use compsim_library::prelude::*;

    // ============================================
    // Error Types
    // ============================================
    pub use compsim_core::{SimError, SimResult};

    // ============================================
    // Common Traits
    // ============================================
    pub use serde::{Deserialize, Serialize};

    // Re-export anyhow for error handling
    pub use anyhow::{anyhow, bail, ensure, Context, Result as AnyResult};
}
