//! # COMPSIM Standard Library
//!
//! Ready-made nodes and sensors for COMPSIM graphs.
//!
//! ## Structure
//!
//! ```text
//! compsim_library/
//! ── nodes/          # Source, buffer, compute, output and sink nodes
//! ── sensors/        # Measurement schedules driving source nodes
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use compsim_core::{Clock, FixedDuration, System};
//! use compsim_library::{FilteringMisoNode, PeriodicEpochSensor, RingBufferNode, SourceNode};
//!
//! let clock = Clock::new(0);
//! let time = clock.as_readonly();
//!
//! let mut source = SourceNode::new("lidar", time.clone(),
//!     PeriodicEpochSensor::new(0, 100, FixedDuration::new(0)));
//! source.add_output("lidar_buffer")?;
//!
//! let mut buffer = RingBufferNode::new("lidar_buffer", time.clone(), 4);
//! buffer.set_output("fusion");
//!
//! let mut system = System::new();
//! system.add_node(source)?;
//! system.add_node(buffer)?;
//! ```

pub mod nodes;
pub mod sensors;

pub use nodes::{
    fuse, BufferedComputeNode, FilteringMisoNode, OutputNode, ProcessingState, ReceiveCallback,
    RingBufferNode, SinkNode, SourceNode,
};
pub use sensors::{PeriodicEpochSensor, Sensor};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::nodes::{
        BufferedComputeNode, FilteringMisoNode, OutputNode, RingBufferNode, SinkNode, SourceNode,
    };
    pub use crate::sensors::{PeriodicEpochSensor, Sensor};
}
