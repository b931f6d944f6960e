//! Concrete node types
//!
//! # Available Nodes
//!
//! - `source` - Forwards sensor measurements to every output
//! - `ring_buffer` - Bounded FIFO, routes overflow to a loss sink
//! - `filtering_miso` - Fan-in fusion with staleness rejection and task durations
//! - `output` - Keeps the last message that reached the end of the pipeline
//! - `sink` - Counts messages per step
//! - `buffered_compute` - Per-sender buffers in front of one compute node

pub mod buffered_compute;
pub mod filtering_miso;
pub mod output;
pub mod ring_buffer;
pub mod sink;
pub mod source;

pub use buffered_compute::BufferedComputeNode;
pub use filtering_miso::{fuse, FilteringMisoNode, ProcessingState};
pub use output::{OutputNode, ReceiveCallback};
pub use ring_buffer::RingBufferNode;
pub use sink::SinkNode;
pub use source::SourceNode;
