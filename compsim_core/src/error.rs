//! Unified error handling for COMPSIM
//!
//! This module provides a centralized error type for the simulation engine,
//! so graph construction, message delivery and action dispatch all fail the
//! same way.

use thiserror::Error;

use crate::message::NodeId;

/// Main error type for simulation operations
#[derive(Debug, Error)]
pub enum SimError {
    /// I/O related errors (config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed node graph: cycles, disconnected components, missing outputs
    #[error("Graph definition error: {0}")]
    GraphDefinition(String),

    /// A message was sent somewhere it cannot be received
    #[error("Communication error: {0}")]
    Communication(String),

    /// The external action vector does not match the registered actions
    #[error("Action count mismatch: expected {expected} actions, got {actual}")]
    ActionCountMismatch { expected: usize, actual: usize },

    /// Lookup of an id that is not part of the system
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Two nodes registered under the same id
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// Typed access to a node of another concrete type
    #[error("Node '{node}' is not a {expected}")]
    NodeTypeMismatch { node: NodeId, expected: &'static str },

    /// Invalid input/argument errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration parsing or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for Results using SimError
pub type SimResult<T> = Result<T, SimError>;

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for SimError {
    fn from(err: toml::de::Error) -> Self {
        SimError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for SimError {
    fn from(err: toml::ser::Error) -> Self {
        SimError::Serialization(format!("TOML serialization error: {}", err))
    }
}

impl From<serde_yaml::Error> for SimError {
    fn from(err: serde_yaml::Error) -> Self {
        SimError::Serialization(format!("YAML error: {}", err))
    }
}

// Helper methods
impl SimError {
    /// Create a graph definition error with a custom message
    pub fn graph<S: Into<String>>(msg: S) -> Self {
        SimError::GraphDefinition(msg.into())
    }

    /// Create a communication error with a custom message
    pub fn communication<S: Into<String>>(msg: S) -> Self {
        SimError::Communication(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SimError::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        SimError::InvalidInput(msg.into())
    }

    pub fn is_graph_definition(&self) -> bool {
        matches!(self, SimError::GraphDefinition(_))
    }

    pub fn is_communication(&self) -> bool {
        matches!(self, SimError::Communication(_))
    }

    pub fn is_action_count_mismatch(&self) -> bool {
        matches!(self, SimError::ActionCountMismatch { .. })
    }
}
