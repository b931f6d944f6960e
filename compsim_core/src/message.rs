//! Messages exchanged between nodes
//!
//! A [`Message`] is owned by exactly one node at a time. Sending always hands
//! the receiver its own clone, so a sender that keeps a copy never observes
//! downstream changes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Time;

/// Unique identifier of a node within one system.
///
/// Ids order lexicographically, which fixes the tie-break of the update order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random v4 UUID based id
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Timestamp and count metadata carried by every message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub sender_id: Option<NodeId>,
    pub destination_id: Option<NodeId>,
    pub t_measure_oldest: Time,
    pub t_measure_youngest: Time,
    pub t_measure_average: Time,
    pub num_measurements: u64,
}

impl Header {
    pub fn new(t_measure_oldest: Time, t_measure_youngest: Time, t_measure_average: Time) -> Self {
        Self {
            sender_id: None,
            destination_id: None,
            t_measure_oldest,
            t_measure_youngest,
            t_measure_average,
            num_measurements: 1,
        }
    }

    /// Header of a single measurement taken at `t`
    pub fn measured_at(t: Time) -> Self {
        Self::new(t, t, t)
    }

    pub fn with_measurements(mut self, num_measurements: u64) -> Self {
        self.num_measurements = num_measurements;
        self
    }

    /// Copy of this header addressed from `sender` to `destination`
    pub fn addressed(&self, sender: &NodeId, destination: &NodeId) -> Self {
        Self {
            sender_id: Some(sender.clone()),
            destination_id: Some(destination.clone()),
            ..self.clone()
        }
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Header plus opaque payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub header: Header,
    pub payload: serde_json::Value,
}

impl Message {
    /// Message with an empty payload
    pub fn new(header: Header) -> Self {
        Self {
            header,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(header: Header, payload: serde_json::Value) -> Self {
        Self { header, payload }
    }

    /// Clone of this message with sender and destination stamped
    pub fn addressed(&self, sender: &NodeId, destination: &NodeId) -> Self {
        Self {
            header: self.header.addressed(sender, destination),
            payload: self.payload.clone(),
        }
    }
}
