//! Contract for the wire transport and the end-of-subscription control
//! message.

use crate::Result;
use std::time::Duration;
use weft_core::{GENERIC_MESSAGE_TYPE, NodeId};

/// Control opcode telling a publisher that a subscriber lost its last
/// interest in a topic.
pub const END_CONNECTION_OPCODE: u16 = 2;

/// Linger applied to short-lived control sockets.
///
/// Bounds the wait when a peer has vanished; pending control frames are
/// discarded once the linger expires.
pub const CONTROL_LINGER: Duration = Duration::from_millis(200);

/// Wire transport interface.
///
/// Socket types and framing live in a collaborating crate. Publishing may
/// block on socket backpressure but is a bounded wait by contract.
pub trait Transport: Send + Sync {
    /// Endpoint this process publishes data on
    fn data_address(&self) -> String;

    /// Endpoint this process receives control messages on
    fn control_address(&self) -> String;

    /// Publish a serialized payload on a fully-qualified topic
    fn publish(&self, topic: &str, payload: &[u8], type_name: &str) -> Result<()>;

    /// Install the subscription filter for a topic
    fn add_filter(&self, topic: &str) -> Result<()>;

    /// Remove the subscription filter for a topic
    fn remove_filter(&self, topic: &str) -> Result<()>;

    /// Open an ephemeral socket to a peer's control endpoint, send a
    /// multi-frame message with the given linger, and close. Best-effort.
    fn send_control(&self, endpoint: &str, frames: &[Vec<u8>], linger: Duration) -> Result<()>;
}

/// End-of-subscription control message.
///
/// Sent to every known publisher of a topic when a node loses its last
/// interest in it.
#[derive(Debug, Clone, PartialEq)]
pub struct EndConnectionFrame {
    /// Fully-qualified topic the sender is no longer interested in
    pub topic: String,
    /// Sender's data endpoint
    pub data_address: String,
    /// Sender's node identity
    pub node_id: NodeId,
}

impl EndConnectionFrame {
    /// Create an end-of-subscription message
    pub fn new(topic: impl Into<String>, data_address: impl Into<String>, node_id: NodeId) -> Self {
        Self {
            topic: topic.into(),
            data_address: data_address.into(),
            node_id,
        }
    }

    /// Lay the message out as the five wire frames:
    /// topic, data endpoint, node UUID, generic type sentinel, and the
    /// decimal ASCII end-connection opcode.
    pub fn frames(&self) -> [Vec<u8>; 5] {
        [
            self.topic.as_bytes().to_vec(),
            self.data_address.as_bytes().to_vec(),
            self.node_id.as_str().as_bytes().to_vec(),
            GENERIC_MESSAGE_TYPE.as_bytes().to_vec(),
            END_CONNECTION_OPCODE.to_string().into_bytes(),
        ]
    }
}
