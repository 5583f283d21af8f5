//! Advertisement records exchanged with the discovery subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use weft_core::{AdvertiseOptions, AdvertiseServiceOptions, NodeId, ProcessId};

/// Record describing one advertised topic publisher.
///
/// Value equality drives deduplication in topic information queries, so two
/// records are the same publisher iff every field matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePublisher {
    /// Fully-qualified topic name
    pub topic: String,
    /// Endpoint messages are published on
    pub data_address: String,
    /// Endpoint control messages are received on
    pub control_address: String,
    /// Owning process
    pub process_id: ProcessId,
    /// Owning node
    pub node_id: NodeId,
    /// Registered message type name
    pub type_name: String,
    /// Advertise options, including throttling
    pub options: AdvertiseOptions,
}

impl MessagePublisher {
    /// Create a publisher record
    pub fn new(
        topic: impl Into<String>,
        data_address: impl Into<String>,
        control_address: impl Into<String>,
        process_id: ProcessId,
        node_id: NodeId,
        type_name: impl Into<String>,
        options: AdvertiseOptions,
    ) -> Self {
        Self {
            topic: topic.into(),
            data_address: data_address.into(),
            control_address: control_address.into(),
            process_id,
            node_id,
            type_name: type_name.into(),
            options,
        }
    }
}

impl fmt::Display for MessagePublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "publisher [{}] of type [{}] at [{}] (node {})",
            self.topic, self.type_name, self.data_address, self.node_id
        )
    }
}

/// Record describing one advertised service replier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePublisher {
    /// Fully-qualified service name
    pub service: String,
    /// Endpoint requests are received on
    pub data_address: String,
    /// Owning process
    pub process_id: ProcessId,
    /// Owning node
    pub node_id: NodeId,
    /// Registered request type name
    pub request_type_name: String,
    /// Registered response type name
    pub response_type_name: String,
    /// Service advertise options
    pub options: AdvertiseServiceOptions,
}

impl ServicePublisher {
    /// Create a service publisher record
    pub fn new(
        service: impl Into<String>,
        data_address: impl Into<String>,
        process_id: ProcessId,
        node_id: NodeId,
        request_type_name: impl Into<String>,
        response_type_name: impl Into<String>,
        options: AdvertiseServiceOptions,
    ) -> Self {
        Self {
            service: service.into(),
            data_address: data_address.into(),
            process_id,
            node_id,
            request_type_name: request_type_name.into(),
            response_type_name: response_type_name.into(),
            options,
        }
    }
}

impl fmt::Display for ServicePublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service [{}] ({} -> {}) at [{}] (node {})",
            self.service, self.request_type_name, self.response_type_name, self.data_address,
            self.node_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn publisher_fixture() -> MessagePublisher {
        MessagePublisher::new(
            "garden@/sensors/temperature",
            "tcp://10.0.0.5:11001",
            "tcp://10.0.0.5:11002",
            ProcessId::new("proc-1"),
            NodeId::new("node-1"),
            "weft.test.Reading",
            AdvertiseOptions::new(),
        )
    }

    #[test]
    fn test_message_publisher_value_equality() {
        let fixture = publisher_fixture();
        let same = publisher_fixture();
        assert_eq!(fixture, same);

        let mut different = publisher_fixture();
        different.node_id = NodeId::new("node-2");
        assert_ne!(fixture, different);
    }

    #[test]
    fn test_message_publisher_display() {
        let fixture = publisher_fixture();
        let actual = format!("{fixture}");
        let expected = "publisher [garden@/sensors/temperature] of type [weft.test.Reading] \
                        at [tcp://10.0.0.5:11001] (node node-1)";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_message_publisher_serialization_roundtrip() {
        let fixture = publisher_fixture();
        let json = serde_json::to_string(&fixture).unwrap();
        let actual: MessagePublisher = serde_json::from_str(&json).unwrap();
        assert_eq!(actual, fixture);
    }

    #[test]
    fn test_service_publisher_creation() {
        let actual = ServicePublisher::new(
            "garden@/calibrate",
            "tcp://10.0.0.5:11003",
            ProcessId::new("proc-1"),
            NodeId::new("node-1"),
            "weft.test.CalibrateRequest",
            "weft.test.CalibrateResponse",
            AdvertiseServiceOptions::new(),
        );

        assert_eq!(actual.service, "garden@/calibrate");
        assert_eq!(actual.request_type_name, "weft.test.CalibrateRequest");
        assert_eq!(actual.response_type_name, "weft.test.CalibrateResponse");
    }
}
