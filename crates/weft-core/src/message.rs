//! The nominal-typing contract for published payloads.
//!
//! Every topic is bound to exactly one message type name. Publishers check
//! the name at publish time; subscription handlers either register a concrete
//! type or the generic sentinel that matches any type.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Well-known type name for handlers that accept any message type.
pub const GENERIC_MESSAGE_TYPE: &str = "weft.msgs.Generic";

/// Metadata delivered to local subscription callbacks alongside a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    /// Topic the message was published on, without the partition prefix
    pub topic: String,
    /// Registered name of the message type
    pub type_name: String,
}

impl MessageInfo {
    /// Create message metadata
    pub fn new(topic: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            type_name: type_name.into(),
        }
    }

    /// Get the partition-stripped topic
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Get the message type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Object-safe capability contract for messages moving through the fabric.
///
/// The routing engine only needs four capabilities from a payload: its
/// nominal type name, wire encoding, a deep copy for asynchronous dispatch,
/// and a downcast hook for typed local callbacks.
pub trait Message: Send + Sync {
    /// Registered name of this message's type
    fn type_name(&self) -> &str;

    /// Serialize the message to bytes for the wire
    fn encode(&self) -> Result<Vec<u8>>;

    /// Deep-copy the message
    fn clone_message(&self) -> Box<dyn Message>;

    /// Downcast hook for typed subscription handlers
    fn as_any(&self) -> &dyn Any;
}

/// A concrete message type with a registered nominal name.
///
/// Implementors get [`Message`] for free through the blanket impl.
pub trait MessageType: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Globally unique name for this message type
    const TYPE_NAME: &'static str;

    /// Deserialize a message of this type from bytes
    fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::decode(Self::TYPE_NAME, e.to_string()))
    }
}

impl<T: MessageType> Message for T {
    fn type_name(&self) -> &str {
        T::TYPE_NAME
    }

    fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Into::into)
    }

    fn clone_message(&self) -> Box<dyn Message> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reading {
        value: i64,
    }

    impl MessageType for Reading {
        const TYPE_NAME: &'static str = "weft.test.Reading";
    }

    #[test]
    fn test_message_type_name() {
        let fixture = Reading { value: 7 };
        let actual = fixture.type_name();
        let expected = "weft.test.Reading";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_message_encode_decode_roundtrip() {
        let fixture = Reading { value: 42 };
        let bytes = fixture.encode().unwrap();
        let actual = Reading::decode(&bytes).unwrap();
        assert_eq!(actual, fixture);
    }

    #[test]
    fn test_message_decode_rejects_garbage() {
        let actual = Reading::decode(b"not json");
        assert!(actual.is_err());
    }

    #[test]
    fn test_message_deep_copy_is_independent() {
        let fixture = Reading { value: 1 };
        let copy = fixture.clone_message();

        assert_eq!(copy.type_name(), fixture.type_name());
        let actual = copy.as_any().downcast_ref::<Reading>().unwrap();
        assert_eq!(actual, &fixture);
    }

    #[test]
    fn test_message_downcast_to_wrong_type_fails() {
        let fixture = Reading { value: 1 };
        let message: &dyn Message = &fixture;
        assert!(message.as_any().downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_message_info_accessors() {
        let fixture = MessageInfo::new("/sensors/temperature", "weft.test.Reading");
        assert_eq!(fixture.topic(), "/sensors/temperature");
        assert_eq!(fixture.type_name(), "weft.test.Reading");
    }
}
