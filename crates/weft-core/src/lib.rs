//! # Weft Core
//!
//! This crate provides the foundational types for the weft messaging fabric.
//! It defines the abstractions that the pub-sub engine and collaborating
//! transports build upon.
//!
//! ## Key Components
//!
//! - **Identifiers**: Process, node, and handler identities
//! - **Topics**: Fully-qualified topic name composition and validation
//! - **Messages**: The nominal-typing contract for published payloads
//! - **Options**: Node and advertisement configuration
//! - **Errors**: Common error types and handling

pub mod error;
pub mod id;
pub mod message;
pub mod options;
pub mod topic;

// Re-export commonly used types
pub use error::{Error, Result};
pub use id::{HandlerId, NodeId, ProcessId};
pub use message::{GENERIC_MESSAGE_TYPE, Message, MessageInfo, MessageType};
pub use options::{AdvertiseOptions, AdvertiseServiceOptions, Credentials, NodeOptions};
pub use topic::{fully_qualified, is_valid_topic, partition_of, strip_partition};
