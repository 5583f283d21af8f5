//! # Weft PubSub
//!
//! Topic-based publish-subscribe and request-reply routing engine for the
//! weft messaging fabric. A [`Node`] advertises topics it publishes,
//! subscribes to topics it consumes, and advertises services it answers;
//! delivery spans the in-process domain (direct callback invocation) and the
//! inter-process domain (a wire transport) transparently to the caller.
//!
//! ## Key Components
//!
//! - **Node**: User-facing facade orchestrating advertise and subscribe
//! - **Publisher**: Per-advertisement handle implementing the publish path
//! - **TransportContext**: Process-wide shared state, explicitly constructed
//! - **Discovery/Transport**: Contracts for the out-of-band collaborators
//! - **DispatchQueue**: Ordered fire-and-forget delivery worker
//! - **ShutdownLatch**: Sticky signal-driven shutdown coordination
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weft_core::{AdvertiseOptions, MessageInfo, MessageType, NodeOptions};
//! use weft_pubsub::{Node, TransportContext};
//!
//! # #[derive(Clone, serde::Serialize, serde::Deserialize)]
//! # struct Reading { celsius: f64 }
//! # impl MessageType for Reading { const TYPE_NAME: &'static str = "demo.Reading"; }
//! # fn example(context: Arc<TransportContext>) -> weft_pubsub::Result<()> {
//! let node = Node::new(context, NodeOptions::from_env());
//! node.subscribe("temperature", |reading: &Reading, info: &MessageInfo| {
//!     println!("{} on {}", reading.celsius, info.topic());
//! })?;
//!
//! let publisher = node.advertise::<Reading>("temperature", AdvertiseOptions::new())?;
//! publisher.publish(&Reading { celsius: 21.5 })?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod descriptor;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod node;
pub mod publisher;
pub mod registry;
pub mod shutdown;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export public API
pub use context::{ContextConfig, Registries, TransportContext};
pub use descriptor::{MessagePublisher, ServicePublisher};
pub use discovery::{Discovery, MessageDiscovery, ServiceDiscovery};
pub use dispatch::DispatchQueue;
pub use error::{PubSubError, Result};
pub use node::Node;
pub use publisher::Publisher;
pub use registry::{
    RawSubscriptionHandler, RegisteredReplier, RemoteSubscribers, ReplierStore, ServiceReplier,
    SubscriptionHandler, SubscriptionStore, TypedSubscriptionHandler,
};
pub use shutdown::{ShutdownLatch, wait_for_shutdown};
pub use transport::{CONTROL_LINGER, END_CONNECTION_OPCODE, EndConnectionFrame, Transport};

// Re-export the foundational types alongside the engine
pub use weft_core::{
    AdvertiseOptions, AdvertiseServiceOptions, Credentials, GENERIC_MESSAGE_TYPE, HandlerId,
    Message, MessageInfo, MessageType, NodeId, NodeOptions, ProcessId,
};
