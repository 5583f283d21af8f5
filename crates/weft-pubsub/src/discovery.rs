//! Contract for the out-of-band discovery subsystem.
//!
//! Discovery announces local publishers to peers, revokes them, and resolves
//! the endpoints of remote publishers. The protocol itself (beacons, info
//! tables) lives in a collaborating crate; the routing engine only depends
//! on this interface.

use crate::Result;
use crate::descriptor::{MessagePublisher, ServicePublisher};
use std::collections::HashMap;
use weft_core::{NodeId, ProcessId};

/// Discovery client interface, generic over the advertised record.
///
/// Every method is a bounded synchronous call by contract; implementations
/// bridge to their own I/O. The shared context serializes calls behind its
/// registry lock where registry state and discovery side-effects must be
/// observed atomically.
pub trait Discovery: Send + Sync {
    /// The advertisement record this client distributes
    type Publisher;

    /// Announce a local publisher to peers
    fn advertise(&self, publisher: &Self::Publisher) -> Result<()>;

    /// Revoke a previously announced `(topic, node)` advertisement
    fn unadvertise(&self, topic: &str, node_id: &NodeId) -> Result<()>;

    /// Request resolution of the publishers of a topic
    fn discover(&self, topic: &str) -> Result<()>;

    /// Get the currently known publishers of a topic, grouped by process
    fn publishers(&self, topic: &str) -> Result<HashMap<ProcessId, Vec<Self::Publisher>>>;

    /// Get the publishers advertised by one node of one process
    fn publishers_by_node(&self, process_id: &ProcessId, node_id: &NodeId) -> Vec<Self::Publisher>;

    /// List every fully-qualified name known to discovery
    fn topic_list(&self) -> Vec<String>;

    /// Block until discovery has finished its initialization handshake
    fn wait_for_init(&self);
}

/// Discovery client for topic publishers.
pub type MessageDiscovery = dyn Discovery<Publisher = MessagePublisher>;

/// Discovery client for service repliers.
pub type ServiceDiscovery = dyn Discovery<Publisher = ServicePublisher>;
