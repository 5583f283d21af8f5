//! Process-wide shared state for every node participating in the fabric.
//!
//! The context is constructed explicitly and handed to each node, never
//! reached through a global. Reference counting keeps it alive for as long
//! as any node or publisher handle needs it, and tests instantiate isolated
//! contexts with their own collaborators.

use crate::discovery::{MessageDiscovery, ServiceDiscovery};
use crate::dispatch::DispatchQueue;
use crate::registry::{RemoteSubscribers, ReplierStore, SubscriptionStore};
use crate::transport::Transport;
use crate::{PubSubError, Result};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use weft_core::{Credentials, ProcessId};

/// Configuration handed to the shared context at construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextConfig {
    /// Credential pair forwarded to the transport collaborator
    pub credentials: Option<Credentials>,
}

impl ContextConfig {
    /// Create a configuration without credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a credential pair
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// Registries guarded by the context's single lock.
#[derive(Default)]
pub struct Registries {
    /// Local subscription handlers per topic and owning node
    pub local_subscriptions: SubscriptionStore,
    /// Remote interest per topic and type name
    pub remote_subscribers: RemoteSubscribers,
    /// Service repliers per service and owning node
    pub repliers: ReplierStore,
}

/// Shared state owned by every node of one process.
pub struct TransportContext {
    process_id: ProcessId,
    config: ContextConfig,
    registries: Mutex<Registries>,
    msg_discovery: Arc<MessageDiscovery>,
    srv_discovery: Arc<ServiceDiscovery>,
    transport: Arc<dyn Transport>,
    data_address: String,
    control_address: String,
    dispatcher: DispatchQueue,
    runtime: tokio::runtime::Handle,
}

impl TransportContext {
    /// Create a shared context around the given collaborators.
    ///
    /// Must be called within a Tokio runtime; the context captures the
    /// runtime handle for its dispatch queue and detached publish workers.
    pub fn new(
        msg_discovery: Arc<MessageDiscovery>,
        srv_discovery: Arc<ServiceDiscovery>,
        transport: Arc<dyn Transport>,
        config: ContextConfig,
    ) -> Result<Arc<Self>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| PubSubError::dispatch("TransportContext requires a Tokio runtime"))?;
        let data_address = transport.data_address();
        let control_address = transport.control_address();
        let dispatcher = DispatchQueue::new(&runtime);

        Ok(Arc::new(Self {
            process_id: ProcessId::generate(),
            config,
            registries: Mutex::new(Registries::default()),
            msg_discovery,
            srv_discovery,
            transport,
            data_address,
            control_address,
            dispatcher,
            runtime,
        }))
    }

    /// Get this process's identity
    pub fn process_id(&self) -> &ProcessId {
        &self.process_id
    }

    /// Get the context configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Get the transport's data endpoint
    pub fn data_address(&self) -> &str {
        &self.data_address
    }

    /// Get the transport's control endpoint
    pub fn control_address(&self) -> &str {
        &self.control_address
    }

    /// Lock the registries.
    ///
    /// The guard also serializes the discovery side-effects that must
    /// observe registry state atomically. Never held across an await.
    pub fn registries(&self) -> MutexGuard<'_, Registries> {
        self.registries.lock()
    }

    /// Get the message discovery client
    pub fn msg_discovery(&self) -> &Arc<MessageDiscovery> {
        &self.msg_discovery
    }

    /// Get the service discovery client
    pub fn srv_discovery(&self) -> &Arc<ServiceDiscovery> {
        &self.srv_discovery
    }

    /// Get the wire transport
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Get the dispatch queue
    pub fn dispatcher(&self) -> &DispatchQueue {
        &self.dispatcher
    }

    /// Get the runtime handle captured at construction
    pub fn runtime(&self) -> &tokio::runtime::Handle {
        &self.runtime
    }

    /// Publish a serialized payload through the wire transport
    pub fn publish(&self, topic: &str, payload: &[u8], type_name: &str) -> Result<()> {
        self.transport.publish(topic, payload, type_name)
    }

    /// Record remote interest in a topic.
    ///
    /// Driven by the transport's receive path when a remote subscription
    /// handshake arrives.
    pub fn register_remote_subscriber(&self, topic: &str, type_name: &str) {
        self.registries().remote_subscribers.insert(topic, type_name);
    }

    /// Drop remote interest in a topic
    pub fn remove_remote_subscriber(&self, topic: &str, type_name: &str) {
        self.registries().remote_subscribers.remove(topic, type_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StatusMsg, test_context};
    use pretty_assertions::assert_eq;
    use weft_core::MessageType;

    #[tokio::test]
    async fn test_context_exposes_transport_addresses() {
        let (context, _discovery, _srv_discovery, transport) = test_context();

        assert_eq!(context.data_address(), transport.data_address());
        assert_eq!(context.control_address(), transport.control_address());
    }

    #[tokio::test]
    async fn test_context_publish_reaches_transport() {
        let (context, _discovery, _srv_discovery, transport) = test_context();

        context
            .publish("@/a", b"payload", StatusMsg::TYPE_NAME)
            .unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "@/a");
        assert_eq!(published[0].1, b"payload".to_vec());
        assert_eq!(published[0].2, StatusMsg::TYPE_NAME);
    }

    #[tokio::test]
    async fn test_remote_subscriber_registration() {
        let (context, _discovery, _srv_discovery, _transport) = test_context();

        context.register_remote_subscriber("@/a", StatusMsg::TYPE_NAME);
        assert!(
            context
                .registries()
                .remote_subscribers
                .has_subscriber("@/a", StatusMsg::TYPE_NAME)
        );

        context.remove_remote_subscriber("@/a", StatusMsg::TYPE_NAME);
        assert!(
            !context
                .registries()
                .remote_subscribers
                .has_subscriber("@/a", StatusMsg::TYPE_NAME)
        );
    }

    #[tokio::test]
    async fn test_isolated_contexts_have_distinct_process_ids() {
        let (first, _d1, _s1, _t1) = test_context();
        let (second, _d2, _s2, _t2) = test_context();

        assert_ne!(first.process_id(), second.process_id());
    }

    #[test]
    fn test_context_requires_runtime() {
        let (discovery, srv_discovery, transport) = crate::test_support::test_collaborators();

        let actual = TransportContext::new(
            discovery,
            srv_discovery,
            transport,
            ContextConfig::default(),
        );
        assert!(actual.is_err());
    }

    #[test]
    fn test_config_with_credentials() {
        let fixture = ContextConfig::new()
            .with_credentials(Credentials::new("weaver", "shuttle-key"));

        let actual = fixture.credentials.unwrap();
        assert_eq!(actual.username, "weaver");
    }
}
