//! User-facing node facade.
//!
//! A node advertises the topics it publishes, subscribes to the topics it
//! consumes, and advertises the services it answers. Destroying a node
//! unsubscribes it from every topic and revokes its services; publisher
//! handles it created stay live until their own last clone drops.

use crate::context::TransportContext;
use crate::descriptor::{MessagePublisher, ServicePublisher};
use crate::publisher::Publisher;
use crate::registry::{
    RawSubscriptionHandler, RegisteredReplier, ServiceReplier, SubscriptionHandler,
    TypedSubscriptionHandler,
};
use crate::transport::{CONTROL_LINGER, EndConnectionFrame};
use crate::{PubSubError, Result};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use weft_core::{
    AdvertiseOptions, AdvertiseServiceOptions, Message, MessageInfo, MessageType, NodeId,
    NodeOptions, fully_qualified, partition_of, strip_partition,
};

/// A participant in the messaging fabric.
pub struct Node {
    id: NodeId,
    options: NodeOptions,
    context: Arc<TransportContext>,
    subscribed_topics: Mutex<HashSet<String>>,
    advertised_services: Mutex<HashSet<String>>,
}

impl Node {
    /// Create a node participating through the given shared context
    pub fn new(context: Arc<TransportContext>, options: NodeOptions) -> Self {
        let id = NodeId::generate();
        debug!("Created node {} in partition [{}]", id, options.partition);

        Self {
            id,
            options,
            context,
            subscribed_topics: Mutex::new(HashSet::new()),
            advertised_services: Mutex::new(HashSet::new()),
        }
    }

    /// Get this node's identity
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Get this node's options
    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    /// Get the shared context this node participates through
    pub fn context(&self) -> &Arc<TransportContext> {
        &self.context
    }

    fn resolve(&self, topic: &str) -> Result<String> {
        fully_qualified(&self.options.partition, &self.options.namespace, topic)
            .map_err(Into::into)
    }

    /// Advertise a topic bound to the message type `M`
    pub fn advertise<M: MessageType>(
        &self,
        topic: &str,
        options: AdvertiseOptions,
    ) -> Result<Publisher> {
        self.advertise_with_type(topic, M::TYPE_NAME, options)
    }

    /// Advertise a topic bound to an explicit message type name.
    ///
    /// Each `(node, topic)` pair may be advertised once, with a single type.
    /// Use separate nodes to publish the same topic with different types.
    pub fn advertise_with_type(
        &self,
        topic: &str,
        type_name: &str,
        options: AdvertiseOptions,
    ) -> Result<Publisher> {
        let fq_topic = self.resolve(topic).inspect_err(|e| {
            warn!("Cannot advertise [{topic}]: {e}");
        })?;

        if self.advertised_fq_topics().contains(&fq_topic) {
            warn!(
                "Topic [{topic}] is already advertised by this node; use a separate node \
                 to advertise it with another type"
            );
            return Err(PubSubError::already_advertised(fq_topic));
        }

        let descriptor = MessagePublisher::new(
            fq_topic.clone(),
            self.context.data_address(),
            self.context.control_address(),
            self.context.process_id().clone(),
            self.id.clone(),
            type_name,
            options,
        );

        {
            let _registries = self.context.registries();
            self.context
                .msg_discovery()
                .advertise(&descriptor)
                .inspect_err(|e| {
                    error!(
                        "Error advertising topic [{fq_topic}]: {e}. Is the discovery \
                         service running?"
                    );
                })?;
        }

        info!("Advertised [{fq_topic}] with type [{type_name}]");
        Ok(Publisher::new(descriptor, Arc::clone(&self.context)))
    }

    /// Subscribe to a topic with a callback bound to the message type `M`
    pub fn subscribe<M, F>(&self, topic: &str, callback: F) -> Result<()>
    where
        M: MessageType,
        F: Fn(&M, &MessageInfo) + Send + Sync + 'static,
    {
        let fq_topic = self.resolve(topic).inspect_err(|e| {
            warn!("Cannot subscribe to [{topic}]: {e}");
        })?;
        let handler: Arc<dyn SubscriptionHandler> =
            Arc::new(TypedSubscriptionHandler::new(self.id.clone(), callback));
        self.subscribe_handler(fq_topic, handler)
    }

    /// Subscribe to a topic with a callback accepting any message type
    pub fn subscribe_raw<F>(&self, topic: &str, callback: F) -> Result<()>
    where
        F: Fn(&dyn Message, &MessageInfo) + Send + Sync + 'static,
    {
        let fq_topic = self.resolve(topic).inspect_err(|e| {
            warn!("Cannot subscribe to [{topic}]: {e}");
        })?;
        let handler: Arc<dyn SubscriptionHandler> =
            Arc::new(RawSubscriptionHandler::new(self.id.clone(), callback));
        self.subscribe_handler(fq_topic, handler)
    }

    fn subscribe_handler(
        &self,
        fq_topic: String,
        handler: Arc<dyn SubscriptionHandler>,
    ) -> Result<()> {
        let handler_id = handler.id().clone();

        {
            let mut registries = self.context.registries();
            let first_for_topic = !registries
                .local_subscriptions
                .has_handlers_for_topic(&fq_topic);

            registries.local_subscriptions.add_handler(
                &fq_topic,
                self.id.clone(),
                handler_id.clone(),
                handler,
            );

            if first_for_topic {
                if let Err(e) = self.context.transport().add_filter(&fq_topic) {
                    error!("Error installing the subscription filter for [{fq_topic}]: {e}");
                    registries
                        .local_subscriptions
                        .remove_handler(&fq_topic, &self.id, &handler_id);
                    return Err(e);
                }
            }
        }

        self.subscribed_topics.lock().insert(fq_topic.clone());

        self.context
            .msg_discovery()
            .discover(&fq_topic)
            .inspect_err(|e| {
                error!(
                    "Error discovering topic [{fq_topic}]: {e}. Is the discovery service \
                     running?"
                );
            })?;

        info!("Subscribed to [{fq_topic}]");
        Ok(())
    }

    /// Unsubscribe this node from a topic.
    ///
    /// Removes every handler the node registered for the topic. When the
    /// last handler in the process disappears, the transport filter is
    /// removed and every known publisher is sent a best-effort
    /// end-of-subscription control message.
    pub fn unsubscribe(&self, topic: &str) -> Result<()> {
        let fq_topic = self.resolve(topic).inspect_err(|e| {
            warn!("Cannot unsubscribe from [{topic}]: {e}");
        })?;

        {
            let mut registries = self.context.registries();
            registries
                .local_subscriptions
                .remove_handlers_for_node(&fq_topic, &self.id);

            if !registries
                .local_subscriptions
                .has_handlers_for_topic(&fq_topic)
            {
                if let Err(e) = self.context.transport().remove_filter(&fq_topic) {
                    warn!("Error removing the subscription filter for [{fq_topic}]: {e}");
                }
            }
        }

        self.subscribed_topics.lock().remove(&fq_topic);

        // Tell the publishers this subscriber is gone.
        let publishers = self
            .context
            .msg_discovery()
            .publishers(&fq_topic)
            .inspect_err(|e| {
                error!("Error resolving the publishers of [{fq_topic}]: {e}");
            })?;

        let frames = EndConnectionFrame::new(
            fq_topic.clone(),
            self.context.data_address(),
            self.id.clone(),
        )
        .frames();

        for publisher in publishers.values().flatten() {
            if let Err(e) = self.context.transport().send_control(
                &publisher.control_address,
                &frames,
                CONTROL_LINGER,
            ) {
                debug!(
                    "End-connection notification to [{}] failed: {e}",
                    publisher.control_address
                );
            }
        }

        info!("Unsubscribed from [{fq_topic}]");
        Ok(())
    }

    /// Advertise a service answered by this node.
    ///
    /// Only the advertise and unadvertise bookkeeping is handled here; the
    /// reply path belongs to the transport collaborators.
    pub fn advertise_service(
        &self,
        service: &str,
        request_type_name: &str,
        response_type_name: &str,
        options: AdvertiseServiceOptions,
    ) -> Result<()> {
        let fq_service = self.resolve(service).inspect_err(|e| {
            warn!("Cannot advertise service [{service}]: {e}");
        })?;

        if self.advertised_services.lock().contains(&fq_service) {
            warn!("Service [{service}] is already advertised by this node");
            return Err(PubSubError::already_advertised(fq_service));
        }

        let replier = Arc::new(RegisteredReplier::new(
            self.id.clone(),
            request_type_name,
            response_type_name,
        ));
        let replier_id = replier.id().clone();

        let descriptor = ServicePublisher::new(
            fq_service.clone(),
            self.context.data_address(),
            self.context.process_id().clone(),
            self.id.clone(),
            request_type_name,
            response_type_name,
            options,
        );

        {
            let mut registries = self.context.registries();
            registries.repliers.add_handler(
                &fq_service,
                self.id.clone(),
                replier_id.clone(),
                replier,
            );

            if let Err(e) = self.context.srv_discovery().advertise(&descriptor) {
                error!(
                    "Error advertising service [{fq_service}]: {e}. Is the discovery \
                     service running?"
                );
                registries
                    .repliers
                    .remove_handler(&fq_service, &self.id, &replier_id);
                return Err(e);
            }
        }

        self.advertised_services.lock().insert(fq_service.clone());
        info!("Advertised service [{fq_service}]");
        Ok(())
    }

    /// Revoke a service advertised by this node
    pub fn unadvertise_service(&self, service: &str) -> Result<()> {
        let fq_service = self.resolve(service).inspect_err(|e| {
            warn!("Cannot unadvertise service [{service}]: {e}");
        })?;

        self.advertised_services.lock().remove(&fq_service);

        {
            let mut registries = self.context.registries();
            registries
                .repliers
                .remove_handlers_for_node(&fq_service, &self.id);

            self.context
                .srv_discovery()
                .unadvertise(&fq_service, &self.id)
                .inspect_err(|e| {
                    error!("Error unadvertising service [{fq_service}]: {e}");
                })?;
        }

        info!("Unadvertised service [{fq_service}]");
        Ok(())
    }

    /// List the topics this node advertises, without partition prefixes
    pub fn advertised_topics(&self) -> Vec<String> {
        self.advertised_fq_topics()
            .iter()
            .map(|topic| strip_partition(topic).to_string())
            .collect()
    }

    fn advertised_fq_topics(&self) -> BTreeSet<String> {
        let _registries = self.context.registries();
        self.context
            .msg_discovery()
            .publishers_by_node(self.context.process_id(), &self.id)
            .into_iter()
            .map(|publisher| publisher.topic)
            .collect()
    }

    /// List the topics this node subscribes to, without partition prefixes
    pub fn subscribed_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .subscribed_topics
            .lock()
            .iter()
            .map(|topic| strip_partition(topic).to_string())
            .collect();
        topics.sort();
        topics
    }

    /// List the services this node advertises, without partition prefixes
    pub fn advertised_services(&self) -> Vec<String> {
        let mut services: Vec<String> = self
            .advertised_services
            .lock()
            .iter()
            .map(|service| strip_partition(service).to_string())
            .collect();
        services.sort();
        services
    }

    /// List every topic known to discovery within this node's partition
    pub fn topic_list(&self) -> Vec<String> {
        Self::names_in_partition(
            self.context.msg_discovery().topic_list(),
            &self.options.partition,
        )
    }

    /// List every service known to discovery within this node's partition
    pub fn service_list(&self) -> Vec<String> {
        Self::names_in_partition(
            self.context.srv_discovery().topic_list(),
            &self.options.partition,
        )
    }

    fn names_in_partition(all_names: Vec<String>, partition: &str) -> Vec<String> {
        all_names
            .into_iter()
            .filter(|name| partition_of(name) == partition)
            .map(|name| strip_partition(&name).to_string())
            .collect()
    }

    /// Get the known publishers of a topic, deduplicated across processes.
    ///
    /// Blocks until discovery has finished its initialization handshake.
    pub fn topic_info(&self, topic: &str) -> Result<Vec<MessagePublisher>> {
        self.context.msg_discovery().wait_for_init();

        let fq_topic = self.resolve(topic)?;

        let _registries = self.context.registries();
        let by_process = self.context.msg_discovery().publishers(&fq_topic)?;

        let mut publishers: Vec<MessagePublisher> = Vec::new();
        for publisher in by_process.into_values().flatten() {
            if !publishers.contains(&publisher) {
                publishers.push(publisher);
            }
        }

        Ok(publishers)
    }

    /// Get the known repliers of a service, deduplicated across processes.
    ///
    /// Blocks until discovery has finished its initialization handshake.
    pub fn service_info(&self, service: &str) -> Result<Vec<ServicePublisher>> {
        self.context.srv_discovery().wait_for_init();

        let fq_service = self.resolve(service)?;

        let _registries = self.context.registries();
        let by_process = self.context.srv_discovery().publishers(&fq_service)?;

        let mut publishers: Vec<ServicePublisher> = Vec::new();
        for publisher in by_process.into_values().flatten() {
            if !publishers.contains(&publisher) {
                publishers.push(publisher);
            }
        }

        Ok(publishers)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        for topic in self.subscribed_topics() {
            if let Err(e) = self.unsubscribe(&topic) {
                error!("Error unsubscribing from [{topic}] on node teardown: {e}");
            }
        }
        debug_assert!(self.subscribed_topics.lock().is_empty());

        for service in self.advertised_services() {
            if let Err(e) = self.unadvertise_service(&service) {
                error!("Error unadvertising service [{service}] on node teardown: {e}");
            }
        }
        debug_assert!(self.advertised_services.lock().is_empty());

        debug!("Destroyed node {}", self.id);
    }
}
