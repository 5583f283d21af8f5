//! Per-process registries of local subscription handlers, service repliers,
//! and remote subscriber interest.
//!
//! None of the stores synchronize independently; every operation runs under
//! the shared context lock held by the caller.

use std::collections::HashMap;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;
use weft_core::{GENERIC_MESSAGE_TYPE, HandlerId, Message, MessageInfo, MessageType, NodeId};

/// A registered local subscription callback.
///
/// Handlers expose their registered type name and a direct invocation hook;
/// the generic sentinel type matches any published type.
pub trait SubscriptionHandler: Send + Sync {
    /// Unique identity of this handler
    fn id(&self) -> &HandlerId;

    /// Node that owns this handler
    fn node_id(&self) -> &NodeId;

    /// Registered message type name, or the generic sentinel
    fn type_name(&self) -> &str;

    /// Invoke the callback with a message delivered in-process
    fn run_local_callback(&self, message: &dyn Message, info: &MessageInfo);
}

/// Subscription handler bound to a concrete message type.
pub struct TypedSubscriptionHandler<M, F> {
    id: HandlerId,
    node_id: NodeId,
    callback: F,
    _marker: PhantomData<fn(M)>,
}

impl<M, F> TypedSubscriptionHandler<M, F>
where
    M: MessageType,
    F: Fn(&M, &MessageInfo) + Send + Sync,
{
    /// Create a typed handler owned by the given node
    pub fn new(node_id: NodeId, callback: F) -> Self {
        Self {
            id: HandlerId::generate(),
            node_id,
            callback,
            _marker: PhantomData,
        }
    }
}

impl<M, F> SubscriptionHandler for TypedSubscriptionHandler<M, F>
where
    M: MessageType,
    F: Fn(&M, &MessageInfo) + Send + Sync,
{
    fn id(&self) -> &HandlerId {
        &self.id
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn type_name(&self) -> &str {
        M::TYPE_NAME
    }

    fn run_local_callback(&self, message: &dyn Message, info: &MessageInfo) {
        match message.as_any().downcast_ref::<M>() {
            Some(typed) => (self.callback)(typed, info),
            None => warn!(
                "Handler {} skipped message on [{}]: type name [{}] matched but the \
                 concrete type did not",
                self.id,
                info.topic(),
                message.type_name()
            ),
        }
    }
}

/// Subscription handler that accepts any message type.
pub struct RawSubscriptionHandler<F> {
    id: HandlerId,
    node_id: NodeId,
    callback: F,
}

impl<F> RawSubscriptionHandler<F>
where
    F: Fn(&dyn Message, &MessageInfo) + Send + Sync,
{
    /// Create a generic handler owned by the given node
    pub fn new(node_id: NodeId, callback: F) -> Self {
        Self {
            id: HandlerId::generate(),
            node_id,
            callback,
        }
    }
}

impl<F> SubscriptionHandler for RawSubscriptionHandler<F>
where
    F: Fn(&dyn Message, &MessageInfo) + Send + Sync,
{
    fn id(&self) -> &HandlerId {
        &self.id
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn type_name(&self) -> &str {
        GENERIC_MESSAGE_TYPE
    }

    fn run_local_callback(&self, message: &dyn Message, info: &MessageInfo) {
        (self.callback)(message, info)
    }
}

/// A registered service replier.
///
/// Only the advertise and unadvertise bookkeeping lives in this crate; the
/// reply path itself belongs to the transport collaborators.
pub trait ServiceReplier: Send + Sync {
    /// Unique identity of this replier
    fn id(&self) -> &HandlerId;

    /// Node that owns this replier
    fn node_id(&self) -> &NodeId;

    /// Registered request type name
    fn request_type_name(&self) -> &str;

    /// Registered response type name
    fn response_type_name(&self) -> &str;
}

/// Replier record registered by `Node::advertise_service`.
pub struct RegisteredReplier {
    id: HandlerId,
    node_id: NodeId,
    request_type_name: String,
    response_type_name: String,
}

impl RegisteredReplier {
    /// Create a replier record owned by the given node
    pub fn new(
        node_id: NodeId,
        request_type_name: impl Into<String>,
        response_type_name: impl Into<String>,
    ) -> Self {
        Self {
            id: HandlerId::generate(),
            node_id,
            request_type_name: request_type_name.into(),
            response_type_name: response_type_name.into(),
        }
    }
}

impl ServiceReplier for RegisteredReplier {
    fn id(&self) -> &HandlerId {
        &self.id
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn request_type_name(&self) -> &str {
        &self.request_type_name
    }

    fn response_type_name(&self) -> &str {
        &self.response_type_name
    }
}

/// Handlers owned by one topic, grouped by owning node.
pub type HandlersByNode<H> = HashMap<NodeId, HashMap<HandlerId, Arc<H>>>;

/// Registry of handlers keyed by fully-qualified topic, owning node, and
/// handler identity.
pub struct HandlerStore<H: ?Sized> {
    handlers: HashMap<String, HandlersByNode<H>>,
}

/// Store of local subscription handlers.
pub type SubscriptionStore = HandlerStore<dyn SubscriptionHandler>;

/// Store of service repliers.
pub type ReplierStore = HandlerStore<dyn ServiceReplier>;

impl<H: ?Sized> HandlerStore<H> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under a fully-qualified topic
    pub fn add_handler(
        &mut self,
        topic: impl Into<String>,
        node_id: NodeId,
        handler_id: HandlerId,
        handler: Arc<H>,
    ) {
        self.handlers
            .entry(topic.into())
            .or_default()
            .entry(node_id)
            .or_default()
            .insert(handler_id, handler);
    }

    /// Remove a single handler, pruning empty branches
    pub fn remove_handler(&mut self, topic: &str, node_id: &NodeId, handler_id: &HandlerId) {
        if let Some(nodes) = self.handlers.get_mut(topic) {
            if let Some(handlers) = nodes.get_mut(node_id) {
                handlers.remove(handler_id);
                if handlers.is_empty() {
                    nodes.remove(node_id);
                }
            }
            if nodes.is_empty() {
                self.handlers.remove(topic);
            }
        }
    }

    /// Remove every handler a node registered for a topic
    pub fn remove_handlers_for_node(&mut self, topic: &str, node_id: &NodeId) {
        if let Some(nodes) = self.handlers.get_mut(topic) {
            nodes.remove(node_id);
            if nodes.is_empty() {
                self.handlers.remove(topic);
            }
        }
    }

    /// Check whether any handler is registered for a topic
    pub fn has_handlers_for_topic(&self, topic: &str) -> bool {
        self.handlers
            .get(topic)
            .is_some_and(|nodes| nodes.values().any(|handlers| !handlers.is_empty()))
    }

    /// Snapshot the per-node handler map for a topic
    pub fn handlers_for_topic(&self, topic: &str) -> HandlersByNode<H> {
        self.handlers.get(topic).cloned().unwrap_or_default()
    }
}

impl<H: ?Sized> Default for HandlerStore<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerStore<dyn SubscriptionHandler> {
    /// Find any one handler whose registered type matches the given type
    /// name or is the generic sentinel
    pub fn first_handler(
        &self,
        topic: &str,
        type_name: &str,
    ) -> Option<Arc<dyn SubscriptionHandler>> {
        let nodes = self.handlers.get(topic)?;
        nodes
            .values()
            .flat_map(|handlers| handlers.values())
            .find(|handler| {
                handler.type_name() == type_name || handler.type_name() == GENERIC_MESSAGE_TYPE
            })
            .cloned()
    }
}

/// Index of remote interest per fully-qualified topic and type name.
#[derive(Debug, Default)]
pub struct RemoteSubscribers {
    entries: HashSet<(String, String)>,
}

impl RemoteSubscribers {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record remote interest in a topic with the given type name
    pub fn insert(&mut self, topic: impl Into<String>, type_name: impl Into<String>) {
        self.entries.insert((topic.into(), type_name.into()));
    }

    /// Remove remote interest in a topic with the given type name
    pub fn remove(&mut self, topic: &str, type_name: &str) {
        self.entries
            .retain(|(t, ty)| !(t == topic && ty == type_name));
    }

    /// Remove all remote interest in a topic
    pub fn remove_topic(&mut self, topic: &str) {
        self.entries.retain(|(t, _)| t != topic);
    }

    /// Check whether a remote subscriber matches the topic and type name.
    ///
    /// A remote subscriber registered with the generic sentinel matches any
    /// published type.
    pub fn has_subscriber(&self, topic: &str, type_name: &str) -> bool {
        self.entries
            .iter()
            .any(|(t, ty)| t == topic && (ty == type_name || ty == GENERIC_MESSAGE_TYPE))
    }
}
