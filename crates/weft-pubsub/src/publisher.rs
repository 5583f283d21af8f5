//! Per-advertisement publisher handle and the publish state machine.
//!
//! A handle is cheap to clone; all clones share one advertisement. When the
//! last clone drops, the discovery service is told to unadvertise the
//! `(topic, node)` pair, on every teardown path.

use crate::context::TransportContext;
use crate::descriptor::MessagePublisher;
use crate::registry::{HandlersByNode, SubscriptionHandler};
use crate::{PubSubError, Result};
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, warn};
use weft_core::{
    AdvertiseOptions, GENERIC_MESSAGE_TYPE, Message, MessageInfo, NodeId, ProcessId,
    strip_partition,
};

struct ThrottleState {
    last_emit: Option<Instant>,
}

struct PublisherShared {
    descriptor: MessagePublisher,
    topic_without_partition: String,
    period: Option<Duration>,
    throttle: Mutex<ThrottleState>,
    context: Option<Arc<TransportContext>>,
}

impl Drop for PublisherShared {
    fn drop(&mut self) {
        let Some(context) = &self.context else { return };
        if self.descriptor.topic.is_empty() {
            return;
        }

        // Discovery side-effects stay serialized behind the registry lock.
        let _registries = context.registries();
        if let Err(e) = context
            .msg_discovery()
            .unadvertise(&self.descriptor.topic, &self.descriptor.node_id)
        {
            error!(
                "Error unadvertising topic [{}] on teardown: {}",
                self.descriptor.topic, e
            );
        }
    }
}

/// Handle to one topic advertisement.
///
/// Created by [`Node::advertise`](crate::Node::advertise). A
/// default-constructed handle is invalid and every publish operation on it
/// fails.
#[derive(Clone)]
pub struct Publisher {
    shared: Arc<PublisherShared>,
}

impl Publisher {
    pub(crate) fn new(descriptor: MessagePublisher, context: Arc<TransportContext>) -> Self {
        let topic_without_partition = strip_partition(&descriptor.topic).to_string();
        let period = descriptor.options.period();

        Self {
            shared: Arc::new(PublisherShared {
                descriptor,
                topic_without_partition,
                period,
                throttle: Mutex::new(ThrottleState { last_emit: None }),
                context: Some(context),
            }),
        }
    }

    /// Create a handle that advertises nothing and rejects every publish
    pub fn invalid() -> Self {
        Self {
            shared: Arc::new(PublisherShared {
                descriptor: MessagePublisher::new(
                    "",
                    "",
                    "",
                    ProcessId::new(""),
                    NodeId::new(""),
                    "",
                    AdvertiseOptions::new(),
                ),
                topic_without_partition: String::new(),
                period: None,
                throttle: Mutex::new(ThrottleState { last_emit: None }),
                context: None,
            }),
        }
    }

    /// Check whether this handle holds a live advertisement
    pub fn valid(&self) -> bool {
        !self.shared.descriptor.topic.is_empty()
    }

    /// Get the advertisement record
    pub fn descriptor(&self) -> &MessagePublisher {
        &self.shared.descriptor
    }

    /// Get the advertised topic without its partition prefix
    pub fn topic(&self) -> &str {
        &self.shared.topic_without_partition
    }

    /// Check whether any local or remote subscriber currently matches this
    /// advertisement's topic and type
    pub fn has_connections(&self) -> bool {
        let Some(context) = &self.shared.context else {
            return false;
        };
        if !self.valid() {
            return false;
        }

        let registries = context.registries();
        let descriptor = &self.shared.descriptor;
        registries
            .local_subscriptions
            .first_handler(&descriptor.topic, &descriptor.type_name)
            .is_some()
            || registries
                .remote_subscribers
                .has_subscriber(&descriptor.topic, &descriptor.type_name)
    }

    /// Publish a message.
    ///
    /// Returns before delivery: the message is deep-copied and handed to the
    /// dispatch queue, which fans out to local handlers and then performs the
    /// remote send. Transport errors in that stage are logged, never
    /// surfaced. A throttled drop and an absence of subscribers are both
    /// successful no-ops.
    pub fn publish(&self, message: &dyn Message) -> Result<()> {
        self.precheck(message)?;

        if !self.update_throttling() {
            // Dropped by the publication rate limit, not an error.
            return Ok(());
        }

        let Some(context) = self.shared.context.clone() else {
            return Err(PubSubError::InvalidPublisher);
        };

        let (has_local, handlers, has_remote) =
            self.check_subscribers(&context, message.type_name());
        if !has_local && !has_remote {
            return Ok(());
        }

        // The caller may mutate or drop its message as soon as this returns,
        // so the dispatch stage works on an exclusive copy.
        let message_copy = message.clone_message();
        let shared = Arc::clone(&self.shared);
        let worker_context = Arc::clone(&context);

        context.dispatcher().enqueue(move || {
            if has_local {
                Self::send_to_local_subscribers(
                    &shared.topic_without_partition,
                    &handlers,
                    message_copy.as_ref(),
                );
            }
            if has_remote {
                Self::send_to_remote_subscribers(
                    &worker_context,
                    &shared.descriptor.topic,
                    message_copy.as_ref(),
                );
            }
        })
    }

    /// Publish a message, transferring its ownership to a detached worker.
    ///
    /// On an early return (invalid handle, type mismatch, throttled drop, no
    /// subscribers) the callback runs synchronously and ownership returns to
    /// the caller immediately; the flag is `false` only for the failure
    /// cases. Otherwise the worker fans out locally, performs the remote
    /// send, and invokes the callback with the message and the remote-send
    /// outcome (`true` when only local subscribers exist).
    pub fn publish_with_callback<F>(&self, message: Box<dyn Message>, callback: F) -> Result<()>
    where
        F: FnOnce(Box<dyn Message>, bool) + Send + 'static,
    {
        if let Err(e) = self.precheck(message.as_ref()) {
            callback(message, false);
            return Err(e);
        }

        if !self.update_throttling() {
            callback(message, true);
            return Ok(());
        }

        let Some(context) = self.shared.context.clone() else {
            callback(message, false);
            return Err(PubSubError::InvalidPublisher);
        };

        let (has_local, handlers, has_remote) =
            self.check_subscribers(&context, message.type_name());
        if !has_local && !has_remote {
            callback(message, true);
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let worker_context = Arc::clone(&context);

        context.runtime().spawn_blocking(move || {
            if has_local {
                Self::send_to_local_subscribers(
                    &shared.topic_without_partition,
                    &handlers,
                    message.as_ref(),
                );
            }

            let mut result = true;
            if has_remote {
                result = Self::send_to_remote_subscribers(
                    &worker_context,
                    &shared.descriptor.topic,
                    message.as_ref(),
                );
            }

            callback(message, result);
        });

        Ok(())
    }

    fn precheck(&self, message: &dyn Message) -> Result<()> {
        if !self.valid() {
            return Err(PubSubError::InvalidPublisher);
        }

        let advertised = self.shared.descriptor.type_name.as_str();
        let published = message.type_name();
        if advertised != published {
            warn!(
                "Type mismatch on [{}]: advertised [{advertised}], published [{published}]",
                self.shared.descriptor.topic
            );
            return Err(PubSubError::type_mismatch(advertised, published));
        }

        Ok(())
    }

    /// Apply the publication rate limit against a monotonic clock.
    ///
    /// The gate compares against the last emit time, so one immediate
    /// dispatch can precede a throttled burst. A dropped message does not
    /// advance the emit time.
    fn update_throttling(&self) -> bool {
        let Some(period) = self.shared.period else {
            return true;
        };

        let mut state = self.shared.throttle.lock();
        let now = Instant::now();
        if let Some(last_emit) = state.last_emit {
            if now.duration_since(last_emit) < period {
                return false;
            }
        }

        state.last_emit = Some(now);
        true
    }

    fn check_subscribers(
        &self,
        context: &TransportContext,
        type_name: &str,
    ) -> (bool, HandlersByNode<dyn SubscriptionHandler>, bool) {
        let registries = context.registries();
        let topic = &self.shared.descriptor.topic;

        let handlers = registries.local_subscriptions.handlers_for_topic(topic);
        let has_local = !handlers.is_empty();
        let has_remote = registries.remote_subscribers.has_subscriber(topic, type_name);

        (has_local, handlers, has_remote)
    }

    fn send_to_local_subscribers(
        topic: &str,
        handlers: &HandlersByNode<dyn SubscriptionHandler>,
        message: &dyn Message,
    ) {
        let info = MessageInfo::new(topic, message.type_name());

        for node_handlers in handlers.values() {
            for handler in node_handlers.values() {
                if handler.type_name() != GENERIC_MESSAGE_TYPE
                    && handler.type_name() != message.type_name()
                {
                    continue;
                }

                // Handler faults are isolated; one failing callback must not
                // prevent the others from running.
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    handler.run_local_callback(message, &info);
                }));
                if outcome.is_err() {
                    error!(
                        "Subscription handler {} panicked on [{}]",
                        handler.id(),
                        info.topic()
                    );
                }
            }
        }
    }

    fn send_to_remote_subscribers(
        context: &TransportContext,
        topic: &str,
        message: &dyn Message,
    ) -> bool {
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Error serializing message on [{topic}]: {e}");
                return false;
            }
        };

        match context.publish(topic, &payload, message.type_name()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Remote publish on [{topic}] failed: {e}");
                false
            }
        }
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::invalid()
    }
}
