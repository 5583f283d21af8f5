//! Recording fakes and fixture types shared by the engine's tests.

use crate::context::{ContextConfig, TransportContext};
use crate::descriptor::{MessagePublisher, ServicePublisher};
use crate::discovery::{Discovery, MessageDiscovery, ServiceDiscovery};
use crate::transport::Transport;
use crate::{PubSubError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use weft_core::{MessageType, NodeId, ProcessId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StatusMsg {
    pub value: i32,
}

impl MessageType for StatusMsg {
    const TYPE_NAME: &'static str = "weft.test.Status";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CommandMsg {
    pub name: String,
}

impl MessageType for CommandMsg {
    const TYPE_NAME: &'static str = "weft.test.Command";
}

/// The fields the fakes need from an advertisement record.
pub(crate) trait AdvertisementRecord: Clone + PartialEq + Send + Sync + 'static {
    fn key(&self) -> &str;
    fn node_id(&self) -> &NodeId;
    fn process_id(&self) -> &ProcessId;
}

impl AdvertisementRecord for MessagePublisher {
    fn key(&self) -> &str {
        &self.topic
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn process_id(&self) -> &ProcessId {
        &self.process_id
    }
}

impl AdvertisementRecord for ServicePublisher {
    fn key(&self) -> &str {
        &self.service
    }

    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn process_id(&self) -> &ProcessId {
        &self.process_id
    }
}

/// Discovery fake that records every call and serves seeded publishers.
pub(crate) struct RecordingDiscovery<P> {
    records: Mutex<Vec<P>>,
    seeded: Mutex<Vec<P>>,
    unadvertise_calls: Mutex<Vec<(String, NodeId)>>,
    discover_calls: Mutex<Vec<String>>,
    publisher_queries: Mutex<Vec<String>>,
    wait_for_init_calls: AtomicUsize,
    fail_advertise: AtomicBool,
    fail_discover: AtomicBool,
    fail_publishers: AtomicBool,
}

impl<P: AdvertisementRecord> RecordingDiscovery<P> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            seeded: Mutex::new(Vec::new()),
            unadvertise_calls: Mutex::new(Vec::new()),
            discover_calls: Mutex::new(Vec::new()),
            publisher_queries: Mutex::new(Vec::new()),
            wait_for_init_calls: AtomicUsize::new(0),
            fail_advertise: AtomicBool::new(false),
            fail_discover: AtomicBool::new(false),
            fail_publishers: AtomicBool::new(false),
        })
    }

    /// Make a remote publisher known without going through `advertise`
    pub fn seed_publisher(&self, publisher: P) {
        self.seeded.lock().push(publisher);
    }

    pub fn advertised(&self) -> Vec<P> {
        self.records.lock().clone()
    }

    pub fn unadvertised(&self) -> Vec<(String, NodeId)> {
        self.unadvertise_calls.lock().clone()
    }

    pub fn discovered(&self) -> Vec<String> {
        self.discover_calls.lock().clone()
    }

    pub fn publisher_queries(&self) -> Vec<String> {
        self.publisher_queries.lock().clone()
    }

    pub fn wait_for_init_calls(&self) -> usize {
        self.wait_for_init_calls.load(Ordering::SeqCst)
    }

    pub fn fail_advertise(&self, fail: bool) {
        self.fail_advertise.store(fail, Ordering::SeqCst);
    }

    pub fn fail_discover(&self, fail: bool) {
        self.fail_discover.store(fail, Ordering::SeqCst);
    }

    pub fn fail_publishers(&self, fail: bool) {
        self.fail_publishers.store(fail, Ordering::SeqCst);
    }

    fn known(&self) -> Vec<P> {
        let mut all = self.records.lock().clone();
        all.extend(self.seeded.lock().clone());
        all
    }
}

impl<P: AdvertisementRecord> Discovery for RecordingDiscovery<P> {
    type Publisher = P;

    fn advertise(&self, publisher: &P) -> Result<()> {
        if self.fail_advertise.load(Ordering::SeqCst) {
            return Err(PubSubError::discovery("advertise rejected"));
        }
        self.records.lock().push(publisher.clone());
        Ok(())
    }

    fn unadvertise(&self, topic: &str, node_id: &NodeId) -> Result<()> {
        self.unadvertise_calls
            .lock()
            .push((topic.to_string(), node_id.clone()));
        self.records
            .lock()
            .retain(|record| !(record.key() == topic && record.node_id() == node_id));
        Ok(())
    }

    fn discover(&self, topic: &str) -> Result<()> {
        if self.fail_discover.load(Ordering::SeqCst) {
            return Err(PubSubError::discovery("discover rejected"));
        }
        self.discover_calls.lock().push(topic.to_string());
        Ok(())
    }

    fn publishers(&self, topic: &str) -> Result<HashMap<ProcessId, Vec<P>>> {
        self.publisher_queries.lock().push(topic.to_string());
        if self.fail_publishers.load(Ordering::SeqCst) {
            return Err(PubSubError::discovery("publishers unavailable"));
        }

        let mut by_process: HashMap<ProcessId, Vec<P>> = HashMap::new();
        for record in self.known() {
            if record.key() == topic {
                by_process
                    .entry(record.process_id().clone())
                    .or_default()
                    .push(record);
            }
        }
        Ok(by_process)
    }

    fn publishers_by_node(&self, process_id: &ProcessId, node_id: &NodeId) -> Vec<P> {
        self.known()
            .into_iter()
            .filter(|record| record.process_id() == process_id && record.node_id() == node_id)
            .collect()
    }

    fn topic_list(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .known()
            .iter()
            .map(|record| record.key().to_string())
            .collect();
        names.into_iter().collect()
    }

    fn wait_for_init(&self) {
        self.wait_for_init_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Transport fake that records publishes, filters, and control sends.
pub(crate) struct RecordingTransport {
    data_address: String,
    control_address: String,
    published: Mutex<Vec<(String, Vec<u8>, String)>>,
    filters: Mutex<Vec<String>>,
    removed_filters: Mutex<Vec<String>>,
    control_sends: Mutex<Vec<(String, Vec<Vec<u8>>, Duration)>>,
    fail_publish: AtomicBool,
    fail_add_filter: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            data_address: "tcp://127.0.0.1:11001".to_string(),
            control_address: "tcp://127.0.0.1:11002".to_string(),
            published: Mutex::new(Vec::new()),
            filters: Mutex::new(Vec::new()),
            removed_filters: Mutex::new(Vec::new()),
            control_sends: Mutex::new(Vec::new()),
            fail_publish: AtomicBool::new(false),
            fail_add_filter: AtomicBool::new(false),
        })
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>, String)> {
        self.published.lock().clone()
    }

    pub fn has_filter(&self, topic: &str) -> bool {
        self.filters.lock().iter().any(|t| t == topic)
    }

    pub fn filters(&self) -> Vec<String> {
        self.filters.lock().clone()
    }

    pub fn removed_filters(&self) -> Vec<String> {
        self.removed_filters.lock().clone()
    }

    pub fn control_sends(&self) -> Vec<(String, Vec<Vec<u8>>, Duration)> {
        self.control_sends.lock().clone()
    }

    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn fail_add_filter(&self, fail: bool) {
        self.fail_add_filter.store(fail, Ordering::SeqCst);
    }
}

impl Transport for RecordingTransport {
    fn data_address(&self) -> String {
        self.data_address.clone()
    }

    fn control_address(&self) -> String {
        self.control_address.clone()
    }

    fn publish(&self, topic: &str, payload: &[u8], type_name: &str) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(PubSubError::transport("socket unavailable"));
        }
        self.published
            .lock()
            .push((topic.to_string(), payload.to_vec(), type_name.to_string()));
        Ok(())
    }

    fn add_filter(&self, topic: &str) -> Result<()> {
        if self.fail_add_filter.load(Ordering::SeqCst) {
            return Err(PubSubError::transport("cannot install filter"));
        }
        self.filters.lock().push(topic.to_string());
        Ok(())
    }

    fn remove_filter(&self, topic: &str) -> Result<()> {
        self.filters.lock().retain(|t| t != topic);
        self.removed_filters.lock().push(topic.to_string());
        Ok(())
    }

    fn send_control(&self, endpoint: &str, frames: &[Vec<u8>], linger: Duration) -> Result<()> {
        self.control_sends
            .lock()
            .push((endpoint.to_string(), frames.to_vec(), linger));
        Ok(())
    }
}

/// Build the collaborator set without a context
pub(crate) fn test_collaborators() -> (
    Arc<MessageDiscovery>,
    Arc<ServiceDiscovery>,
    Arc<dyn Transport>,
) {
    let discovery: Arc<RecordingDiscovery<MessagePublisher>> = RecordingDiscovery::new();
    let srv_discovery: Arc<RecordingDiscovery<ServicePublisher>> = RecordingDiscovery::new();
    let transport = RecordingTransport::new();
    (discovery, srv_discovery, transport)
}

/// Build an isolated context wired to recording fakes
pub(crate) fn test_context() -> (
    Arc<TransportContext>,
    Arc<RecordingDiscovery<MessagePublisher>>,
    Arc<RecordingDiscovery<ServicePublisher>>,
    Arc<RecordingTransport>,
) {
    let discovery: Arc<RecordingDiscovery<MessagePublisher>> = RecordingDiscovery::new();
    let srv_discovery: Arc<RecordingDiscovery<ServicePublisher>> = RecordingDiscovery::new();
    let transport = RecordingTransport::new();

    let context = TransportContext::new(
        discovery.clone(),
        srv_discovery.clone(),
        transport.clone(),
        ContextConfig::default(),
    )
    .expect("test context requires a Tokio runtime");

    (context, discovery, srv_discovery, transport)
}
