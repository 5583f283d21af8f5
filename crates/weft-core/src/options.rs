use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable naming the partition a node participates in.
pub const PARTITION_ENV: &str = "WEFT_PARTITION";

/// Environment variable enabling verbose diagnostics.
pub const VERBOSE_ENV: &str = "WEFT_VERBOSE";

/// Configuration for a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters, Default)]
#[setters(strip_option, into)]
pub struct NodeOptions {
    /// Partition scoping all topics and services of this node
    pub partition: String,
    /// Default namespace prepended to relative topic names
    pub namespace: String,
    /// Enable verbose diagnostics
    pub verbose: bool,
}

impl NodeOptions {
    /// Create options with an empty partition and namespace
    pub fn new() -> Self {
        Self::default()
    }

    /// Create options seeded from the process environment
    ///
    /// Reads the partition from `WEFT_PARTITION` and verbosity from
    /// `WEFT_VERBOSE` (set to `1` to enable).
    pub fn from_env() -> Self {
        Self {
            partition: std::env::var(PARTITION_ENV).unwrap_or_default(),
            namespace: String::new(),
            verbose: std::env::var(VERBOSE_ENV).is_ok_and(|v| v == "1"),
        }
    }
}

/// Options applied when advertising a topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters, Default)]
#[setters(strip_option, into)]
pub struct AdvertiseOptions {
    /// Maximum number of messages per second dispatched by the publisher.
    /// `None` (or a non-positive value) disables throttling.
    pub msgs_per_sec: Option<f64>,
}

impl AdvertiseOptions {
    /// Create unthrottled advertise options
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether publication throttling is enabled
    pub fn throttled(&self) -> bool {
        self.msgs_per_sec.is_some_and(|rate| rate > 0.0)
    }

    /// Get the minimum period between dispatched messages
    pub fn period(&self) -> Option<Duration> {
        self.msgs_per_sec
            .filter(|rate| *rate > 0.0)
            .map(|rate| Duration::from_secs_f64(1.0 / rate))
    }
}

/// Options applied when advertising a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AdvertiseServiceOptions {}

impl AdvertiseServiceOptions {
    /// Create default service advertise options
    pub fn new() -> Self {
        Self::default()
    }
}

/// Credential pair handed to the transport collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(into)]
pub struct Credentials {
    /// Account name presented to peers
    pub username: String,
    /// Shared access key presented to peers
    pub access_key: String,
}

impl Credentials {
    /// Create a credential pair
    pub fn new(username: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            access_key: access_key.into(),
        }
    }
}
