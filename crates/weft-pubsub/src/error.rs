use thiserror::Error;

/// Result type for pub-sub operations
pub type Result<T> = std::result::Result<T, PubSubError>;

/// Errors that can occur in the pub-sub routing engine
#[derive(Error, Debug)]
pub enum PubSubError {
    /// Topic or service name errors
    #[error("Name error: {source}")]
    Name {
        #[from]
        source: weft_core::Error,
    },

    /// Operation attempted on a default-constructed publisher handle
    #[error("Publisher is not valid")]
    InvalidPublisher,

    /// Published message type does not match the advertised type
    #[error("Type mismatch: advertised [{advertised}], published [{published}]")]
    TypeMismatch {
        advertised: String,
        published: String,
    },

    /// The node already advertises this fully-qualified name
    #[error("Name [{topic}] is already advertised by this node")]
    AlreadyAdvertised { topic: String },

    /// Discovery collaborator errors
    #[error("Discovery error: {message}")]
    Discovery { message: String },

    /// Transport collaborator errors
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Serialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Dispatch queue errors
    #[error("Dispatch error: {message}")]
    Dispatch { message: String },

    /// Signal handling errors
    #[error("Signal error: {message}")]
    Signal { message: String },

    /// Generic errors from collaborator implementations
    #[error("External error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl PubSubError {
    /// Create a new type mismatch error
    pub fn type_mismatch(advertised: impl Into<String>, published: impl Into<String>) -> Self {
        Self::TypeMismatch {
            advertised: advertised.into(),
            published: published.into(),
        }
    }

    /// Create a new duplicate-advertisement error
    pub fn already_advertised(topic: impl Into<String>) -> Self {
        Self::AlreadyAdvertised {
            topic: topic.into(),
        }
    }

    /// Create a new discovery error
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new dispatch error
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Create a new signal handling error
    pub fn signal(message: impl Into<String>) -> Self {
        Self::Signal {
            message: message.into(),
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Name { .. } => "name",
            Self::InvalidPublisher => "invalid_publisher",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::AlreadyAdvertised { .. } => "already_advertised",
            Self::Discovery { .. } => "discovery",
            Self::Transport { .. } => "transport",
            Self::Serialization { .. } => "serialization",
            Self::Dispatch { .. } => "dispatch",
            Self::Signal { .. } => "signal",
            Self::External { .. } => "external",
        }
    }
}
