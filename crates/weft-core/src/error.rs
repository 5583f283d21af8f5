use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the weft messaging fabric
#[derive(Error, Debug)]
pub enum Error {
    /// Topic or service name errors
    #[error("Topic error: {message}")]
    Topic { message: String },

    /// Serialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Message decoding errors
    #[error("Decode error for type [{type_name}]: {message}")]
    Decode { type_name: String, message: String },
}

impl Error {
    /// Create a new topic error
    pub fn topic(message: impl Into<String>) -> Self {
        Self::Topic {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}
