use thiserror::Error;

use flow_types::StreamName;

/// Errors from the schema registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("stream not configured: {0}")]
    StreamNotFound(StreamName),

    #[error("no stream configuration has been set")]
    ConfigurationNotFound,

    #[error("invalid stream definition: {0}")]
    InvalidStream(#[from] flow_types::TypeError),

    /// The stored schema is valid JSON but not a usable JSON schema.
    #[error("schema for stream {stream} does not compile: {reason}")]
    InvalidSchema { stream: StreamName, reason: String },

    #[error("store error: {0}")]
    Store(#[from] flow_store::StoreError),
}

pub type SchemaResult<T> = Result<T, SchemaError>;
