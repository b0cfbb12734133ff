use thiserror::Error;

use flow_schema::Violation;
use flow_types::{DocumentId, StreamName};

/// Errors from document storage.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A document of the batch failed its stream schema. Nothing from the
    /// batch was persisted.
    #[error("document {index} failed validation with {} violation(s)", violations.len())]
    Validation {
        index: usize,
        violations: Vec<Violation>,
    },

    #[error("document {id} not found in stream {stream}")]
    DocumentNotFound { stream: StreamName, id: DocumentId },

    /// An index entry points at a document that does not exist.
    #[error("index entry {key} points at missing document {pointer}")]
    DanglingIndex { key: String, pointer: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("schema error: {0}")]
    Schema(#[from] flow_schema::SchemaError),

    #[error("sequence error: {0}")]
    Sequence(#[from] flow_sequence::SequenceError),

    #[error("store error: {0}")]
    Store(#[from] flow_store::StoreError),
}

pub type DocumentResult<T> = Result<T, DocumentError>;
