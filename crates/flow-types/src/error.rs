use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid stream name {name:?}: {reason}")]
    InvalidStreamName { name: String, reason: String },

    #[error("invalid document id: {0}")]
    InvalidDocumentId(String),

    #[error("invalid sort order: {0}")]
    InvalidSortOrder(String),
}
