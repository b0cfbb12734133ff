use std::fmt;

use serde::Serialize;
use thiserror::Error;

use flow_documents::DocumentError;
use flow_query::QueryError;
use flow_schema::{SchemaError, Violation};
use flow_sequence::SequenceError;
use flow_store::StoreError;
use flow_types::TypeError;

/// Every failure a FlowDB caller can observe.
///
/// Errors from the component crates are folded into this flat set so that
/// transports can map them without knowing where they came from.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("syntax error at position {position}: {message}")]
    QuerySyntax { position: usize, message: String },

    #[error("unsupported operator in `{clause}`: {reason}")]
    UnsupportedOperator { clause: String, reason: String },

    /// Document `index` of an append failed its schema; nothing was written.
    #[error("document {index} failed validation with {} violation(s)", violations.len())]
    Validation {
        index: usize,
        violations: Vec<Violation>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("query exceeded its scan budget of {budget} index keys")]
    BudgetExceeded { budget: usize },

    #[error("storage error: {0}")]
    Storage(String),
}

/// Coarse classification of a [`FlowError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    QuerySyntax,
    UnsupportedOperator,
    Validation,
    NotFound,
    InvalidRequest,
    BudgetExceeded,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QuerySyntax => "QuerySyntax",
            Self::UnsupportedOperator => "UnsupportedOperator",
            Self::Validation => "Validation",
            Self::NotFound => "NotFound",
            Self::InvalidRequest => "InvalidRequest",
            Self::BudgetExceeded => "BudgetExceeded",
            Self::Storage => "Storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::QuerySyntax { .. } => ErrorKind::QuerySyntax,
            Self::UnsupportedOperator { .. } => ErrorKind::UnsupportedOperator,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::BudgetExceeded { .. } => ErrorKind::BudgetExceeded,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<StoreError> for FlowError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<TypeError> for FlowError {
    fn from(err: TypeError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<SequenceError> for FlowError {
    fn from(err: SequenceError) -> Self {
        match err {
            SequenceError::InvalidLeaseSize => Self::InvalidRequest(err.to_string()),
            SequenceError::Store(e) => e.into(),
            SequenceError::Exhausted(_) => Self::Storage(err.to_string()),
        }
    }
}

impl From<SchemaError> for FlowError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::StreamNotFound(_) | SchemaError::ConfigurationNotFound => {
                Self::NotFound(err.to_string())
            }
            SchemaError::InvalidStream(e) => e.into(),
            SchemaError::InvalidSchema { .. } => Self::InvalidRequest(err.to_string()),
            SchemaError::Store(e) => e.into(),
        }
    }
}

impl From<DocumentError> for FlowError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Validation { index, violations } => Self::Validation { index, violations },
            DocumentError::DocumentNotFound { .. } => Self::NotFound(err.to_string()),
            DocumentError::Schema(e) => e.into(),
            DocumentError::Sequence(e) => e.into(),
            DocumentError::Store(e) => e.into(),
            DocumentError::DanglingIndex { .. } | DocumentError::Serialization(_) => {
                Self::Storage(err.to_string())
            }
        }
    }
}

impl From<QueryError> for FlowError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Syntax { position, message } => Self::QuerySyntax { position, message },
            QueryError::UnsupportedOperator { clause, reason } => {
                Self::UnsupportedOperator { clause, reason }
            }
            QueryError::InvalidRequest(message) => Self::InvalidRequest(message),
            QueryError::ScanBudgetExceeded { budget } => Self::BudgetExceeded { budget },
            QueryError::Key(e) => Self::Storage(e.to_string()),
            QueryError::Document(e) => e.into(),
            QueryError::Schema(e) => e.into(),
            QueryError::Store(e) => e.into(),
        }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
