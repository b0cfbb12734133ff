use thiserror::Error;

/// Errors from parsing or executing a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Malformed query text. `position` is a byte offset into the query.
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// A well-formed clause the index cannot answer (negation, ranges).
    #[error("unsupported operator in `{clause}`: {reason}")]
    UnsupportedOperator { clause: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The query visited more index keys than its budget allows.
    #[error("query exceeded its scan budget of {budget} index keys")]
    ScanBudgetExceeded { budget: usize },

    #[error("malformed index key: {0}")]
    Key(#[from] flow_keys::KeyError),

    #[error("document error: {0}")]
    Document(#[from] flow_documents::DocumentError),

    #[error("schema error: {0}")]
    Schema(#[from] flow_schema::SchemaError),

    #[error("store error: {0}")]
    Store(#[from] flow_store::StoreError),
}

impl QueryError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
