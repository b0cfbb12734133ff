use thiserror::Error;

use crate::scope::SequenceScope;

/// Errors from id allocation.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("store error: {0}")]
    Store(#[from] flow_store::StoreError),

    /// Leasing another block would overflow `u64`.
    #[error("id sequence {0} is exhausted")]
    Exhausted(SequenceScope),

    #[error("lease size must be greater than zero")]
    InvalidLeaseSize,
}

pub type SequenceResult<T> = Result<T, SequenceError>;
