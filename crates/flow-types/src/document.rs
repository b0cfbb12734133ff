use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Injected field holding the document's identifier.
pub const ID_FIELD: &str = "_id";
/// Injected field holding the name of the stream the document belongs to.
pub const STREAM_FIELD: &str = "_dataStream";
/// Injected field holding the ingestion time in milliseconds since the epoch.
pub const TIMESTAMP_FIELD: &str = "_timestamp";

/// Milliseconds since the UNIX epoch. Negative values are valid and sort
/// before the epoch.
pub type TimestampMillis = i64;

/// Identifier assigned to a stored document.
///
/// Identifiers are opaque and strictly increasing within their sequence
/// scope. They are not dense: gaps appear after crashes and after batches
/// rejected by validation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for DocumentId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<DocumentId> for u64 {
    fn from(value: DocumentId) -> Self {
        value.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidDocumentId(s.to_string()))
    }
}
