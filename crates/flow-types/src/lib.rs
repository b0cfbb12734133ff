//! Foundation types for FlowDB.
//!
//! Every other FlowDB crate depends on `flow-types`. Nothing here performs
//! I/O; the types describe streams, documents and the values stored in them.
//!
//! # Key Types
//!
//! - [`StreamName`] -- validated name of a data stream
//! - [`DocumentId`] -- per-scope monotonic document identifier
//! - [`FieldValue`] -- closed tagged union over JSON values, with index tokens
//! - [`SortOrder`] -- ascending or descending timestamp order
//! - [`Clock`] -- injectable millisecond wall clock

pub mod clock;
pub mod document;
pub mod error;
pub mod order;
pub mod stream;
pub mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use document::{DocumentId, TimestampMillis, ID_FIELD, STREAM_FIELD, TIMESTAMP_FIELD};
pub use error::TypeError;
pub use order::SortOrder;
pub use stream::StreamName;
pub use value::{index_token_of, FieldValue, IndexToken};
