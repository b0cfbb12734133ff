//! Document storage for FlowDB streams.
//!
//! [`DocumentStore::append`] validates a batch of documents against the
//! stream schema, assigns ids and ingestion timestamps, and commits each
//! document together with its derived index entries in one atomic batch.
//! Reads come back as raw JSON bytes, exactly as stored.

pub mod error;
pub mod staging;
pub mod store;

pub use error::{DocumentError, DocumentResult};
pub use staging::StagedDocument;
pub use store::{resolve, DocumentStore, RecentConfig};
