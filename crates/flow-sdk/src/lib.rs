//! Embeddable FlowDB.
//!
//! FlowDB stores schema-validated JSON documents in named data streams and
//! answers two kinds of reads: recency scans in ingestion order and boolean
//! equality searches over top-level fields. [`FlowDb`] is the entry point;
//! the HTTP server and the CLI are thin layers over it.
//!
//! ```no_run
//! use flow_sdk::{FlowDb, SearchRequest, StreamDefinition};
//! use serde_json::json;
//!
//! let db = FlowDb::in_memory()?;
//! db.set_configuration(vec![StreamDefinition::new("events", json!({"type": "object"}))?])?;
//! db.append_documents("events", vec![json!({"kind": "click"})])?;
//! let hits = db.search(&SearchRequest::new("events", "kind = 'click'"))?;
//! assert_eq!(hits.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod search;

pub use config::{FlowConfig, StorageConfig};
pub use db::{FlowDb, FlowDbBuilder};
pub use error::{ErrorKind, FlowError, FlowResult};
pub use search::SearchRequest;

// Re-export key types
pub use flow_documents::RecentConfig;
pub use flow_query::QueryLimits;
pub use flow_schema::{StreamDefinition, Violation};
pub use flow_sequence::{IdScope, SequenceConfig};
pub use flow_store::{InMemoryKvStore, KvStore, RedbKvStore};
pub use flow_types::{Clock, DocumentId, ManualClock, SortOrder, StreamName, SystemClock};
