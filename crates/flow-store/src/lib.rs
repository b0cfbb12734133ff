//! Ordered key-value storage for FlowDB.
//!
//! The rest of the system sees storage only through two capabilities:
//! [`KvSnapshot`] (point reads and lazy prefix scans over a consistent view)
//! and [`KvStore`] (snapshots, atomic [`WriteBatch`] commits, and a
//! single-key read-modify-write used by the id allocator).
//!
//! # Backends
//!
//! - [`InMemoryKvStore`] -- copy-on-write `BTreeMap`, for tests and embedding
//! - [`RedbKvStore`] -- durable single-file store on redb

pub mod batch;
pub mod error;
pub mod memory;
pub mod redb_store;
pub mod traits;

pub use batch::{BatchOp, WriteBatch};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryKvStore;
pub use redb_store::RedbKvStore;
pub use traits::{prefix_successor, Direction, KvIter, KvPair, KvSnapshot, KvStore};
