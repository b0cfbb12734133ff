//! Document id allocation for FlowDB.
//!
//! [`SequenceAllocator`] hands out ids that strictly increase within a
//! [`SequenceScope`] and are never reused, including across restarts. Ids
//! are leased from the store in blocks so that most allocations touch only
//! memory.

pub mod allocator;
pub mod error;
pub mod scope;

pub use allocator::{SequenceAllocator, SequenceConfig};
pub use error::{SequenceError, SequenceResult};
pub use scope::{IdScope, SequenceScope};
