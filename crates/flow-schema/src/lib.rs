//! Stream configuration for FlowDB.
//!
//! [`SchemaRegistry`] persists the configured stream list and each stream's
//! JSON schema. [`SchemaValidator`] wraps the `jsonschema` compiler and
//! reports failures as [`Violation`]s with the document path and the schema
//! rule that failed.

pub mod error;
pub mod registry;
pub mod validator;

pub use error::{SchemaError, SchemaResult};
pub use registry::{schema_in, SchemaRegistry, StreamDefinition};
pub use validator::{SchemaValidator, Violation};
