//! Key layout for FlowDB.
//!
//! Every persistent entity lives in one flat, byte-ordered namespace. This
//! crate owns the mapping from domain identifiers to keys and back. It is
//! pure: no I/O, no state.
//!
//! # Layout
//!
//! | Key | Value |
//! |---|---|
//! | `streams` | JSON array of stream names |
//! | `sequences/global` | lease bound of the global id sequence |
//! | `streams@{stream}/schema` | JSON schema |
//! | `streams@{stream}/sequence` | lease bound of the stream's id sequence |
//! | `streams@{stream}/documents/{id}` | document JSON |
//! | `streams@{stream}/indices/{timestamp}/{id}` | document key |
//! | `streams@{stream}/fields/{field}/{value}/{timestamp}/{id}` | document key |
//!
//! # Ordering
//!
//! Numeric components are fixed-width (20 decimal digits) so that plain
//! byte comparison of keys agrees with numeric comparison of ids and
//! timestamps, negative timestamps included. See [`codec`].
//!
//! Text components (stream, field, value token) are percent-escaped so that
//! `/`, `@` and `%` never appear raw inside a component.

pub mod codec;
pub mod error;
pub mod layout;

pub use codec::{decode_id, decode_timestamp, encode_id, encode_timestamp, escape, unescape};
pub use error::{KeyError, KeyResult};
pub use layout::{
    decode_posting, document_key, field_index_key, field_index_prefix, field_presence_prefix,
    global_sequence_key, schema_key, stream_list_key, stream_sequence_key, time_index_key,
    time_index_prefix, PostingKey,
};
