//! Query language and execution for FlowDB.
//!
//! Queries are boolean expressions over document fields:
//!
//! ```text
//! team = 'core' AND active = TRUE OR age = 36
//! ```
//!
//! The parser accepts the full comparison grammar (`=`, `:`, `!=`, `<>`,
//! `<`, `<=`, `>`, `>=`, `NOT`), but only equality and the `*` presence
//! wildcard can be answered from the field index. Everything else is
//! rejected by the executor before any scan.
//!
//! # Key Types
//!
//! - [`Expression`] -- parsed query in disjunctive normal form
//! - [`QueryExecutor`] -- runs an expression against a stream snapshot
//! - [`QueryLimits`] -- result limits and the per-query scan budget

pub mod ast;
pub mod error;
pub mod executor;
mod lexer;
pub mod parser;

pub use ast::{Condition, Expression, Literal, Operator, OrGroup};
pub use error::{QueryError, QueryResult};
pub use executor::{QueryExecutor, QueryLimits};
pub use parser::parse;
