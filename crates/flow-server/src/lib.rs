//! HTTP/JSON API for FlowDB.
//!
//! Every route is a thin adapter over [`flow_sdk::FlowDb`]; database calls
//! run on tokio's blocking pool. Errors are rendered as
//! `{"error": kind, "message": text, ...}` with a status derived from the
//! error kind.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::AppState;
pub use router::build_router;
pub use server::FlowServer;
