use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use flow_sdk::FlowDb;

use crate::config::ServerConfig;
use crate::handler::{self, AppState};

/// Build the axum router with all FlowDB endpoints.
pub fn build_router(db: Arc<FlowDb>, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/api/health", get(handler::health_handler))
        .route(
            "/api/configurations",
            post(handler::set_configuration_handler),
        )
        .route(
            "/api/configurations/current",
            get(handler::current_configuration_handler),
        )
        .route(
            "/api/data-streams/:stream/documents",
            post(handler::append_documents_handler),
        )
        .route(
            "/api/data-streams/:stream/documents/:id",
            get(handler::get_document_handler),
        )
        .route(
            "/api/data-streams/:stream/schema",
            get(handler::get_schema_handler),
        )
        .route(
            "/api/data-streams/:stream/recent",
            get(handler::recent_handler),
        )
        .route("/api/search", post(handler::search_handler))
        .with_state(AppState { db })
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    if config.allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
