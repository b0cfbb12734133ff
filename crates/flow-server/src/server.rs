use std::sync::Arc;

use tokio::net::TcpListener;

use flow_sdk::FlowDb;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::router::build_router;

/// FlowDB HTTP server.
pub struct FlowServer {
    config: ServerConfig,
    db: Arc<FlowDb>,
}

impl FlowServer {
    pub fn new(config: ServerConfig, db: FlowDb) -> Self {
        Self {
            config,
            db: Arc::new(db),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.db), &self.config)
    }

    /// Serve until ctrl-c, then release id leases.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("FlowDB server listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        match Arc::try_unwrap(self.db) {
            Ok(db) => db.close()?,
            Err(_) => tracing::warn!("database still in use at shutdown; leases not released"),
        }
        tracing::info!("FlowDB server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
