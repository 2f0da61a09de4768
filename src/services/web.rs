//! The HTTP service: binds the listener and serves the API router until
//! shutdown.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::services::manager::Service;
use crate::state::{AppState, ServiceStatus};
use crate::web::routes::create_router;

pub struct WebService {
    port: u16,
    state: AppState,
}

impl WebService {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }
}

#[async_trait]
impl Service for WebService {
    async fn run(self: Box<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        let statuses = self.state.service_statuses.clone();
        statuses.set("web", ServiceStatus::Starting);

        let router = create_router(self.state);

        let listener = match tokio::net::TcpListener::bind(("0.0.0.0", self.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(port = self.port, error = %e, "failed to bind HTTP listener");
                statuses.set("web", ServiceStatus::Error);
                return;
            }
        };

        info!(port = self.port, "HTTP server listening");
        statuses.set("web", ServiceStatus::Active);

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await;

        if let Err(e) = result {
            error!(error = %e, "HTTP server exited with error");
            statuses.set("web", ServiceStatus::Error);
        } else {
            info!("HTTP server stopped");
            statuses.set("web", ServiceStatus::Disabled);
        }
    }
}
