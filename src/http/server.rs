//! HTTP server hosting the gate in front of the protected endpoints.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::gate::{admission_control, Gate};
use crate::error::{GateError, Result};

/// Build the application router with the gate layered over every route.
///
/// The endpoint handlers are stand-ins for the real product handlers; only
/// the gate in front of them is implemented here.
pub fn router(gate: Arc<Gate>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/otp/send", post(accepted))
        .route("/api/otp/verify", post(accepted))
        .route("/api/contact", post(accepted))
        .route("/api/send-emails", post(accepted))
        .layer(middleware::from_fn_with_state(gate, admission_control))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn accepted() -> impl IntoResponse {
    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })))
}

/// HTTP server for the protected endpoints.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The gate shared by all requests
    gate: Arc<Gate>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, gate: Arc<Gate>) -> Self {
        Self { addr, gate }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Starting HTTP server");

        let app = router(self.gate);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            GateError::Io(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{RateLimitStore, RuleRegistry};

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:3000".parse().unwrap();
        let gate = Arc::new(Gate::new(
            RuleRegistry::with_defaults().unwrap(),
            Arc::new(RateLimitStore::default()),
        ));
        let _server = HttpServer::new(addr, gate);
    }
}
