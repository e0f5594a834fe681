//! Axum-based RPC server.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use ballot_registry::VotingRegistry;
use tracing::info;

use crate::error::RpcError;
use crate::handlers;

/// Header carrying the caller identity, set by the authenticating proxy.
pub const VOTER_ID_HEADER: &str = "x-voter-id";

/// Shared state handed to every handler.
pub struct RpcState {
    pub registry: Arc<VotingRegistry>,
    /// Unix seconds at which the server was started.
    pub started_at: u64,
    /// Registry to encode on `/metrics`; `None` disables the endpoint.
    pub metrics_registry: Option<prometheus::Registry>,
}

/// Build the router with every endpoint mounted.
pub fn router(state: Arc<RpcState>) -> Router {
    Router::new()
        .route(
            "/sessions",
            post(handlers::create_session).get(handlers::list_sessions),
        )
        .route("/sessions/count", get(handlers::session_count))
        .route("/sessions/:id", get(handlers::session_info))
        .route("/sessions/:id/tally", get(handlers::tally))
        .route("/sessions/:id/winners", get(handlers::winners))
        .route("/sessions/:id/voters/:voter", get(handlers::has_voted))
        .route("/sessions/:id/votes", post(handlers::cast_vote))
        .route("/sessions/:id/finalize", post(handlers::finalize))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

pub struct RpcServer {
    pub port: u16,
    pub state: Arc<RpcState>,
}

impl RpcServer {
    pub fn with_state(port: u16, state: Arc<RpcState>) -> Self {
        Self { port, state }
    }

    /// Bind to the configured port and serve until the task is dropped.
    pub async fn start(&self) -> Result<(), RpcError> {
        let app = router(Arc::clone(&self.state));
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {addr}: {e}")))?;
        info!("RPC server listening on {}", addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
