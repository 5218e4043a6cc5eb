use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

use dustline_broadcast::BroadcastService;
use dustline_channels::LineClient;
use dustline_routing::MessageRouter;
use dustline_session::UserLocks;

use crate::handlers;

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub channel_secret: String,
    pub router: Arc<MessageRouter>,
    pub locks: Arc<UserLocks>,
    pub line: Arc<LineClient>,
    pub broadcast: Arc<BroadcastService>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/webhook", post(handlers::webhook))
        .route("/broadcast", post(handlers::manual_broadcast))
        .with_state(state)
}

/// Start the Axum HTTP server.
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = build_router(state);
    info!("Dustline HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
