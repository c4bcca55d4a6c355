//! The REST, WebSocket, and GENA eventing surface in front of the `Hub`.
//! Grounded on `pmoserver::Server`'s `axum::serve` + `TcpListener` idiom,
//! minus the embedded-assets/OpenAPI machinery that crate layers on top —
//! none of those dependencies are in this workspace's stack.

mod error;
mod routes;
mod state;
mod upnpevents;
mod waveform;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;
use vibin_core::Hub;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use state::AppState;

/// Assembles the full router: REST routes, `/ws`, and `/upnpevents/...`.
pub fn build_router(hub: Arc<Hub>) -> Router {
    let state = AppState::new(hub);

    Router::new()
        .merge(routes::router())
        .merge(upnpevents::router())
        .route("/ws", get(ws::handler))
        .with_state(state)
}

/// Binds and serves the router until the process receives Ctrl-C.
pub async fn serve(hub: Arc<Hub>, bind_addr: SocketAddr) -> std::io::Result<()> {
    let router = build_router(hub).into_make_service_with_connect_info::<SocketAddr>();
    let listener = TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "vibin-server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received ctrl-c, shutting down");
}
