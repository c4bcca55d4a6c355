//! `/ws`: the subscriber endpoint. On connect, primes the client with the
//! fixed-order `current_state_messages()` burst, then forwards every
//! subsequent `Hub` broadcast until the socket closes. Grounded on the
//! `WebSocketUpgrade`/`on_upgrade` idiom observed across the example pack's
//! axum services; the teacher itself has no websocket surface of its own.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vibin_core::model::WebSocketClientDetails;

use crate::state::AppState;

pub async fn handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, addr: SocketAddr) {
    let client_id = uuid::Uuid::new_v4().to_string();
    let details = WebSocketClientDetails {
        id: client_id.clone(),
        when_connected: now_seconds(),
        ip: addr.ip().to_string(),
        port: addr.port(),
    };
    state.clients.lock().push(details);
    debug!(client_id, %addr, "websocket client connected");

    for message in state.hub.current_state_messages().await {
        if send(&mut socket, &message).await.is_err() {
            deregister(&state, &client_id);
            return;
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = state.hub.subscribe(Arc::new(move |message| {
        let _ = tx.send(message.clone());
    }));

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(message) => {
                        if send(&mut socket, &message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(err)) => {
                        warn!(%err, client_id, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    state.hub.unsubscribe(subscription);
    deregister(&state, &client_id);
    debug!(client_id, "websocket client disconnected");
}

async fn send(socket: &mut WebSocket, message: &vibin_core::model::UpdateMessage) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).unwrap_or_default();
    socket.send(Message::Text(text.into())).await
}

fn deregister(state: &AppState, client_id: &str) {
    state.clients.lock().retain(|c| c.id != client_id);
}

fn now_seconds() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}
