//! Reload channel WebSocket.
//!
//! Each connection subscribes to the port's broadcast and receives every
//! notify-list as a JSON text frame. Frames sent by the browser are read only
//! to notice disconnects.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;

use crate::channel::{ChannelState, ReloadEvent};

/// Upgrade `GET /livereload` to a reload subscription.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ChannelState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| serve_client(socket, state))
}

/// Keeps the connected-client count in step with live sockets.
struct ClientGuard {
    state: Arc<ChannelState>,
}

impl ClientGuard {
    fn register(state: Arc<ChannelState>) -> Self {
        let clients = state.clients.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(port = state.port, clients, "Reload client connected");
        Self { state }
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        let clients = self.state.clients.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!(port = self.state.port, clients, "Reload client disconnected");
    }
}

async fn serve_client(mut socket: WebSocket, state: Arc<ChannelState>) {
    let mut events = state.sender.subscribe();
    let _guard = ClientGuard::register(state);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Some(frame) = encode(&event) else { continue };
                    if socket.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Reload client fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Encode `event` as a text frame; failures go to the error channel.
fn encode(event: &ReloadEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(message = %e, code = "EENCODE", "Failed to encode reload event");
            None
        }
    }
}
