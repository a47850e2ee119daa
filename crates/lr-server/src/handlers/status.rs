//! Status endpoint.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::channel::ChannelState;

/// Response for GET /status.
#[derive(Serialize)]
pub(crate) struct StatusResponse {
    /// Port the channel is bound to.
    port: u16,
    /// Connected WebSocket clients.
    clients: usize,
}

/// Handle GET /status.
pub(crate) async fn get_status(State(state): State<Arc<ChannelState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        port: state.port,
        clients: state.clients.load(Ordering::SeqCst),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_serialization() {
        let response = StatusResponse {
            port: 35729,
            clients: 2,
        };

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["port"], 35729);
        assert_eq!(json["clients"], 2);
    }
}
