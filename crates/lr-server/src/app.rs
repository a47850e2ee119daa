//! Router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use lr_core::bootstrap::RELOAD_PATH;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::channel::ChannelState;
use crate::handlers;

/// Create the reload channel router.
pub(crate) fn create_router(state: Arc<ChannelState>) -> Router {
    Router::new()
        .route(RELOAD_PATH, get(handlers::websocket::ws_handler))
        .route("/status", get(handlers::status::get_status))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
