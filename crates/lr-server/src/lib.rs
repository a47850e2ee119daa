//! WebSocket reload channel for lr.
//!
//! Implements the [`lr_core::Binder`] and [`lr_core::NotificationService`]
//! seams with an axum server per port, serving:
//! - `GET /livereload` - WebSocket receiving `{"command":"reload","files":[…]}`
//! - `GET /status` - bound port and connected client count
//!
//! # Architecture
//!
//! ```text
//! PortRegistry ──listen(port)──► ReloadBinder ──► ReloadServer (axum)
//!                                                     │
//! Dispatcher ──notify_clients──► broadcast ──────────►├─► WebSocket client
//!                                                     └─► WebSocket client
//! ```

mod app;
mod binder;
mod channel;
mod handlers;

pub use binder::ReloadBinder;
pub use channel::{ReloadEvent, ReloadServer};
