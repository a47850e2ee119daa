//! HTTP request handlers.

pub(crate) mod status;
pub(crate) mod websocket;
