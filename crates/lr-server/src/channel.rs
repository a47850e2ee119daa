//! Reload channel.
//!
//! One [`ReloadServer`] per bound port. Each notify-list is broadcast to every
//! connected WebSocket client as a [`ReloadEvent`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lr_core::NotificationService;
use serde::Serialize;
use tokio::sync::{broadcast, oneshot};

use crate::app;

/// Capacity of the broadcast channel; slow clients skip older events.
const CHANNEL_CAPACITY: usize = 100;

/// Message sent to connected clients when files change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    /// Event type (always "reload").
    pub command: &'static str,
    /// Output files that changed.
    pub files: Vec<String>,
}

impl ReloadEvent {
    /// Create a reload event.
    #[must_use]
    pub fn reload(files: Vec<String>) -> Self {
        Self {
            command: "reload",
            files,
        }
    }
}

/// State shared with request handlers.
pub(crate) struct ChannelState {
    pub(crate) port: u16,
    pub(crate) sender: broadcast::Sender<ReloadEvent>,
    pub(crate) clients: AtomicUsize,
}

/// WebSocket reload channel bound to one port.
pub struct ReloadServer {
    state: Arc<ChannelState>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl ReloadServer {
    /// Serve the reload channel on an already bound listener.
    ///
    /// Must be called inside a tokio runtime. Serve-loop errors are logged,
    /// never returned.
    pub fn serve(listener: std::net::TcpListener) -> std::io::Result<Arc<Self>> {
        let port = listener.local_addr()?.port();
        listener.set_nonblocking(true)?;
        let listener = tokio::net::TcpListener::from_std(listener)?;

        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let state = Arc::new(ChannelState {
            port,
            sender,
            clients: AtomicUsize::new(0),
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let router = app::create_router(Arc::clone(&state));
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(port, message = %e, code = ?e.kind(), "Reload channel error");
            }
            tracing::debug!(port, "Reload channel stopped");
        });

        Ok(Arc::new(Self {
            state,
            shutdown: Mutex::new(Some(shutdown_tx)),
        }))
    }

    /// Number of connected clients.
    #[must_use]
    pub fn clients(&self) -> usize {
        self.state.clients.load(Ordering::SeqCst)
    }

    /// Subscribe to the events sent to clients.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.state.sender.subscribe()
    }

    /// Stop accepting connections and shut the server down.
    ///
    /// Idempotent.
    pub fn close(&self) {
        let sender = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(());
            tracing::debug!(port = self.state.port, "Closing reload channel");
        }
    }
}

impl NotificationService for ReloadServer {
    fn port(&self) -> u16 {
        self.state.port
    }

    fn notify_clients(&self, files: &[String]) {
        // Fails only when nobody is connected
        if self
            .state
            .sender
            .send(ReloadEvent::reload(files.to_vec()))
            .is_err()
        {
            tracing::debug!(port = self.state.port, "No clients connected");
        }
    }
}

impl std::fmt::Debug for ReloadServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadServer")
            .field("port", &self.state.port)
            .field("clients", &self.clients())
            .finish_non_exhaustive()
    }
}
