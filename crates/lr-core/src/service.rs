//! Notification service seam.
//!
//! The reload channel itself lives outside this crate. The core only needs to
//! bind it to a port ([`Binder`]) and push file lists to its clients
//! ([`NotificationService`]).

use std::sync::Arc;

/// A listening reload channel.
pub trait NotificationService: Send + Sync {
    /// Port the service is bound to.
    fn port(&self) -> u16;

    /// Tell every connected client that `files` changed.
    fn notify_clients(&self, files: &[String]);
}

/// Creates listening [`NotificationService`]s.
pub trait Binder: Send + Sync {
    /// Bind a service to `port`.
    ///
    /// `port` is always concrete; discovery of a free port happens before
    /// this is called.
    fn listen(&self, port: u16) -> Result<Arc<dyn NotificationService>, ListenError>;
}

/// Failure to bind a notification service.
#[derive(Debug, thiserror::Error)]
#[error("failed to listen on port {port}: {source}")]
pub struct ListenError {
    /// Port that was requested.
    pub port: u16,
    /// Underlying I/O error.
    #[source]
    pub source: std::io::Error,
}

impl ListenError {
    /// Create a listen error.
    #[must_use]
    pub fn new(port: u16, source: std::io::Error) -> Self {
        Self { port, source }
    }

    /// Returns `true` if the port is already taken by another process.
    #[must_use]
    pub fn is_addr_in_use(&self) -> bool {
        self.source.kind() == std::io::ErrorKind::AddrInUse
    }

    /// Short error code for log output (`EADDRINUSE`, `EACCES`, …).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self.source.kind() {
            std::io::ErrorKind::AddrInUse => "EADDRINUSE",
            std::io::ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
            std::io::ErrorKind::PermissionDenied => "EACCES",
            _ => "EUNKNOWN",
        }
    }
}
