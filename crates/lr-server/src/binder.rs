//! Binding reload channels for the port registry.

use std::sync::{Arc, Mutex, PoisonError};

use lr_core::{Binder, ListenError, NotificationService};
use tokio::runtime::Handle;

use crate::channel::ReloadServer;

/// Binds a [`ReloadServer`] per requested port on a fixed host.
///
/// Every server bound through this binder is kept so the host process can
/// close them all on shutdown.
pub struct ReloadBinder {
    host: String,
    runtime: Handle,
    servers: Mutex<Vec<Arc<ReloadServer>>>,
}

impl ReloadBinder {
    /// Create a binder listening on `host`, serving on `runtime`.
    #[must_use]
    pub fn new(host: impl Into<String>, runtime: Handle) -> Self {
        Self {
            host: host.into(),
            runtime,
            servers: Mutex::new(Vec::new()),
        }
    }

    /// Host the servers bind to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Servers bound so far.
    pub fn servers(&self) -> Vec<Arc<ReloadServer>> {
        self.servers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Close every server bound by this binder.
    pub fn close_all(&self) {
        for server in self.servers() {
            server.close();
        }
    }
}

impl Binder for ReloadBinder {
    fn listen(&self, port: u16) -> Result<Arc<dyn NotificationService>, ListenError> {
        let listener = std::net::TcpListener::bind((self.host.as_str(), port))
            .map_err(|e| ListenError::new(port, e))?;

        let _guard = self.runtime.enter();
        let server = ReloadServer::serve(listener).map_err(|e| ListenError::new(port, e))?;

        self.servers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&server));
        tracing::debug!(host = %self.host, port, "Reload channel bound");

        Ok(server)
    }
}

impl std::fmt::Debug for ReloadBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadBinder")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use lr_core::{PortRegistry, discover_port};
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_listen_binds_server() {
        let binder = ReloadBinder::new("127.0.0.1", Handle::current());
        let port = discover_port(43100).await.unwrap();

        let service = binder.listen(port).unwrap();

        assert_eq!(service.port(), port);
        assert_eq!(binder.servers().len(), 1);
        binder.close_all();
    }

    #[tokio::test]
    async fn test_listen_reports_addr_in_use() {
        let blocker = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = blocker.local_addr().unwrap().port();
        let binder = ReloadBinder::new("127.0.0.1", Handle::current());

        let Err(err) = binder.listen(port) else {
            panic!("expected bind on a taken port to fail");
        };

        assert!(err.is_addr_in_use());
        assert_eq!(err.port, port);
        assert!(binder.servers().is_empty());
    }

    #[tokio::test]
    async fn test_registry_shares_server() {
        let registry = PortRegistry::with_base_port(43200);
        let binder = ReloadBinder::new("127.0.0.1", Handle::current());

        let first = registry.acquire(0, &binder).await.unwrap();
        let second = registry.acquire(first.port, &binder).await.unwrap();

        assert!(first.port >= 43200);
        assert!(second.reused);
        assert_eq!(binder.servers().len(), 1);
        binder.close_all();
    }
}
