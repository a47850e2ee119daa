//! Shared listeners by port.
//!
//! Several plugin instances in one process may ask for the same port. The
//! first caller binds a [`NotificationService`]; every later caller gets the
//! same instance back. Check, discovery, bind and insert happen under one
//! lock, so concurrent first callers never double-bind and concurrent
//! requests for port `0` resolve to distinct ports.
//!
//! Entries are never removed here. Closing a listener is up to its owner.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::service::{Binder, ListenError, NotificationService};

/// First port tried by discovery.
pub const DEFAULT_PORT: u16 = 35729;

/// Failure to acquire a listener.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// No free port could be discovered.
    #[error("port discovery failed: {0}")]
    Discovery(#[source] std::io::Error),
    /// The service could not bind its port.
    #[error(transparent)]
    Listen(#[from] ListenError),
}

/// Listener handed out by [`PortRegistry::acquire`].
#[derive(Clone)]
pub struct Acquired {
    /// Resolved port.
    pub port: u16,
    /// Shared service bound to `port`.
    pub service: Arc<dyn NotificationService>,
    /// `true` if an existing listener was reused.
    pub reused: bool,
}

impl std::fmt::Debug for Acquired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquired")
            .field("port", &self.port)
            .field("reused", &self.reused)
            .finish_non_exhaustive()
    }
}

/// Process-wide map from port to listening service.
pub struct PortRegistry {
    listeners: Mutex<HashMap<u16, Arc<dyn NotificationService>>>,
    base_port: u16,
}

impl PortRegistry {
    /// Create an empty registry discovering from [`DEFAULT_PORT`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_port(DEFAULT_PORT)
    }

    /// Create an empty registry discovering from `base_port`.
    #[must_use]
    pub fn with_base_port(base_port: u16) -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            base_port,
        }
    }

    /// Return the listener for `port`, binding one if none exists.
    ///
    /// Port `0` discovers the first free port at or above the base port.
    pub async fn acquire(&self, port: u16, binder: &dyn Binder) -> Result<Acquired, AcquireError> {
        let mut listeners = self.listeners.lock().await;

        if let Some(service) = listeners.get(&port) {
            return Ok(Acquired {
                port,
                service: Arc::clone(service),
                reused: true,
            });
        }

        let resolved = if port == 0 {
            discover_port(self.base_port)
                .await
                .map_err(AcquireError::Discovery)?
        } else {
            port
        };

        let service = binder.listen(resolved)?;
        listeners.insert(resolved, Arc::clone(&service));
        tracing::debug!(port = resolved, "Registered reload listener");

        Ok(Acquired {
            port: resolved,
            service,
            reused: false,
        })
    }

    /// Listener registered for `port`, if any.
    pub async fn get(&self, port: u16) -> Option<Arc<dyn NotificationService>> {
        self.listeners.lock().await.get(&port).map(Arc::clone)
    }

    /// Ports with a registered listener, ascending.
    pub async fn ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.listeners.lock().await.keys().copied().collect();
        ports.sort_unstable();
        ports
    }
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the first port at or above `base` that can be bound.
///
/// A probe listener is bound and dropped again; the caller binds for real
/// afterwards. `base == 0` lets the OS pick.
pub async fn discover_port(base: u16) -> std::io::Result<u16> {
    for port in base..=u16::MAX {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        match tokio::net::TcpListener::bind(addr).await {
            Ok(probe) => return Ok(probe.local_addr()?.port()),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {}
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        format!("no free port at or above {base}"),
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Service recording every notification.
    #[derive(Default)]
    pub(crate) struct RecordingService {
        pub(crate) port: u16,
        pub(crate) sent: StdMutex<Vec<Vec<String>>>,
    }

    impl RecordingService {
        pub(crate) fn shared(self: &Arc<Self>) -> Arc<dyn NotificationService> {
            let service: Arc<Self> = Arc::clone(self);
            service
        }
    }

    impl NotificationService for RecordingService {
        fn port(&self) -> u16 {
            self.port
        }

        fn notify_clients(&self, files: &[String]) {
            self.sent.lock().unwrap().push(files.to_vec());
        }
    }

    /// Binder handing out one shared recording service for every port.
    pub(crate) struct SharedBinder(pub(crate) Arc<RecordingService>);

    impl Binder for SharedBinder {
        fn listen(&self, _port: u16) -> Result<Arc<dyn NotificationService>, ListenError> {
            Ok(self.0.shared())
        }
    }

    /// Binder that really holds the port open.
    #[derive(Default)]
    pub(crate) struct TcpBinder {
        pub(crate) binds: AtomicUsize,
        pub(crate) held: StdMutex<Vec<std::net::TcpListener>>,
    }

    impl Binder for TcpBinder {
        fn listen(&self, port: u16) -> Result<Arc<dyn NotificationService>, ListenError> {
            let listener = std::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
                .map_err(|e| ListenError::new(port, e))?;
            self.held.lock().unwrap().push(listener);
            self.binds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(RecordingService {
                port,
                ..Default::default()
            }))
        }
    }

    #[tokio::test]
    async fn test_acquire_reuses_listener() {
        let registry = PortRegistry::new();
        let binder = TcpBinder::default();
        let port = discover_port(42100).await.unwrap();

        let first = registry.acquire(port, &binder).await.unwrap();
        let second = registry.acquire(port, &binder).await.unwrap();

        assert!(!first.reused);
        assert!(second.reused);
        assert!(Arc::ptr_eq(&first.service, &second.service));
        assert_eq!(binder.binds.load(Ordering::SeqCst), 1);
        assert_eq!(registry.ports().await, vec![port]);
    }

    #[tokio::test]
    async fn test_concurrent_first_callers_share_one_bind() {
        let registry = Arc::new(PortRegistry::new());
        let binder = Arc::new(TcpBinder::default());
        let port = discover_port(42200).await.unwrap();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let binder = Arc::clone(&binder);
                tokio::spawn(async move { registry.acquire(port, binder.as_ref()).await })
            })
            .collect();

        let mut reused = 0;
        for task in tasks {
            if task.await.unwrap().unwrap().reused {
                reused += 1;
            }
        }

        assert_eq!(reused, 3);
        assert_eq!(binder.binds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_port_zero_resolves_distinct_ports() {
        let registry = Arc::new(PortRegistry::with_base_port(42300));
        let binder = Arc::new(TcpBinder::default());

        let spawn = || {
            let registry = Arc::clone(&registry);
            let binder = Arc::clone(&binder);
            tokio::spawn(async move { registry.acquire(0, binder.as_ref()).await })
        };
        let (a, b) = (spawn(), spawn());
        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        assert_ne!(a.port, b.port);
        assert!(a.port >= 42300);
        assert!(b.port >= 42300);
        assert!(!a.reused);
        assert!(!b.reused);
    }

    #[tokio::test]
    async fn test_listen_error_is_not_registered() {
        let registry = PortRegistry::new();
        let binder = TcpBinder::default();
        let port = discover_port(42400).await.unwrap();
        let _blocker = std::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).unwrap();

        let err = registry.acquire(port, &binder).await.unwrap_err();
        match err {
            AcquireError::Listen(e) => assert!(e.is_addr_in_use()),
            AcquireError::Discovery(e) => panic!("unexpected discovery error: {e}"),
        }
        assert!(registry.get(port).await.is_none());
    }

    #[tokio::test]
    async fn test_discover_port_skips_taken_ports() {
        let base = discover_port(42500).await.unwrap();
        let _blocker = std::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, base)).unwrap();

        let port = discover_port(base).await.unwrap();
        assert!(port > base);
    }
}
