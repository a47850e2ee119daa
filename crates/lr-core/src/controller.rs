//! Build lifecycle controller.
//!
//! Tracks whether a reload listener is available and decides, per completed
//! build, whether clients get notified.
//!
//! ```text
//! Idle ──start──► Starting ──bound/reused──► Listening
//!                    │                          │
//!                    └──bind failed──► Disabled │
//! Idle ◄──────────────── build failed ──────────┘
//! ```
//!
//! A notification goes out when the build fingerprint differs from the last
//! notified one (or none is stored), the include list is non-empty and the
//! controller is listening. A failed build clears the stored fingerprint, so
//! the next successful build notifies even if its fingerprint is unchanged.
//! `Disabled` is sticky: later starts do not retry the bind.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::dispatcher::Dispatcher;
use crate::registry::{AcquireError, PortRegistry};
use crate::service::{Binder, NotificationService};
use crate::snapshot::BuildFingerprint;

/// Controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not started, or reset by a failed build.
    Idle,
    /// Listener being acquired.
    Starting,
    /// Ready to notify.
    Listening,
    /// Binding failed; reload is off for this instance.
    Disabled,
}

/// Why a completed build did not notify.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No listener is available.
    NotListening,
    /// No asset changed.
    NoChanges,
    /// The build fingerprint matches the last notified build.
    SameFingerprint,
}

/// Outcome of a completed build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// A notification with these files was scheduled.
    Notified(Vec<String>),
    /// Nothing was sent.
    Skipped(SkipReason),
}

/// Hard failure of the start phase.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// No free port could be discovered.
    #[error("port discovery failed: {0}")]
    Discovery(#[source] std::io::Error),
}

struct Listener {
    service: Arc<dyn NotificationService>,
    dispatcher: Dispatcher,
}

/// Lifecycle state machine for one plugin instance.
pub struct Controller {
    registry: Arc<PortRegistry>,
    binder: Arc<dyn Binder>,
    port: u16,
    quiet: bool,
    delay: Duration,
    state: LifecycleState,
    listener: Option<Listener>,
    previous: Option<BuildFingerprint>,
}

impl Controller {
    /// Create an idle controller.
    ///
    /// # Arguments
    ///
    /// * `registry` - Listeners shared across plugin instances
    /// * `binder` - Creates the listener when the registry has none
    /// * `port` - Requested port (`0` discovers one)
    /// * `quiet` - Suppress the informational "listening" message
    /// * `delay` - Delay between build completion and notification
    #[must_use]
    pub fn new(
        registry: Arc<PortRegistry>,
        binder: Arc<dyn Binder>,
        port: u16,
        quiet: bool,
        delay: Duration,
    ) -> Self {
        Self {
            registry,
            binder,
            port,
            quiet,
            delay,
            state: LifecycleState::Idle,
            listener: None,
            previous: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Port in use; the resolved port once a discovered listener is bound.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `true` if notifications can be sent.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state == LifecycleState::Listening
    }

    /// Fingerprint of the last notified build.
    #[must_use]
    pub fn previous(&self) -> Option<&BuildFingerprint> {
        self.previous.as_ref()
    }

    /// Acquire a listener for the configured port.
    ///
    /// Bind failures disable reload and return `Ok`; only a failed port
    /// discovery is an error. Must run inside a tokio runtime, which is also
    /// where later notifications are sent.
    pub async fn start(&mut self) -> Result<(), StartError> {
        if matches!(
            self.state,
            LifecycleState::Listening | LifecycleState::Disabled
        ) {
            return Ok(());
        }

        self.state = LifecycleState::Starting;
        let requested = self.port;

        match self.registry.acquire(requested, self.binder.as_ref()).await {
            Ok(acquired) => {
                self.port = acquired.port;
                if !acquired.reused && !self.quiet {
                    tracing::info!(
                        port = acquired.port,
                        "Live Reload listening on port {}",
                        acquired.port
                    );
                }
                self.listener = Some(Listener {
                    service: acquired.service,
                    dispatcher: Dispatcher::new(Handle::current(), self.delay),
                });
                self.state = LifecycleState::Listening;
                Ok(())
            }
            Err(AcquireError::Listen(err)) => {
                tracing::error!(
                    port = err.port,
                    code = err.code(),
                    "Live Reload disabled: {err}"
                );
                if !err.is_addr_in_use() {
                    tracing::error!(port = err.port, error = ?err, "Listener error detail");
                }
                self.state = LifecycleState::Disabled;
                Ok(())
            }
            Err(AcquireError::Discovery(err)) => {
                self.state = LifecycleState::Idle;
                Err(StartError::Discovery(err))
            }
        }
    }

    /// Decide whether a completed build notifies, and schedule the send.
    pub fn on_build_complete(
        &mut self,
        fingerprint: BuildFingerprint,
        include: Vec<String>,
    ) -> Decision {
        let Some(listener) = self.listener.as_ref().filter(|_| self.is_listening()) else {
            return Decision::Skipped(SkipReason::NotListening);
        };
        if include.is_empty() {
            return Decision::Skipped(SkipReason::NoChanges);
        }
        if self.previous.as_ref() == Some(&fingerprint) {
            tracing::debug!(hash = %fingerprint.build_hash, "Build fingerprint unchanged");
            return Decision::Skipped(SkipReason::SameFingerprint);
        }

        listener
            .dispatcher
            .schedule(Arc::clone(&listener.service), include.clone());
        self.previous = Some(fingerprint);

        Decision::Notified(include)
    }

    /// Reset after a failed build.
    ///
    /// Forgets the stored fingerprint and returns to `Idle`; the listener stays
    /// registered, so the next start picks it up again.
    pub fn on_build_failed(&mut self) {
        self.previous = None;
        if self.state != LifecycleState::Disabled {
            self.listener = None;
            self.state = LifecycleState::Idle;
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("port", &self.port)
            .field("state", &self.state)
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}
