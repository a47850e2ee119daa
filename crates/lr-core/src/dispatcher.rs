//! Deferred notification sends.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::service::NotificationService;

/// Schedules `notify_clients` calls on a tokio runtime.
///
/// Each call to [`schedule`](Self::schedule) produces exactly one send after
/// the configured delay. Sends are independent: a second build finishing
/// inside the delay window does not cancel or merge with the first.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    runtime: Handle,
    delay: Duration,
}

impl Dispatcher {
    /// Create a dispatcher spawning onto `runtime`.
    #[must_use]
    pub fn new(runtime: Handle, delay: Duration) -> Self {
        Self { runtime, delay }
    }

    /// Configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Send `files` to the service's clients once the delay has elapsed.
    ///
    /// Returns immediately.
    pub fn schedule(
        &self,
        service: Arc<dyn NotificationService>,
        files: Vec<String>,
    ) -> JoinHandle<()> {
        let delay = self.delay;
        self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            tracing::debug!(port = service.port(), files = files.len(), "Notifying clients");
            service.notify_clients(&files);
        })
    }
}
