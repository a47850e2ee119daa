//! Build host integration.
//!
//! A host (bundler, directory watcher, …) drives one [`LiveReloadPlugin`] per
//! build pipeline through the [`BuildHooks`] trait:
//!
//! 1. `on_watch_start` before every build in watch mode
//! 2. `on_assets_available` when output exists but is not yet written
//! 3. `on_build_done` after a successful build
//! 4. `on_build_failed` after a failed build
//!
//! Starting again while a listener is held is a no-op, so hosts may call
//! `on_watch_start` freely. Hooks are never called concurrently for one
//! plugin.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::bootstrap::ClientScript;
use crate::classifier::{ChangeClassifier, ClassifyError};
use crate::controller::{Controller, Decision, LifecycleState, StartError};
use crate::options::{FailurePolicy, PluginOptions};
use crate::registry::PortRegistry;
use crate::service::Binder;
use crate::snapshot::BuildSnapshot;

/// Lifecycle hooks a build host calls.
pub trait BuildHooks {
    /// A watch-mode build is about to run.
    fn on_watch_start(&mut self) -> impl Future<Output = Result<(), StartError>> + Send;

    /// Build output is available but not finalized.
    fn on_assets_available(&mut self, snapshot: &BuildSnapshot) -> Result<(), ClassifyError>;

    /// A build completed successfully.
    fn on_build_done(&mut self, snapshot: &BuildSnapshot) -> Result<Decision, ClassifyError>;

    /// A build failed.
    fn on_build_failed(&mut self);
}

/// Live reload for one build pipeline.
pub struct LiveReloadPlugin {
    options: PluginOptions,
    instance_id: String,
    classifier: ChangeClassifier,
    controller: Controller,
}

impl LiveReloadPlugin {
    /// Create a plugin.
    ///
    /// Listeners are shared through `registry`; `binder` creates one when the
    /// registry has none for the configured port.
    #[must_use]
    pub fn new(
        options: PluginOptions,
        registry: Arc<PortRegistry>,
        binder: Arc<dyn Binder>,
    ) -> Self {
        let classifier = ChangeClassifier::new(
            options.ignore.clone(),
            options.use_source_size,
            options.use_source_hash,
        );
        let controller = Controller::new(
            registry,
            binder,
            options.port,
            options.quiet,
            options.delay,
        );

        Self {
            options,
            instance_id: uuid::Uuid::new_v4().simple().to_string(),
            classifier,
            controller,
        }
    }

    /// Options the plugin was created with.
    #[must_use]
    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// Random id distinguishing this instance's client script.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Port of the reload channel (resolved once started).
    #[must_use]
    pub fn port(&self) -> u16 {
        self.controller.port()
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.controller.state()
    }

    /// Returns `true` if a listener is available.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.controller.is_listening()
    }

    /// Change classifier, for inspecting per-asset state.
    #[must_use]
    pub fn classifier(&self) -> &ChangeClassifier {
        &self.classifier
    }

    /// Client bootstrap script for the current port.
    #[must_use]
    pub fn client_script(&self) -> String {
        ClientScript {
            instance_id: &self.instance_id,
            hostname: self.options.hostname.as_deref(),
            protocol: &self.options.protocol,
            port: self.controller.port(),
        }
        .render()
    }

    /// Prefix the client script to an entry chunk's code.
    ///
    /// Returns `source` unchanged unless `append_script_tag` is set and the
    /// plugin is running.
    pub fn script_tag<'a>(&self, source: &'a str) -> Cow<'a, str> {
        if !self.options.append_script_tag || !self.is_running() {
            return Cow::Borrowed(source);
        }
        Cow::Owned(format!("{}{source}", self.client_script()))
    }
}

impl BuildHooks for LiveReloadPlugin {
    async fn on_watch_start(&mut self) -> Result<(), StartError> {
        self.controller.start().await
    }

    fn on_assets_available(&mut self, snapshot: &BuildSnapshot) -> Result<(), ClassifyError> {
        self.classifier.precompute(&snapshot.assets)
    }

    fn on_build_done(&mut self, snapshot: &BuildSnapshot) -> Result<Decision, ClassifyError> {
        let include = self.classifier.classify(&snapshot.assets)?;
        let decision = self.controller.on_build_complete(snapshot.fingerprint(), include);

        if let Decision::Notified(files) = &decision {
            tracing::debug!(port = self.port(), files = ?files, "Reload scheduled");
        }

        Ok(decision)
    }

    fn on_build_failed(&mut self) {
        self.controller.on_build_failed();
        match self.options.failure_policy {
            FailurePolicy::ResetDiffState => self.classifier.reset(),
            FailurePolicy::KeepDiffState => self.classifier.discard_pending(),
        }
        tracing::debug!(port = self.port(), "Build failed, reload state reset");
    }
}

impl std::fmt::Debug for LiveReloadPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveReloadPlugin")
            .field("instance_id", &self.instance_id)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}
