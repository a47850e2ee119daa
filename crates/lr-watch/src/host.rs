//! Directory build host.
//!
//! Treats every settled batch of changes in an output directory as one
//! completed build and drives [`BuildHooks`] accordingly.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lr_core::{BuildHooks, Decision};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::WatchError;
use crate::debouncer::ChangeBatcher;
use crate::event::{Change, ChangeKind};
use crate::scan::{Emitted, asset_name, scan_output};

/// How often the pending batch is checked.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of one build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The build completed and the hooks decided.
    Built(Decision),
    /// The output could not be scanned or read.
    Failed,
}

/// Watches a build output directory.
#[derive(Debug)]
pub struct DirectoryHost {
    root: PathBuf,
    debounce: Duration,
}

impl DirectoryHost {
    /// Create a host for `root`, creating the directory if missing.
    ///
    /// # Arguments
    ///
    /// * `root` - Build output directory
    /// * `debounce` - Quiet period after which a change batch counts as a build
    pub fn new(root: &Path, debounce: Duration) -> Result<Self, WatchError> {
        if !root.exists() {
            std::fs::create_dir_all(root).map_err(|e| WatchError::scan(root, e))?;
            tracing::info!(path = %root.display(), "Created output directory");
        }
        let root = std::fs::canonicalize(root).map_err(|e| WatchError::scan(root, e))?;

        Ok(Self { root, debounce })
    }

    /// Canonical output directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build with every file counted as written.
    pub async fn initial_build<H: BuildHooks>(
        &self,
        hooks: &mut H,
    ) -> Result<BuildOutcome, WatchError> {
        self.build(hooks, Emitted::All).await
    }

    /// Build after a change batch; only written files count as emitted.
    pub async fn rebuild<H: BuildHooks>(
        &self,
        hooks: &mut H,
        changes: &[Change],
    ) -> Result<BuildOutcome, WatchError> {
        let touched: HashSet<String> = changes
            .iter()
            .filter(|c| c.kind.is_write())
            .filter_map(|c| asset_name(&self.root, &c.path))
            .collect();
        tracing::debug!(changes = changes.len(), written = touched.len(), "Rebuilding");

        self.build(hooks, Emitted::Touched(&touched)).await
    }

    /// Watch until `shutdown` resolves.
    ///
    /// Runs an initial build, then one build per settled change batch.
    /// Failed builds are reported to the hooks and watching continues.
    pub async fn run<H, F>(&self, hooks: &mut H, shutdown: F) -> Result<(), WatchError>
    where
        H: BuildHooks,
        F: Future<Output = ()>,
    {
        let batcher = Arc::new(ChangeBatcher::new(self.debounce));
        let _watcher = self.watch(Arc::clone(&batcher))?;
        tracing::info!(path = %self.root.display(), "Watching output directory");

        self.initial_build(hooks).await?;

        let mut interval = tokio::time::interval(POLL_INTERVAL);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = interval.tick() => {
                    let batch = batcher.take_ready();
                    if !batch.is_empty() {
                        self.rebuild(hooks, &batch).await?;
                    }
                }
            }
        }

        tracing::debug!(path = %self.root.display(), "Stopped watching");
        Ok(())
    }

    /// Start a recursive watcher feeding `batcher`.
    fn watch(&self, batcher: Arc<ChangeBatcher>) -> Result<RecommendedWatcher, WatchError> {
        let root = self.root.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let Some(kind) = ChangeKind::from_notify(&event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        if path.starts_with(&root) {
                            batcher.record(path, kind);
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "File watcher error"),
            })?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        Ok(watcher)
    }

    async fn build<H: BuildHooks>(
        &self,
        hooks: &mut H,
        emitted: Emitted<'_>,
    ) -> Result<BuildOutcome, WatchError> {
        hooks.on_watch_start().await?;

        let snapshot = match scan_output(&self.root, emitted) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Build failed");
                hooks.on_build_failed();
                return Ok(BuildOutcome::Failed);
            }
        };

        let decision = hooks
            .on_assets_available(&snapshot)
            .and_then(|()| hooks.on_build_done(&snapshot));

        match decision {
            Ok(decision) => {
                tracing::debug!(hash = %snapshot.hash, ?decision, "Build complete");
                Ok(BuildOutcome::Built(decision))
            }
            Err(e) => {
                tracing::error!(error = %e, "Build failed");
                hooks.on_build_failed();
                Ok(BuildOutcome::Failed)
            }
        }
    }
}
