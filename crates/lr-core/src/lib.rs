//! Live reload core.
//!
//! Decides, after each build in watch mode, whether browsers should reload and
//! which output files changed, then tells a listening reload channel.
//!
//! # Architecture
//!
//! ```text
//! build host ──BuildHooks──► LiveReloadPlugin
//!                               │
//!                               ├─► ChangeClassifier (emitted, ignore, size, hash)
//!                               │
//!                               └─► Controller ──► PortRegistry ──Binder──► NotificationService
//!                                       │
//!                                       └─► Dispatcher (delayed send)
//! ```
//!
//! The reload channel is abstracted behind [`Binder`] and
//! [`NotificationService`] so hosts can plug in any transport.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lr_core::{BuildHooks, BuildSnapshot, LiveReloadPlugin, MemoryAsset, PluginOptions, PortRegistry};
//!
//! let registry = Arc::new(PortRegistry::new());
//! let mut plugin = LiveReloadPlugin::new(PluginOptions::default(), registry, binder);
//! plugin.on_watch_start().await?;
//!
//! let snapshot = BuildSnapshot::new("4f2a").with_asset(MemoryAsset::new("main.js", "…"));
//! plugin.on_build_done(&snapshot)?;
//! ```

mod asset;
pub mod bootstrap;
mod classifier;
mod controller;
mod dispatcher;
mod hash;
mod ignore;
mod options;
mod plugin;
mod registry;
mod service;
mod snapshot;

pub use asset::{Asset, AssetError, MemoryAsset};
pub use classifier::{AssetState, ChangeClassifier, ClassifyError};
pub use controller::{Controller, Decision, LifecycleState, SkipReason, StartError};
pub use dispatcher::Dispatcher;
pub use hash::content_hash;
pub use ignore::{IgnoreError, IgnoreSpec};
pub use options::{FailurePolicy, PluginOptions};
pub use plugin::{BuildHooks, LiveReloadPlugin};
pub use registry::{AcquireError, Acquired, DEFAULT_PORT, PortRegistry, discover_port};
pub use service::{Binder, ListenError, NotificationService};
pub use snapshot::{BuildFingerprint, BuildSnapshot};
