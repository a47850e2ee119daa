//! Plugin options.

use std::time::Duration;

use crate::ignore::IgnoreSpec;
use crate::registry::DEFAULT_PORT;

/// What a failed build does to the per-asset diff state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep stored sizes and digests; only the build fingerprint is reset.
    #[default]
    KeepDiffState,
    /// Also forget stored sizes and digests, so the next successful build
    /// reports every candidate again.
    ResetDiffState,
}

/// Options for a [`LiveReloadPlugin`](crate::LiveReloadPlugin).
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug)]
pub struct PluginOptions {
    /// Port to listen on (`0` discovers a free port from 35729 upwards).
    pub port: u16,
    /// Asset names never reported.
    pub ignore: IgnoreSpec,
    /// Suppress informational log output.
    pub quiet: bool,
    /// Diff assets by content digest.
    pub use_source_hash: bool,
    /// Diff assets by byte size.
    pub use_source_size: bool,
    /// Prefix the client bootstrap script to emitted entry code.
    pub append_script_tag: bool,
    /// Delay between build completion and notification.
    pub delay: Duration,
    /// Host the client connects to (`None` uses the page's host).
    pub hostname: Option<String>,
    /// Protocol the client connects with (empty follows the page).
    pub protocol: String,
    /// Behaviour of the per-asset diff state on failed builds.
    pub failure_policy: FailurePolicy,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            ignore: IgnoreSpec::none(),
            quiet: false,
            use_source_hash: false,
            use_source_size: false,
            append_script_tag: false,
            delay: Duration::ZERO,
            hostname: None,
            protocol: String::new(),
            failure_policy: FailurePolicy::default(),
        }
    }
}
