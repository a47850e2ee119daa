//! Output directory watcher for lr.
//!
//! A bundler-agnostic build host: any tool that writes its output into a
//! directory gets live reload by pointing a [`DirectoryHost`] at it. Each
//! settled batch of file changes is treated as one completed build; written
//! files are the build's emitted assets.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use lr_watch::DirectoryHost;
//!
//! let host = DirectoryHost::new(Path::new("dist"), Duration::from_millis(100))?;
//! host.run(&mut plugin, tokio::signal::ctrl_c().map(|_| ())).await?;
//! ```

mod asset;
mod debouncer;
mod event;
mod host;
mod scan;

use std::path::{Path, PathBuf};

pub use asset::FileAsset;
pub use event::{Change, ChangeKind};
pub use host::{BuildOutcome, DirectoryHost};

/// Watch error.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The file watcher could not be set up.
    #[error("Failed to watch output directory: {0}")]
    Notify(#[from] notify::Error),
    /// The output directory could not be read.
    #[error("Failed to scan {}: {source}", path.display())]
    Scan {
        /// Directory or file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The reload plugin failed to start.
    #[error(transparent)]
    Start(#[from] lr_core::StartError),
}

impl WatchError {
    pub(crate) fn scan(path: &Path, source: std::io::Error) -> Self {
        Self::Scan {
            path: path.to_path_buf(),
            source,
        }
    }
}
