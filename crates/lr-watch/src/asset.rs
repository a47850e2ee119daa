//! Output files as build assets.

use std::borrow::Cow;
use std::path::PathBuf;

use lr_core::{Asset, AssetError};

/// A file in the watched output directory.
///
/// Size comes from the scan; content is read only when hashed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAsset {
    name: String,
    path: PathBuf,
    size: u64,
    emitted: bool,
}

impl FileAsset {
    /// Create an asset.
    ///
    /// # Arguments
    ///
    /// * `name` - Path relative to the output directory, `/`-separated
    /// * `path` - Absolute file path
    /// * `size` - Size in bytes at scan time
    /// * `emitted` - Whether the file was written in this build
    #[must_use]
    pub fn new(name: impl Into<String>, path: PathBuf, size: u64, emitted: bool) -> Self {
        Self {
            name: name.into(),
            path,
            size,
            emitted,
        }
    }

    /// Absolute file path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Asset for FileAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn emitted(&self) -> bool {
        self.emitted
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn source(&self) -> Result<Cow<'_, [u8]>, AssetError> {
        std::fs::read(&self.path)
            .map(Cow::Owned)
            .map_err(|e| AssetError::new(self.name.clone(), e))
    }
}
