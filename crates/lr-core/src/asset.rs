//! Emitted build assets.
//!
//! The host exposes each output unit of a build through the [`Asset`] trait.
//! Size and content are read lazily: the classifier only asks for them when an
//! earlier filter stage has not already excluded the asset.

use std::borrow::Cow;

/// Error reading an asset's content.
#[derive(Debug, thiserror::Error)]
#[error("failed to read asset `{name}`: {source}")]
pub struct AssetError {
    /// Asset name.
    pub name: String,
    /// Underlying I/O error.
    #[source]
    pub source: std::io::Error,
}

impl AssetError {
    /// Wrap an I/O error for the named asset.
    #[must_use]
    pub fn new(name: impl Into<String>, source: std::io::Error) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// One emitted output unit of a build.
pub trait Asset: Send + Sync {
    /// Unique key within a build (e.g. `"main.js"`, `"css/app.css"`).
    fn name(&self) -> &str;

    /// Whether the build actually wrote this asset.
    fn emitted(&self) -> bool;

    /// Size of the content in bytes.
    fn size(&self) -> u64;

    /// Asset content.
    fn source(&self) -> Result<Cow<'_, [u8]>, AssetError>;
}

/// In-memory [`Asset`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryAsset {
    name: String,
    emitted: bool,
    content: Vec<u8>,
}

impl MemoryAsset {
    /// Create an emitted asset with the given content.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            emitted: true,
            content: content.into(),
        }
    }

    /// Set the emitted flag.
    #[must_use]
    pub fn with_emitted(mut self, emitted: bool) -> Self {
        self.emitted = emitted;
        self
    }
}

impl Asset for MemoryAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn emitted(&self) -> bool {
        self.emitted
    }

    fn size(&self) -> u64 {
        self.content.len() as u64
    }

    fn source(&self) -> Result<Cow<'_, [u8]>, AssetError> {
        Ok(Cow::Borrowed(&self.content))
    }
}
