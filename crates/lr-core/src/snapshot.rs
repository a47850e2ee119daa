//! Build snapshots and fingerprints.

use crate::asset::Asset;

/// Identifies a completed build.
///
/// Two fingerprints are equal iff the build hashes are equal and the child
/// hash sequences are equal element-wise, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildFingerprint {
    /// Top-level build hash.
    pub build_hash: String,
    /// Hash of each nested sub-build, in order.
    pub child_hashes: Vec<String>,
}

impl BuildFingerprint {
    /// Create a fingerprint.
    #[must_use]
    pub fn new(build_hash: impl Into<String>, child_hashes: Vec<String>) -> Self {
        Self {
            build_hash: build_hash.into(),
            child_hashes,
        }
    }
}

/// Result of one build as seen by the lifecycle hooks.
#[derive(Default)]
pub struct BuildSnapshot {
    /// Top-level build hash.
    pub hash: String,
    /// Child build hashes, in order.
    pub children: Vec<String>,
    /// Output assets of this build.
    pub assets: Vec<Box<dyn Asset>>,
}

impl BuildSnapshot {
    /// Create an empty snapshot for a build hash.
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            children: Vec::new(),
            assets: Vec::new(),
        }
    }

    /// Append a child build hash.
    #[must_use]
    pub fn with_child(mut self, hash: impl Into<String>) -> Self {
        self.children.push(hash.into());
        self
    }

    /// Append an asset.
    #[must_use]
    pub fn with_asset(mut self, asset: impl Asset + 'static) -> Self {
        self.assets.push(Box::new(asset));
        self
    }

    /// Fingerprint of this build.
    #[must_use]
    pub fn fingerprint(&self) -> BuildFingerprint {
        BuildFingerprint::new(self.hash.clone(), self.children.clone())
    }
}

impl std::fmt::Debug for BuildSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.assets.iter().map(|a| a.name()).collect();
        f.debug_struct("BuildSnapshot")
            .field("hash", &self.hash)
            .field("children", &self.children)
            .field("assets", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAsset;

    #[test]
    fn test_fingerprint_equality() {
        let a = BuildFingerprint::new("h", vec!["c1".to_owned(), "c2".to_owned()]);
        let b = BuildFingerprint::new("h", vec!["c1".to_owned(), "c2".to_owned()]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_child_order_matters() {
        let a = BuildFingerprint::new("h", vec!["c1".to_owned(), "c2".to_owned()]);
        let b = BuildFingerprint::new("h", vec!["c2".to_owned(), "c1".to_owned()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_build_hash_matters() {
        let a = BuildFingerprint::new("h1", Vec::new());
        let b = BuildFingerprint::new("h2", Vec::new());
        assert_ne!(a, b);
    }

    #[test]
    fn test_snapshot_fingerprint() {
        let snapshot = BuildSnapshot::new("abc")
            .with_child("child")
            .with_asset(MemoryAsset::new("a.js", "a"));

        assert_eq!(
            snapshot.fingerprint(),
            BuildFingerprint::new("abc", vec!["child".to_owned()])
        );
        assert!(format!("{snapshot:?}").contains("a.js"));
    }
}
