//! Change classification.
//!
//! Narrows the asset set of a completed build down to the names that should
//! trigger a client reload:
//!
//! 1. **Emission & ignore**: only emitted assets whose name does not match
//!    the [`IgnoreSpec`] are candidates. Nothing else about a dropped asset is
//!    ever read.
//! 2. **Size** (`use_source_size`): compares the byte size to the size stored
//!    for the previous build.
//! 3. **Hash** (`use_source_hash`): compares the SHA-256 content digest to the
//!    digest stored for the previous build.
//!
//! With neither check enabled every candidate is reported on every build.
//! With checks enabled a candidate is unchanged only when every enabled check
//! matches its stored value, so a content edit that keeps the size still
//! reloads.
//!
//! Stored per-asset values are committed only after the whole build was
//! classified; a content read error leaves the stored state untouched.

use std::collections::HashMap;

use crate::asset::{Asset, AssetError};
use crate::hash::content_hash;
use crate::ignore::IgnoreSpec;

/// Per-asset diff state carried across builds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetState {
    /// Content digest from the last build (hash diffing only).
    pub last_content_hash: Option<String>,
    /// Byte size from the last build (size diffing only).
    pub last_byte_size: Option<u64>,
}

/// Classification error.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// Asset content could not be read while hashing.
    #[error(transparent)]
    Source(#[from] AssetError),
}

/// Computes the notify-list for each build.
#[derive(Debug, Default)]
pub struct ChangeClassifier {
    ignore: IgnoreSpec,
    use_source_size: bool,
    use_source_hash: bool,
    states: HashMap<String, AssetState>,
    /// Digests computed at assets-available, consumed by the next `classify`.
    pending_hashes: HashMap<String, String>,
}

impl ChangeClassifier {
    /// Create a classifier.
    #[must_use]
    pub fn new(ignore: IgnoreSpec, use_source_size: bool, use_source_hash: bool) -> Self {
        Self {
            ignore,
            use_source_size,
            use_source_hash,
            states: HashMap::new(),
            pending_hashes: HashMap::new(),
        }
    }

    /// Returns `true` if the asset passes the emission and ignore filter.
    #[must_use]
    pub fn is_candidate(&self, asset: &dyn Asset) -> bool {
        asset.emitted() && !self.ignore.matches(asset.name())
    }

    /// Pre-compute content digests before the build is finalized.
    ///
    /// Only candidates are digested when hash diffing is enabled; assets
    /// that were not emitted or are ignored are never read.
    pub fn precompute(&mut self, assets: &[Box<dyn Asset>]) -> Result<(), ClassifyError> {
        if !self.use_source_hash {
            return Ok(());
        }

        for asset in assets {
            if !self.is_candidate(asset.as_ref()) {
                continue;
            }
            let digest = content_hash(&asset.source()?);
            self.pending_hashes.insert(asset.name().to_owned(), digest);
        }

        Ok(())
    }

    /// Classify a build's assets and return the names that changed.
    ///
    /// Names are returned in snapshot order.
    pub fn classify(&mut self, assets: &[Box<dyn Asset>]) -> Result<Vec<String>, ClassifyError> {
        let mut precomputed = std::mem::take(&mut self.pending_hashes);
        let mut staged = Vec::new();
        let mut include = Vec::new();

        for asset in assets {
            let asset: &dyn Asset = asset.as_ref();
            if !self.is_candidate(asset) {
                continue;
            }

            let name = asset.name();
            let mut state = self.states.get(name).cloned().unwrap_or_default();

            let size_changed = self.use_source_size.then(|| {
                let size = asset.size();
                let changed = state.last_byte_size != Some(size);
                state.last_byte_size = Some(size);
                changed
            });

            let hash_changed = if self.use_source_hash {
                let digest = match precomputed.remove(name) {
                    Some(digest) => digest,
                    None => content_hash(&asset.source()?),
                };
                let changed = state.last_content_hash.as_deref() != Some(digest.as_str());
                state.last_content_hash = Some(digest);
                Some(changed)
            } else {
                None
            };

            let changed = match (size_changed, hash_changed) {
                (None, None) => true,
                (Some(changed), None) | (None, Some(changed)) => changed,
                (Some(size), Some(hash)) => size || hash,
            };

            if size_changed.is_some() || hash_changed.is_some() {
                staged.push((name.to_owned(), state));
            }
            if changed {
                include.push(name.to_owned());
            }
        }

        self.states.extend(staged);
        tracing::debug!(
            assets = assets.len(),
            changed = include.len(),
            "Classified build assets"
        );

        Ok(include)
    }

    /// Stored state for an asset, if any.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<&AssetState> {
        self.states.get(name)
    }

    /// Seed the stored state for an asset.
    pub fn set_state(&mut self, name: impl Into<String>, state: AssetState) {
        self.states.insert(name.into(), state);
    }

    /// Forget all per-asset state and pending digests.
    pub fn reset(&mut self) {
        self.states.clear();
        self.discard_pending();
    }

    /// Drop digests precomputed for a build that will not be classified.
    pub fn discard_pending(&mut self) {
        self.pending_hashes.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::asset::MemoryAsset;

    /// Asset that counts how often its lazy accessors run.
    struct CountingAsset {
        inner: MemoryAsset,
        size_calls: Arc<AtomicUsize>,
        source_calls: Arc<AtomicUsize>,
    }

    impl Asset for CountingAsset {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn emitted(&self) -> bool {
            self.inner.emitted()
        }

        fn size(&self) -> u64 {
            self.size_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.size()
        }

        fn source(&self) -> Result<Cow<'_, [u8]>, AssetError> {
            self.source_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.source()
        }
    }

    /// Asset whose content cannot be read.
    struct BrokenAsset {
        emitted: bool,
    }

    impl Asset for BrokenAsset {
        fn name(&self) -> &str {
            "broken.js"
        }

        fn emitted(&self) -> bool {
            self.emitted
        }

        fn size(&self) -> u64 {
            1
        }

        fn source(&self) -> Result<Cow<'_, [u8]>, AssetError> {
            Err(AssetError::new(
                "broken.js",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ))
        }
    }

    fn assets(list: Vec<MemoryAsset>) -> Vec<Box<dyn Asset>> {
        list.into_iter()
            .map(|a| Box::new(a) as Box<dyn Asset>)
            .collect()
    }

    fn sorted(mut names: Vec<String>) -> Vec<String> {
        names.sort();
        names
    }

    #[test]
    fn test_coarse_mode_includes_emitted_assets() {
        let mut classifier = ChangeClassifier::default();
        let build = assets(vec![
            MemoryAsset::new("b.js", "b"),
            MemoryAsset::new("a.js", "a"),
            MemoryAsset::new("c.css", "c"),
            MemoryAsset::new("d.css", "").with_emitted(false),
        ]);

        let include = classifier.classify(&build).unwrap();
        assert_eq!(sorted(include), vec!["a.js", "b.js", "c.css"]);

        // Coarse mode reports everything again
        let include = classifier.classify(&build).unwrap();
        assert_eq!(include.len(), 3);
        assert!(classifier.state("a.js").is_none());
    }

    #[test]
    fn test_ignored_assets_are_excluded() {
        let mut classifier =
            ChangeClassifier::new(IgnoreSpec::new(["/\\.css$/"]).unwrap(), false, false);
        let build = assets(vec![
            MemoryAsset::new("b.js", "b"),
            MemoryAsset::new("a.js", "a"),
            MemoryAsset::new("c.css", "c"),
            MemoryAsset::new("d.css", "").with_emitted(false),
        ]);

        let include = classifier.classify(&build).unwrap();
        assert_eq!(sorted(include), vec!["a.js", "b.js"]);
    }

    #[test]
    fn test_ignored_assets_as_set() {
        let mut classifier =
            ChangeClassifier::new(IgnoreSpec::new(["/.map/", "/.json/"]).unwrap(), false, false);
        let build = assets(vec![
            MemoryAsset::new("b.js", "b"),
            MemoryAsset::new("a.js", "a"),
            MemoryAsset::new("c.map", "c"),
            MemoryAsset::new("d.json", "d"),
        ]);

        let include = classifier.classify(&build).unwrap();
        assert_eq!(sorted(include), vec!["a.js", "b.js"]);
    }

    #[test]
    fn test_hash_filter_drops_unchanged_content() {
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), false, true);
        classifier.set_state(
            "b.js",
            AssetState {
                last_content_hash: Some("Wrong hash".to_owned()),
                last_byte_size: None,
            },
        );
        classifier.set_state(
            "a.js",
            AssetState {
                last_content_hash: Some(content_hash(b"asdf")),
                last_byte_size: None,
            },
        );
        let build = assets(vec![
            MemoryAsset::new("c.js", "asdf"),
            MemoryAsset::new("b.js", "asdf"),
            MemoryAsset::new("a.js", "asdf"),
        ]);

        classifier.precompute(&build).unwrap();
        let include = classifier.classify(&build).unwrap();
        assert_eq!(sorted(include), vec!["b.js", "c.js"]);
        assert_eq!(
            classifier.state("b.js").unwrap().last_content_hash,
            Some(content_hash(b"asdf"))
        );
    }

    #[test]
    fn test_size_filter_drops_unchanged_size() {
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), true, false);
        for (name, size) in [("b.js", 20), ("a.js", 20)] {
            classifier.set_state(
                name,
                AssetState {
                    last_content_hash: None,
                    last_byte_size: Some(size),
                },
            );
        }
        let build = assets(vec![
            MemoryAsset::new("c.js", vec![b'c'; 10]),
            MemoryAsset::new("b.js", vec![b'b'; 10]),
            MemoryAsset::new("a.js", vec![b'a'; 20]),
        ]);

        let include = classifier.classify(&build).unwrap();
        assert_eq!(sorted(include), vec!["b.js", "c.js"]);
        assert_eq!(classifier.state("b.js").unwrap().last_byte_size, Some(10));
        assert_eq!(classifier.state("b.js").unwrap().last_content_hash, None);
    }

    #[test]
    fn test_hash_filter_is_idempotent() {
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), false, true);
        let build = assets(vec![MemoryAsset::new("a.js", "let a = 1;")]);

        assert_eq!(classifier.classify(&build).unwrap(), vec!["a.js"]);
        assert!(classifier.classify(&build).unwrap().is_empty());
    }

    #[test]
    fn test_size_and_hash_identical_build_is_empty() {
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), true, true);
        let build = assets(vec![MemoryAsset::new("a.js", "aaaa")]);

        assert_eq!(classifier.classify(&build).unwrap(), vec!["a.js"]);
        assert!(classifier.classify(&build).unwrap().is_empty());
    }

    #[test]
    fn test_content_change_with_same_size_is_reported() {
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), true, true);
        let first = assets(vec![MemoryAsset::new("a.js", "aaaa")]);
        let second = assets(vec![MemoryAsset::new("a.js", "bbbb")]);

        classifier.classify(&first).unwrap();
        assert_eq!(classifier.classify(&second).unwrap(), vec!["a.js"]);
        assert_eq!(
            classifier.state("a.js"),
            Some(&AssetState {
                last_content_hash: Some(content_hash(b"bbbb")),
                last_byte_size: Some(4),
            })
        );
    }

    #[test]
    fn test_filtered_assets_are_never_read() {
        let size_calls = Arc::new(AtomicUsize::new(0));
        let source_calls = Arc::new(AtomicUsize::new(0));
        let mut classifier =
            ChangeClassifier::new(IgnoreSpec::new(["*.css"]).unwrap(), true, true);
        let build: Vec<Box<dyn Asset>> = vec![
            Box::new(CountingAsset {
                inner: MemoryAsset::new("skip.js", "x").with_emitted(false),
                size_calls: Arc::clone(&size_calls),
                source_calls: Arc::clone(&source_calls),
            }),
            Box::new(CountingAsset {
                inner: MemoryAsset::new("app.css", "x"),
                size_calls: Arc::clone(&size_calls),
                source_calls: Arc::clone(&source_calls),
            }),
        ];

        assert!(classifier.classify(&build).unwrap().is_empty());
        assert_eq!(size_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source_calls.load(Ordering::SeqCst), 0);
        assert!(classifier.state("skip.js").is_none());
        assert!(classifier.state("app.css").is_none());
    }

    #[test]
    fn test_size_only_mode_never_reads_content() {
        let source_calls = Arc::new(AtomicUsize::new(0));
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), true, false);
        let build: Vec<Box<dyn Asset>> = vec![Box::new(CountingAsset {
            inner: MemoryAsset::new("a.js", "abc"),
            size_calls: Arc::new(AtomicUsize::new(0)),
            source_calls: Arc::clone(&source_calls),
        })];

        classifier.precompute(&build).unwrap();
        classifier.classify(&build).unwrap();
        assert_eq!(source_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_precomputed_digest_is_used_once() {
        let source_calls = Arc::new(AtomicUsize::new(0));
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), false, true);
        let build: Vec<Box<dyn Asset>> = vec![Box::new(CountingAsset {
            inner: MemoryAsset::new("a.js", "abc"),
            size_calls: Arc::new(AtomicUsize::new(0)),
            source_calls: Arc::clone(&source_calls),
        })];

        classifier.precompute(&build).unwrap();
        classifier.classify(&build).unwrap();
        assert_eq!(source_calls.load(Ordering::SeqCst), 1);

        // Without a precompute pass the digest is computed lazily
        classifier.classify(&build).unwrap();
        assert_eq!(source_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_read_error_leaves_state_untouched() {
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), true, true);
        let build: Vec<Box<dyn Asset>> = vec![
            Box::new(MemoryAsset::new("a.js", "a")),
            Box::new(BrokenAsset { emitted: true }),
        ];

        let err = classifier.classify(&build).unwrap_err();
        assert!(err.to_string().contains("broken.js"));
        assert!(classifier.state("a.js").is_none());
        assert!(classifier.state("broken.js").is_none());
    }

    #[test]
    fn test_precompute_skips_unemitted_assets() {
        let source_calls = Arc::new(AtomicUsize::new(0));
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), false, true);
        let build: Vec<Box<dyn Asset>> = vec![
            Box::new(MemoryAsset::new("a.js", "a")),
            Box::new(BrokenAsset { emitted: false }),
            Box::new(CountingAsset {
                inner: MemoryAsset::new("stale.js", "s").with_emitted(false),
                size_calls: Arc::new(AtomicUsize::new(0)),
                source_calls: Arc::clone(&source_calls),
            }),
        ];

        classifier.precompute(&build).unwrap();
        assert_eq!(source_calls.load(Ordering::SeqCst), 0);
        assert_eq!(classifier.classify(&build).unwrap(), vec!["a.js"]);
    }

    #[test]
    fn test_discard_pending_drops_precomputed_digests() {
        let source_calls = Arc::new(AtomicUsize::new(0));
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), false, true);
        let build: Vec<Box<dyn Asset>> = vec![Box::new(CountingAsset {
            inner: MemoryAsset::new("a.js", "abc"),
            size_calls: Arc::new(AtomicUsize::new(0)),
            source_calls: Arc::clone(&source_calls),
        })];

        classifier.precompute(&build).unwrap();
        classifier.discard_pending();
        classifier.classify(&build).unwrap();

        // Digest is read again instead of taken from the discarded pass
        assert_eq!(source_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reset_forgets_state() {
        let mut classifier = ChangeClassifier::new(IgnoreSpec::none(), false, true);
        let build = assets(vec![MemoryAsset::new("a.js", "a")]);

        classifier.classify(&build).unwrap();
        classifier.reset();
        assert!(classifier.state("a.js").is_none());
        assert_eq!(classifier.classify(&build).unwrap(), vec!["a.js"]);
    }
}
