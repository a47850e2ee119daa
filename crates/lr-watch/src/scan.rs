//! Output directory snapshots.
//!
//! A scan lists every file below the output directory and fingerprints it:
//!
//! - build hash: digest over name, size and mtime of the top-level files
//! - child hashes: the same digest per top-level subdirectory, sorted by
//!   directory name
//!
//! Hidden entries (starting with `.`) are skipped.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use lr_core::BuildSnapshot;
use sha2::{Digest, Sha256};

use crate::WatchError;
use crate::asset::FileAsset;

/// Which scanned files count as written in this build.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Emitted<'a> {
    /// Every file (initial build).
    All,
    /// Only files named in the change batch.
    Touched(&'a HashSet<String>),
}

impl Emitted<'_> {
    fn contains(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Touched(names) => names.contains(name),
        }
    }
}

/// A file found by the scan.
struct ScannedFile {
    name: String,
    path: PathBuf,
    size: u64,
    mtime_nanos: u128,
}

/// Scan `root` into a build snapshot.
pub(crate) fn scan_output(root: &Path, emitted: Emitted<'_>) -> Result<BuildSnapshot, WatchError> {
    let mut files = Vec::new();
    scan_directory(root, "", &mut files)?;
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let mut root_hasher = Sha256::new();
    let mut child_hashers: BTreeMap<&str, Sha256> = BTreeMap::new();
    for file in &files {
        let hasher = match file.name.split_once('/') {
            Some((dir, _)) => child_hashers.entry(dir).or_default(),
            None => &mut root_hasher,
        };
        hasher.update(file.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(file.size.to_le_bytes());
        hasher.update(file.mtime_nanos.to_le_bytes());
    }

    let mut snapshot = BuildSnapshot::new(hex::encode(root_hasher.finalize()));
    for hasher in child_hashers.into_values() {
        snapshot = snapshot.with_child(hex::encode(hasher.finalize()));
    }
    for file in files {
        let is_emitted = emitted.contains(&file.name);
        snapshot = snapshot.with_asset(FileAsset::new(file.name, file.path, file.size, is_emitted));
    }

    Ok(snapshot)
}

/// Collect files below `dir`, naming them relative to the output root.
fn scan_directory(dir: &Path, prefix: &str, files: &mut Vec<ScannedFile>) -> Result<(), WatchError> {
    let entries = fs::read_dir(dir).map_err(|e| WatchError::scan(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| WatchError::scan(dir, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let name = if prefix.is_empty() {
            file_name
        } else {
            format!("{prefix}/{file_name}")
        };

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            // Removed between listing and stat
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(WatchError::scan(&path, e)),
        };

        if metadata.is_dir() {
            scan_directory(&path, &name, files)?;
        } else if metadata.is_file() {
            let mtime_nanos = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_nanos());
            files.push(ScannedFile {
                name,
                path,
                size: metadata.len(),
                mtime_nanos,
            });
        }
    }

    Ok(())
}

/// Name of `path` relative to `root`, `/`-separated.
pub(crate) fn asset_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use lr_core::Asset;
    use pretty_assertions::assert_eq;

    use super::*;

    fn write(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn names(snapshot: &BuildSnapshot) -> Vec<&str> {
        snapshot.assets.iter().map(|a| a.name()).collect()
    }

    #[test]
    fn test_scan_lists_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.js", "a");
        write(dir.path(), "css/site.css", "b");
        write(dir.path(), "css/print/print.css", "c");
        write(dir.path(), ".cache/x", "hidden");

        let snapshot = scan_output(dir.path(), Emitted::All).unwrap();

        assert_eq!(
            names(&snapshot),
            vec!["css/print/print.css", "css/site.css", "main.js"]
        );
        assert!(snapshot.assets.iter().all(|a| a.emitted()));
        assert_eq!(snapshot.children.len(), 1);
    }

    #[test]
    fn test_scan_marks_touched_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.js", "a");
        write(dir.path(), "b.js", "b");
        let touched: HashSet<String> = ["b.js".to_owned()].into();

        let snapshot = scan_output(dir.path(), Emitted::Touched(&touched)).unwrap();

        let emitted: Vec<_> = snapshot
            .assets
            .iter()
            .map(|a| (a.name(), a.emitted()))
            .collect();
        assert_eq!(emitted, vec![("a.js", false), ("b.js", true)]);
    }

    #[test]
    fn test_fingerprint_stable_without_changes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.js", "a");
        write(dir.path(), "lib/b.js", "b");

        let first = scan_output(dir.path(), Emitted::All).unwrap();
        let second = scan_output(dir.path(), Emitted::All).unwrap();

        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_child_change_only_moves_child_hash() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.js", "a");
        write(dir.path(), "lib/b.js", "b");
        let before = scan_output(dir.path(), Emitted::All).unwrap();

        write(dir.path(), "lib/b.js", "bigger");
        let after = scan_output(dir.path(), Emitted::All).unwrap();

        assert_eq!(before.hash, after.hash);
        assert_ne!(before.children, after.children);
    }

    #[test]
    fn test_top_level_change_moves_build_hash() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.js", "a");
        let before = scan_output(dir.path(), Emitted::All).unwrap();

        write(dir.path(), "a.js", "longer");
        let after = scan_output(dir.path(), Emitted::All).unwrap();

        assert_ne!(before.hash, after.hash);
    }

    #[test]
    fn test_missing_root_is_scan_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_output(&dir.path().join("missing"), Emitted::All).unwrap_err();
        assert!(matches!(err, WatchError::Scan { .. }));
    }

    #[test]
    fn test_asset_name() {
        let root = Path::new("/out");
        assert_eq!(
            asset_name(root, Path::new("/out/css/site.css")).as_deref(),
            Some("css/site.css")
        );
        assert_eq!(asset_name(root, Path::new("/out")), None);
        assert_eq!(asset_name(root, Path::new("/elsewhere/a.js")), None);
    }
}
