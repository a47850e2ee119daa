//! Change batching.
//!
//! Bundlers write many files per build, often several times each. Changes are
//! coalesced per path and released as one batch once the output directory has
//! been quiet for the debounce period, so one build produces one snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::event::{Change, ChangeKind};

#[derive(Default)]
struct Pending {
    changes: HashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
}

/// Thread-safe change batcher.
pub(crate) struct ChangeBatcher {
    pending: Mutex<Pending>,
    quiet_period: Duration,
}

impl ChangeBatcher {
    /// Create a batcher releasing changes after `quiet_period` without events.
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            quiet_period,
        }
    }

    /// Record a change. Called from the watcher thread.
    pub fn record(&self, path: PathBuf, kind: ChangeKind) {
        use std::collections::hash_map::Entry;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.last_event = Some(Instant::now());

        match pending.changes.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(kind);
            }
            Entry::Occupied(mut entry) => match Self::coalesce(*entry.get(), kind) {
                Some(coalesced) => {
                    entry.insert(coalesced);
                }
                None => {
                    entry.remove();
                }
            },
        }
    }

    /// Coalesce two kinds for the same path.
    ///
    /// Returns `None` when the path was created and removed inside the batch.
    #[allow(clippy::match_same_arms)]
    fn coalesce(existing: ChangeKind, new: ChangeKind) -> Option<ChangeKind> {
        use ChangeKind::{Created, Modified, Removed};

        match (existing, new) {
            (Created, Created | Modified) => Some(Created),
            (Created, Removed) => None,
            (Modified, Created) => Some(Created),
            (Modified, Modified) => Some(Modified),
            (Modified, Removed) => Some(Removed),
            (Removed, Created) => Some(Modified),
            (Removed, Modified | Removed) => Some(Removed),
        }
    }

    /// Take the pending batch if the quiet period has elapsed.
    ///
    /// Returns an empty batch while events are still arriving. A batch whose
    /// changes all cancelled out is dropped.
    pub fn take_ready(&self) -> Vec<Change> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(last_event) = pending.last_event else {
            return Vec::new();
        };
        if last_event.elapsed() < self.quiet_period {
            return Vec::new();
        }

        pending.last_event = None;
        let mut batch: Vec<Change> = pending
            .changes
            .drain()
            .map(|(path, kind)| Change { path, kind })
            .collect();
        batch.sort_by(|a, b| a.path.cmp(&b.path));
        batch
    }
}
