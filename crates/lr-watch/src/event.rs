//! File change events.

use std::path::PathBuf;

/// Kind of change to an output file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// File was created.
    Created,
    /// File was modified.
    Modified,
    /// File was removed.
    Removed,
}

impl ChangeKind {
    /// Map a notify event kind; `None` for access and metadata-only events.
    pub(crate) fn from_notify(kind: &notify::EventKind) -> Option<Self> {
        match kind {
            notify::EventKind::Create(_) => Some(Self::Created),
            notify::EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => None,
            notify::EventKind::Modify(_) => Some(Self::Modified),
            notify::EventKind::Remove(_) => Some(Self::Removed),
            _ => None,
        }
    }

    /// Returns `true` if the file was written by this change.
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::Created | Self::Modified)
    }
}

/// A coalesced change to one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    /// File system path.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: ChangeKind,
}
