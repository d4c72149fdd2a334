//! File events emitted by the watcher.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A filesystem event, reduced to what the reconciler cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEvent {
    /// What happened.
    pub kind: FileEventKind,

    /// Path to the affected file.
    pub path: PathBuf,

    /// When the event was observed.
    pub timestamp: DateTime<Utc>,
}

impl FileEvent {
    /// Create a new file event.
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Kind of file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    /// File appeared.
    Added,

    /// File content changed.
    Changed,

    /// File disappeared.
    Removed,
}

impl FileEventKind {
    /// Collapse a notify event kind onto the reconciler's three-state model.
    ///
    /// Renames surface as a removal of the old path and an addition of the
    /// new one; access and metadata noise is dropped.
    pub fn from_notify(kind: notify::EventKind) -> Option<Self> {
        use notify::event::{ModifyKind, RenameMode};

        match kind {
            notify::EventKind::Create(_) => Some(Self::Added),
            notify::EventKind::Remove(_) => Some(Self::Removed),
            notify::EventKind::Modify(modify) => match modify {
                ModifyKind::Name(RenameMode::From) => Some(Self::Removed),
                ModifyKind::Name(RenameMode::To) => Some(Self::Added),
                ModifyKind::Metadata(_) => None,
                _ => Some(Self::Changed),
            },
            notify::EventKind::Access(_) => None,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind, RenameMode};
    use std::path::Path;

    #[test]
    fn test_event_creation() {
        let event = FileEvent::new(FileEventKind::Added, "/test/file.txt");
        assert_eq!(event.kind, FileEventKind::Added);
        assert_eq!(event.path, Path::new("/test/file.txt"));
    }

    #[test]
    fn test_notify_kind_collapse() {
        assert_eq!(
            FileEventKind::from_notify(notify::EventKind::Create(CreateKind::File)),
            Some(FileEventKind::Added)
        );
        assert_eq!(
            FileEventKind::from_notify(notify::EventKind::Modify(ModifyKind::Data(
                DataChange::Content
            ))),
            Some(FileEventKind::Changed)
        );
        assert_eq!(
            FileEventKind::from_notify(notify::EventKind::Remove(RemoveKind::File)),
            Some(FileEventKind::Removed)
        );
    }

    #[test]
    fn test_rename_splits_into_remove_and_add() {
        assert_eq!(
            FileEventKind::from_notify(notify::EventKind::Modify(ModifyKind::Name(
                RenameMode::From
            ))),
            Some(FileEventKind::Removed)
        );
        assert_eq!(
            FileEventKind::from_notify(notify::EventKind::Modify(ModifyKind::Name(
                RenameMode::To
            ))),
            Some(FileEventKind::Added)
        );
    }

    #[test]
    fn test_noise_dropped() {
        assert_eq!(
            FileEventKind::from_notify(notify::EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::Any
            ))),
            None
        );
        assert_eq!(
            FileEventKind::from_notify(notify::EventKind::Access(
                notify::event::AccessKind::Any
            )),
            None
        );
    }
}
