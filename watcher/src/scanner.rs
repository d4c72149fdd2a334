//! Startup scanning of watch roots.

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::WatchConfig;
use crate::error::{Result, WatcherError};
use crate::event::{FileEvent, FileEventKind};

/// Walk a watch root and emit its current files as synthetic `Added` events.
///
/// This is how a cold start reconciles disk state that changed while the
/// watcher was not running. Exclusion rules match live watching, so a file
/// the watcher would ignore never shows up in the scan either.
pub fn scan_directory(config: &WatchConfig) -> Result<Vec<FileEvent>> {
    if !config.path.exists() {
        return Err(WatcherError::DirectoryNotFound(
            config.path.display().to_string(),
        ));
    }
    if !config.path.is_dir() {
        return Err(WatcherError::NotADirectory(
            config.path.display().to_string(),
        ));
    }

    let mut walker = WalkDir::new(&config.path).follow_links(false);
    if let Some(depth) = config.max_depth {
        walker = walker.max_depth(depth);
    }

    let mut events = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry during scan: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if config.should_exclude(entry.path()) {
            continue;
        }

        events.push(FileEvent::new(FileEventKind::Added, entry.path()));
    }

    debug!(
        "Scanned {} with {} files",
        config.path.display(),
        events.len()
    );

    Ok(events)
}
