//! Directory watcher implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::error::{Result, WatcherError};
use crate::event::{FileEvent, FileEventKind};

const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Watches configured directories and emits debounced [`FileEvent`]s.
///
/// Raw notify events flow through an internal channel into a debounce task
/// that holds each path until its stability window elapses. Only the latest
/// event per path survives the window, so a burst of writes to one file
/// surfaces downstream as a single event.
pub struct DirectoryWatcher {
    /// Watched directories.
    configs: Arc<RwLock<HashMap<PathBuf, WatchConfig>>>,

    /// Internal notify watcher. The raw event sender lives inside its
    /// callback, so dropping the watcher closes the debounce pipeline.
    watcher: Option<RecommendedWatcher>,

    /// Debounce task handle.
    debounce_task: Option<JoinHandle<()>>,

    /// Debounced event sender.
    event_tx: mpsc::Sender<FileEvent>,

    /// Debounced event receiver (for consumers).
    event_rx: Arc<RwLock<mpsc::Receiver<FileEvent>>>,

    /// Whether the watcher is running.
    running: Arc<RwLock<bool>>,
}

impl DirectoryWatcher {
    /// Create a new directory watcher.
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            configs: Arc::new(RwLock::new(HashMap::new())),
            watcher: None,
            debounce_task: None,
            event_tx,
            event_rx: Arc::new(RwLock::new(event_rx)),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Add a directory to watch.
    pub async fn add(&mut self, config: WatchConfig) -> Result<()> {
        let path = config.path.clone();

        if !path.exists() {
            return Err(WatcherError::DirectoryNotFound(path.display().to_string()));
        }
        if !path.is_dir() {
            return Err(WatcherError::NotADirectory(path.display().to_string()));
        }

        {
            let configs = self.configs.read().await;
            if configs.contains_key(&path) {
                return Err(WatcherError::AlreadyWatching(path.display().to_string()));
            }
        }

        info!("Adding directory to watch: {}", path.display());
        self.configs.write().await.insert(path.clone(), config);

        if *self.running.read().await {
            if let Some(ref mut watcher) = self.watcher {
                watcher.watch(&path, RecursiveMode::Recursive)?;
            }
        }

        Ok(())
    }

    /// Remove a directory from watching.
    pub async fn remove(&mut self, path: &Path) -> Result<()> {
        let mut configs = self.configs.write().await;

        if configs.remove(path).is_none() {
            return Err(WatcherError::DirectoryNotFound(path.display().to_string()));
        }

        if let Some(ref mut watcher) = self.watcher {
            let _ = watcher.unwatch(path);
        }

        info!("Removed directory from watch: {}", path.display());
        Ok(())
    }

    /// Start watching all configured directories.
    pub async fn start(&mut self) -> Result<()> {
        if *self.running.read().await {
            return Ok(());
        }

        let (raw_tx, raw_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let configs = self.configs.clone();

        let watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let Some(kind) = FileEventKind::from_notify(event.kind) else {
                        return;
                    };

                    for path in event.paths {
                        let excluded = is_excluded(&configs.blocking_read(), &path);
                        if excluded {
                            continue;
                        }

                        if raw_tx.blocking_send(FileEvent::new(kind, &path)).is_err() {
                            error!("Event pipeline closed, dropping {}", path.display());
                        }
                    }
                }
                Err(e) => error!("Watch error: {e}"),
            },
        )?;

        self.watcher = Some(watcher);

        let window = {
            let configs = self.configs.read().await;
            configs
                .values()
                .map(|c| c.debounce)
                .min()
                .unwrap_or(crate::config::DEFAULT_DEBOUNCE)
        };
        self.debounce_task = Some(tokio::spawn(debounce_loop(
            raw_rx,
            self.event_tx.clone(),
            window,
        )));

        {
            let configs = self.configs.read().await;
            for path in configs.keys() {
                if let Some(ref mut w) = self.watcher {
                    match w.watch(path, RecursiveMode::Recursive) {
                        Ok(()) => debug!("Started watching: {}", path.display()),
                        Err(e) => warn!("Failed to watch {}: {e}", path.display()),
                    }
                }
            }
        }

        *self.running.write().await = true;
        info!("Directory watcher started");

        Ok(())
    }

    /// Stop watching all directories.
    ///
    /// Pending debounced events are flushed before this returns.
    pub async fn stop(&mut self) {
        if let Some(ref mut watcher) = self.watcher {
            let configs = self.configs.read().await;
            for path in configs.keys() {
                let _ = watcher.unwatch(path);
            }
        }

        // Dropping the notify watcher drops the raw sender, which lets the
        // debounce task flush and exit.
        self.watcher = None;
        if let Some(task) = self.debounce_task.take() {
            let _ = task.await;
        }

        *self.running.write().await = false;
        info!("Directory watcher stopped");
    }

    /// Check if the watcher is running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Get the debounced event receiver.
    pub fn events(&self) -> &Arc<RwLock<mpsc::Receiver<FileEvent>>> {
        &self.event_rx
    }

    /// Get configured directories.
    pub async fn directories(&self) -> Vec<WatchConfig> {
        self.configs.read().await.values().cloned().collect()
    }

    /// Get statistics about the watcher.
    pub async fn stats(&self) -> WatcherStats {
        WatcherStats {
            watched_directories: self.configs.read().await.len(),
            running: *self.running.read().await,
        }
    }
}

impl Default for DirectoryWatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the directory watcher.
#[derive(Debug, Clone)]
pub struct WatcherStats {
    /// Number of watched directories.
    pub watched_directories: usize,

    /// Whether the watcher is running.
    pub running: bool,
}

/// Whether the config owning the path excludes it.
///
/// Only roots that are a prefix of the path get a say; a foreign root's
/// rules (notably its relative hidden-component check) must not veto events
/// belonging to another root.
fn is_excluded(configs: &HashMap<PathBuf, WatchConfig>, path: &Path) -> bool {
    configs
        .values()
        .filter(|c| path.starts_with(&c.path))
        .any(|c| c.should_exclude(path))
}

/// Coalesce raw events into per-path debounced events.
///
/// Each incoming event resets its path's deadline to now + `window`; only
/// the latest event for a path is kept. When the raw channel closes the
/// pending map is flushed so shutdown loses nothing.
async fn debounce_loop(
    mut raw_rx: mpsc::Receiver<FileEvent>,
    out_tx: mpsc::Sender<FileEvent>,
    window: Duration,
) {
    let mut pending: HashMap<PathBuf, (FileEvent, Instant)> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|(_, deadline)| *deadline).min();

        tokio::select! {
            received = raw_rx.recv() => {
                match received {
                    Some(event) => {
                        let deadline = Instant::now() + window;
                        pending.insert(event.path.clone(), (event, deadline));
                    }
                    None => break,
                }
            }
            () = sleep_until_or_forever(next_deadline) => {
                let now = Instant::now();
                let due: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, (_, deadline))| *deadline <= now)
                    .map(|(path, _)| path.clone())
                    .collect();

                for path in due {
                    if let Some((event, _)) = pending.remove(&path) {
                        if out_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }

    for (_, (event, _)) in pending {
        if out_tx.send(event).await.is_err() {
            return;
        }
    }
}

async fn sleep_until_or_forever(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tokio::time::timeout;

    const TEST_WINDOW: Duration = Duration::from_millis(50);

    fn spawn_debounce() -> (mpsc::Sender<FileEvent>, mpsc::Receiver<FileEvent>) {
        let (raw_tx, raw_rx) = mpsc::channel(100);
        let (out_tx, out_rx) = mpsc::channel(100);
        tokio::spawn(debounce_loop(raw_rx, out_tx, TEST_WINDOW));
        (raw_tx, out_rx)
    }

    #[tokio::test]
    async fn test_rapid_writes_coalesce_to_latest() {
        let (raw_tx, mut out_rx) = spawn_debounce();

        raw_tx
            .send(FileEvent::new(FileEventKind::Added, "/w/a.md"))
            .await
            .unwrap();
        raw_tx
            .send(FileEvent::new(FileEventKind::Changed, "/w/a.md"))
            .await
            .unwrap();

        let event = timeout(Duration::from_secs(1), out_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, FileEventKind::Changed);
        assert_eq!(event.path, Path::new("/w/a.md"));

        assert!(timeout(Duration::from_millis(100), out_rx.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_distinct_paths_each_emit() {
        let (raw_tx, mut out_rx) = spawn_debounce();

        raw_tx
            .send(FileEvent::new(FileEventKind::Added, "/w/a.md"))
            .await
            .unwrap();
        raw_tx
            .send(FileEvent::new(FileEventKind::Added, "/w/b.md"))
            .await
            .unwrap();

        let mut paths = Vec::new();
        for _ in 0..2 {
            let event = timeout(Duration::from_secs(1), out_rx.recv())
                .await
                .unwrap()
                .unwrap();
            paths.push(event.path);
        }
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("/w/a.md"), PathBuf::from("/w/b.md")]);
    }

    #[tokio::test]
    async fn test_pending_flushed_on_close() {
        let (raw_tx, mut out_rx) = spawn_debounce();

        raw_tx
            .send(FileEvent::new(FileEventKind::Removed, "/w/a.md"))
            .await
            .unwrap();
        drop(raw_tx);

        let event = timeout(Duration::from_secs(1), out_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, FileEventKind::Removed);
        assert!(out_rx.recv().await.is_none());
    }

    #[test]
    fn test_exclusion_consults_only_owning_root() {
        let dotted_root = PathBuf::from("/home/u/.config/notes");
        let plain_root = PathBuf::from("/home/u/docs");

        let mut configs = HashMap::new();
        configs.insert(dotted_root.clone(), WatchConfig::new(&dotted_root));
        configs.insert(plain_root.clone(), WatchConfig::new(&plain_root));

        // A file under the dotted root is judged by its own config, where
        // the path is clean relative to the root.
        assert!(!is_excluded(&configs, Path::new("/home/u/.config/notes/todo.md")));
        assert!(!is_excluded(&configs, Path::new("/home/u/docs/todo.md")));

        // The owning root's rules still apply below it.
        assert!(is_excluded(
            &configs,
            Path::new("/home/u/.config/notes/.git/config")
        ));
        assert!(is_excluded(&configs, Path::new("/home/u/docs/.hidden.md")));
    }

    #[tokio::test]
    async fn test_watcher_creation() {
        let watcher = DirectoryWatcher::new();
        assert!(!watcher.is_running().await);
        assert_eq!(watcher.stats().await.watched_directories, 0);
    }

    #[tokio::test]
    async fn test_add_and_remove_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut watcher = DirectoryWatcher::new();

        watcher.add(WatchConfig::new(temp_dir.path())).await.unwrap();
        assert_eq!(watcher.directories().await.len(), 1);

        let duplicate = watcher.add(WatchConfig::new(temp_dir.path())).await;
        assert!(matches!(duplicate, Err(WatcherError::AlreadyWatching(_))));

        watcher.remove(temp_dir.path()).await.unwrap();
        assert_eq!(watcher.directories().await.len(), 0);
    }

    #[tokio::test]
    async fn test_add_nonexistent_directory() {
        let mut watcher = DirectoryWatcher::new();
        let result = watcher.add(WatchConfig::new("/nonexistent/path/12345")).await;
        assert!(matches!(result, Err(WatcherError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let mut watcher = DirectoryWatcher::new();
        watcher.add(WatchConfig::new(temp_dir.path())).await.unwrap();

        watcher.start().await.unwrap();
        assert!(watcher.is_running().await);

        watcher.stop().await;
        assert!(!watcher.is_running().await);
    }
}
