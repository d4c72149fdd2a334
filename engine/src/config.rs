//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

const ENV_DATA_ROOT: &str = "DOCDEX_DATA_ROOT";
const ENV_WATCH_DIRS: &str = "DOCDEX_WATCH_DIRS";

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
const DEFAULT_SNIPPET_WIDTH: usize = 150;

/// Configuration for the document engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for persisted state (`store/` and `index/` live here).
    pub data_root: PathBuf,

    /// Directories to watch for document files. Empty disables watching.
    pub watch_dirs: Vec<PathBuf>,

    /// Stability window for filesystem events.
    pub debounce: Duration,

    /// Snippet window width for search results.
    pub snippet_width: usize,
}

impl EngineConfig {
    /// Create a config rooted at the given data directory.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            watch_dirs: Vec::new(),
            debounce: DEFAULT_DEBOUNCE,
            snippet_width: DEFAULT_SNIPPET_WIDTH,
        }
    }

    /// Build a config from the environment.
    ///
    /// `DOCDEX_DATA_ROOT` overrides the platform data directory;
    /// `DOCDEX_WATCH_DIRS` is a comma-separated list of watch roots, and
    /// when absent or empty, watching is disabled.
    pub fn from_env() -> Self {
        let data_root = std::env::var(ENV_DATA_ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_root());

        let watch_dirs = std::env::var(ENV_WATCH_DIRS)
            .map(|raw| parse_watch_dirs(&raw))
            .unwrap_or_default();

        Self {
            data_root,
            watch_dirs,
            debounce: DEFAULT_DEBOUNCE,
            snippet_width: DEFAULT_SNIPPET_WIDTH,
        }
    }

    /// Add a directory to watch.
    pub fn with_watch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.watch_dirs.push(dir.into());
        self
    }

    /// Set the stability window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the snippet window width.
    pub fn with_snippet_width(mut self, width: usize) -> Self {
        self.snippet_width = width;
        self
    }

    /// Store state directory under the data root.
    pub fn store_root(&self) -> PathBuf {
        self.data_root.join("store")
    }

    /// Index state directory under the data root.
    pub fn index_root(&self) -> PathBuf {
        self.data_root.join("index")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn default_data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docdex")
}

fn parse_watch_dirs(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn test_builders() {
        let config = EngineConfig::new("/data/docdex")
            .with_watch_dir("/home/user/notes")
            .with_debounce(Duration::from_millis(100))
            .with_snippet_width(80);

        assert_eq!(config.data_root, Path::new("/data/docdex"));
        assert_eq!(config.watch_dirs, vec![PathBuf::from("/home/user/notes")]);
        assert_eq!(config.debounce, Duration::from_millis(100));
        assert_eq!(config.snippet_width, 80);
        assert_eq!(config.store_root(), Path::new("/data/docdex/store"));
        assert_eq!(config.index_root(), Path::new("/data/docdex/index"));
    }

    #[test]
    fn test_parse_watch_dirs() {
        assert_eq!(
            parse_watch_dirs("/a, /b ,,/c"),
            vec![
                PathBuf::from("/a"),
                PathBuf::from("/b"),
                PathBuf::from("/c")
            ]
        );
        assert!(parse_watch_dirs("").is_empty());
        assert!(parse_watch_dirs(" , ").is_empty());
    }
}
