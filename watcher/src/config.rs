//! Configuration for watched directories.

use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default stability window between the last write to a path and the event
/// being released downstream.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Configuration for a watched directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Path to the directory.
    pub path: PathBuf,

    /// Patterns to exclude (glob patterns).
    pub exclude_patterns: Vec<String>,

    /// Whether hidden files (dotfiles) are skipped.
    pub skip_hidden: bool,

    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,

    /// Stability window for coalescing rapid writes.
    #[serde(with = "duration_millis")]
    pub debounce: Duration,

    /// Compiled exclusion set. Not serialized.
    #[serde(skip)]
    compiled: Option<GlobSet>,
}

impl WatchConfig {
    /// Create a new watch config with the default exclusions.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut config = Self {
            path: path.into(),
            exclude_patterns: Self::default_excludes(),
            skip_hidden: true,
            max_depth: None,
            debounce: DEFAULT_DEBOUNCE,
            compiled: None,
        };
        config.compile();
        config
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self.compile();
        self
    }

    /// Set the maximum depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the stability window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Include hidden files.
    pub fn include_hidden(mut self) -> Self {
        self.skip_hidden = false;
        self
    }

    /// Get default exclude patterns.
    fn default_excludes() -> Vec<String> {
        vec![
            // Version control
            "**/.git/**".to_string(),
            "**/.svn/**".to_string(),
            "**/.hg/**".to_string(),
            // Dependencies
            "**/node_modules/**".to_string(),
            "**/target/**".to_string(),
            "**/vendor/**".to_string(),
            "**/.venv/**".to_string(),
            "**/venv/**".to_string(),
            // Build artifacts
            "**/build/**".to_string(),
            "**/dist/**".to_string(),
            "**/__pycache__/**".to_string(),
            "**/*.pyc".to_string(),
            // IDE/Editor
            "**/.idea/**".to_string(),
            "**/.vscode/**".to_string(),
            "**/*.swp".to_string(),
            "**/*~".to_string(),
            // System files
            "**/.DS_Store".to_string(),
            "**/Thumbs.db".to_string(),
            // Temporary files
            "**/*.tmp".to_string(),
            "**/*.temp".to_string(),
        ]
    }

    fn compile(&mut self) {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!("Skipping invalid exclude pattern {pattern}: {e}"),
            }
        }
        match builder.build() {
            Ok(set) => self.compiled = Some(set),
            Err(e) => {
                warn!("Failed to build exclusion set: {e}");
                self.compiled = None;
            }
        }
    }

    /// Check if a path should be excluded from watching.
    ///
    /// Hidden-file checks apply below the watch root, so a root that itself
    /// lives under a dotted directory is not excluded wholesale.
    pub fn should_exclude(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.path).unwrap_or(path);
        if self.skip_hidden && is_hidden(relative) {
            return true;
        }

        match &self.compiled {
            Some(set) => set.is_match(path),
            None => false,
        }
    }
}

/// Whether any component of the path is a dotfile.
pub fn is_hidden(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|s| s.starts_with('.') && s != "." && s != "..")
    })
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_watch_config_creation() {
        let config = WatchConfig::new("/home/user/documents")
            .with_max_depth(3)
            .with_debounce(Duration::from_millis(100));

        assert_eq!(config.path, Path::new("/home/user/documents"));
        assert_eq!(config.max_depth, Some(3));
        assert_eq!(config.debounce, Duration::from_millis(100));
    }

    #[test]
    fn test_default_exclusions() {
        let config = WatchConfig::new("/test");

        assert!(config.should_exclude(Path::new("/test/.git/config")));
        assert!(config.should_exclude(Path::new("/test/node_modules/package/index.js")));
        assert!(config.should_exclude(Path::new("/test/notes.tmp")));
        assert!(!config.should_exclude(Path::new("/test/src/readme.md")));
    }

    #[test]
    fn test_hidden_files_skipped() {
        let config = WatchConfig::new("/test");
        assert!(config.should_exclude(Path::new("/test/.hidden.md")));
        assert!(config.should_exclude(Path::new("/test/.cache/notes.md")));

        let config = WatchConfig::new("/test").include_hidden();
        assert!(!config.should_exclude(Path::new("/test/.hidden.md")));
    }

    #[test]
    fn test_custom_exclusion() {
        let config = WatchConfig::new("/test").exclude("**/*.log");
        assert!(config.should_exclude(Path::new("/test/out/app.log")));
        assert!(!config.should_exclude(Path::new("/test/out/app.md")));
    }

    #[test]
    fn test_invalid_pattern_skipped() {
        let config = WatchConfig::new("/test").exclude("a{b");
        assert!(!config.should_exclude(Path::new("/test/a.md")));
        assert!(config.should_exclude(Path::new("/test/.git/config")));
    }
}
