//! # Filesystem Watcher
//!
//! This crate observes directories for docdex and turns raw filesystem
//! notifications into a small, reconciler-friendly event stream:
//!
//! - **Events**: notify's event zoo collapsed to `{Added, Changed, Removed}`
//! - **Stability window**: rapid successive writes to one path are debounced
//!   so files are never handed downstream mid-write
//! - **Exclusions**: glob patterns and hidden files filtered at the source
//! - **Startup scanner**: the current contents of watch roots emitted as
//!   synthetic `Added` events so a cold index populates without manual action

pub mod config;
pub mod error;
pub mod event;
pub mod scanner;
pub mod watcher;

pub use config::WatchConfig;
pub use error::{Result, WatcherError};
pub use event::{FileEvent, FileEventKind};
pub use scanner::scan_directory;
pub use watcher::{DirectoryWatcher, WatcherStats};
