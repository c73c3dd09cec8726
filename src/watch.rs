//! File change notification for loaded templates
//!
//! The host registers paths of interest and periodically asks for the paths
//! that changed since the last call. Events are collected on a channel and
//! handed out on the host's own thread.

use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use crate::config::WatchConfig;

/// Error during file watching
#[derive(Debug)]
pub enum WatchError {
    /// Failed to initialize file watcher
    WatcherInit(notify::Error),
    /// Failed to add watch path
    WatchPath(PathBuf, notify::Error),
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchError::WatcherInit(e) => write!(f, "Failed to initialize file watcher: {}", e),
            WatchError::WatchPath(path, e) => {
                write!(f, "Failed to watch {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for WatchError {}

/// Tells the host which watched files changed on disk.
pub trait FileWatcher {
    fn add_path(&mut self, path: &Path) -> Result<(), WatchError>;

    fn remove_path(&mut self, path: &Path);

    /// Paths that changed since the previous call, each reported once, in
    /// the form they were registered.
    fn take_changes(&mut self) -> Vec<PathBuf>;
}

/// Watcher that never reports anything.
#[derive(Debug, Default)]
pub struct NullWatcher;

impl FileWatcher for NullWatcher {
    fn add_path(&mut self, _path: &Path) -> Result<(), WatchError> {
        Ok(())
    }

    fn remove_path(&mut self, _path: &Path) {}

    fn take_changes(&mut self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Watcher backed by the operating system's file notification API, with
/// bursts of events for the same file debounced into one.
pub struct NotifyWatcher {
    debouncer: Debouncer<notify::RecommendedWatcher>,
    events: Receiver<DebounceEventResult>,
    /// Canonical path -> path as registered
    watched: HashMap<PathBuf, PathBuf>,
}

impl NotifyWatcher {
    pub fn new(config: &WatchConfig) -> Result<Self, WatchError> {
        let (tx, rx) = channel();
        let debounce = Duration::from_millis(u64::from(config.debounce_ms));
        let debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;

        Ok(Self { debouncer, events: rx, watched: HashMap::new() })
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    fn registered_path(&self, event_path: &Path) -> Option<PathBuf> {
        if let Some(path) = self.watched.get(event_path) {
            return Some(path.clone());
        }
        let canonical = std::fs::canonicalize(event_path).ok()?;
        self.watched.get(&canonical).cloned()
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl FileWatcher for NotifyWatcher {
    fn add_path(&mut self, path: &Path) -> Result<(), WatchError> {
        let key = canonical(path);
        if self.watched.contains_key(&key) {
            return Ok(());
        }
        self.debouncer
            .watcher()
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::WatchPath(path.to_path_buf(), e))?;
        self.watched.insert(key, path.to_path_buf());
        Ok(())
    }

    fn remove_path(&mut self, path: &Path) {
        if self.watched.remove(&canonical(path)).is_some() {
            let _ = self.debouncer.watcher().unwatch(path);
        }
    }

    fn take_changes(&mut self) -> Vec<PathBuf> {
        let mut changed: Vec<PathBuf> = Vec::new();

        while let Ok(result) = self.events.try_recv() {
            match result {
                Ok(events) => {
                    for event in events {
                        if let Some(path) = self.registered_path(&event.path) {
                            if !changed.contains(&path) {
                                changed.push(path);
                            }
                        }
                    }
                }
                Err(error) => tracing::warn!("file watch error: {:?}", error),
            }
        }

        // Saving by replacing the file drops the watch on the old inode
        for path in &changed {
            if path.exists() {
                let watcher = self.debouncer.watcher();
                let _ = watcher.unwatch(path);
                if let Err(e) = watcher.watch(path, RecursiveMode::NonRecursive) {
                    tracing::warn!(path = %path.display(), "could not re-watch file: {}", e);
                }
            }
        }

        changed
    }
}

/// Current wall-clock time as `HH:MM:SS` (UTC), for console output
pub fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    #[test]
    fn test_null_watcher() {
        let mut watcher = NullWatcher;
        watcher.add_path(Path::new("/nonexistent")).unwrap();
        assert!(watcher.take_changes().is_empty());
    }

    #[test]
    fn test_watch_error_display() {
        let error = WatchError::WatchPath(
            PathBuf::from("a.tj"),
            notify::Error::generic("no such file"),
        );
        let display = error.to_string();
        assert!(display.contains("a.tj"));
        assert!(display.contains("no such file"));
    }

    #[test]
    fn test_add_missing_path_fails() {
        let mut watcher = NotifyWatcher::new(&WatchConfig::default()).unwrap();
        let result = watcher.add_path(Path::new("/nonexistent/dir/a.tj"));
        assert!(matches!(result, Err(WatchError::WatchPath(_, _))));
        assert_eq!(watcher.watched_count(), 0);
    }

    #[test]
    fn test_add_path_twice_watches_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.tj");
        std::fs::write(&path, "{}").unwrap();

        let mut watcher = NotifyWatcher::new(&WatchConfig::default()).unwrap();
        watcher.add_path(&path).unwrap();
        watcher.add_path(&path).unwrap();
        assert_eq!(watcher.watched_count(), 1);

        watcher.remove_path(&path);
        assert_eq!(watcher.watched_count(), 0);
    }

    #[test]
    fn test_reports_modified_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.tj");
        std::fs::write(&path, "{}").unwrap();

        let mut watcher =
            NotifyWatcher::new(&WatchConfig { debounce_ms: 50, ..WatchConfig::default() }).unwrap();
        watcher.add_path(&path).unwrap();
        std::fs::write(&path, "{\"changed\": true}").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut changed = Vec::new();
        while changed.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
            changed = watcher.take_changes();
        }

        assert_eq!(changed, vec![path]);
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.chars().filter(|&c| c == ':').count(), 2);
    }
}
