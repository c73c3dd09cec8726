//! Leveled, fire-and-forget message reporting
//!
//! The cache and template layers never surface errors to their callers;
//! anything worth telling the user goes through a [`LogSink`] instead.

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};

/// Severity of a reported message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// Destination for messages reported by the cache and template layers.
///
/// `file` names the file the message is about, when there is one, so that
/// a host can offer to open it.
pub trait LogSink {
    fn report(&self, level: Level, message: &str, file: Option<&Path>);

    fn error(&self, message: &str, file: Option<&Path>) {
        self.report(Level::Error, message, file);
    }

    fn info(&self, message: &str) {
        self.report(Level::Info, message, None);
    }
}

/// Forwards every message to both sinks.
impl<A: LogSink, B: LogSink> LogSink for (A, B) {
    fn report(&self, level: Level, message: &str, file: Option<&Path>) {
        self.0.report(level, message, file);
        self.1.report(level, message, file);
    }
}

/// Sink that emits `tracing` events under the `tilecache` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn report(&self, level: Level, message: &str, file: Option<&Path>) {
        let file = file.map(|f| f.display().to_string()).unwrap_or_default();
        match level {
            Level::Error => tracing::error!(target: "tilecache", file = %file, "{}", message),
            Level::Warning => tracing::warn!(target: "tilecache", file = %file, "{}", message),
            Level::Info => tracing::info!(target: "tilecache", file = %file, "{}", message),
        }
    }
}

/// A message recorded by [`MemoryLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
    pub file: Option<PathBuf>,
}

/// Sink that keeps every message in memory.
///
/// Useful for hosts that show a message list, and for tests.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: RefCell<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    /// Recorded entries at the given level
    pub fn at_level(&self, level: Level) -> Vec<LogEntry> {
        self.entries.borrow().iter().filter(|e| e.level == level).cloned().collect()
    }

    pub fn error_count(&self) -> usize {
        self.entries.borrow().iter().filter(|e| e.level == Level::Error).count()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl LogSink for MemoryLog {
    fn report(&self, level: Level, message: &str, file: Option<&Path>) {
        self.entries.borrow_mut().push(LogEntry {
            level,
            message: message.to_string(),
            file: file.map(Path::to_path_buf),
        });
    }
}

impl<T: LogSink + ?Sized> LogSink for std::rc::Rc<T> {
    fn report(&self, level: Level, message: &str, file: Option<&Path>) {
        (**self).report(level, message, file);
    }
}
