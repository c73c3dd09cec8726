//! Local error log for tilecache
//!
//! Appends reported errors to a JSONL file so broken tilesheets, maps and
//! templates seen during a session can be reviewed afterwards.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::logging::{Level, LogSink};

/// An entry in the error log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// ISO 8601 timestamp when the error was reported
    pub timestamp: String,
    /// Severity ("error", "warning", "info")
    pub level: String,
    /// The file the message is about (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// The reported message
    pub message: String,
}

impl ErrorEntry {
    /// Create a new entry with the current timestamp
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self { timestamp: chrono_now(), level: level.to_string(), file: None, message: message.into() }
    }

    /// Set the file the message is about
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Get current timestamp in ISO 8601 format
fn chrono_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = duration.as_secs();

    let days = secs / 86400;
    let time_secs = secs % 86400;
    let hours = time_secs / 3600;
    let mins = (time_secs % 3600) / 60;
    let secs = time_secs % 60;

    // Walk forward from 1970-01-01
    let mut remaining_days = days as i64;
    let mut year = 1970i32;

    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }

    let days_in_months: [i64; 12] = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 1;
    for days_in_month in days_in_months.iter() {
        if remaining_days < *days_in_month {
            break;
        }
        remaining_days -= days_in_month;
        month += 1;
    }
    let day = remaining_days + 1;

    format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z", year, month, day, hours, mins, secs)
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Log sink that appends error-level messages to a JSONL file.
///
/// Messages below [`Level::Error`] are ignored. Write failures are
/// swallowed: reporting must never disturb the caller.
#[derive(Debug, Clone)]
pub struct ErrorCollector {
    path: PathBuf,
    enabled: bool,
}

impl ErrorCollector {
    /// Create a new error collector
    pub fn new(path: impl AsRef<Path>, enabled: bool) -> Self {
        Self { path: path.as_ref().to_path_buf(), enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry to the log file
    pub fn log(&self, entry: &ErrorEntry) -> std::io::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;

        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }
}

impl LogSink for ErrorCollector {
    fn report(&self, level: Level, message: &str, file: Option<&Path>) {
        if level < Level::Error {
            return;
        }
        let mut entry = ErrorEntry::new(level, message);
        if let Some(f) = file {
            entry = entry.with_file(f.display().to_string());
        }
        let _ = self.log(&entry);
    }
}
