//! Server event log with SSE fan-out.
//!
//! Upload and query handlers emit structured entries here; each entry is
//! printed to stdout and broadcast to any connected `/api/logs` SSE
//! clients. Entries are fire-and-forget: a lagging or absent subscriber
//! never blocks a request.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Severity of an event entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single event entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Global event broadcaster.
pub static EVENT_LOG: Lazy<EventLog> = Lazy::new(EventLog::new);

/// Broadcasts event entries to all connected SSE clients.
pub struct EventLog {
    sender: broadcast::Sender<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Record an entry: mirror to stdout, then broadcast.
    pub fn emit(&self, entry: LogEntry) {
        let tag = match entry.level {
            LogLevel::Info => "info",
            LogLevel::Success => "ok",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        };
        println!("[{tag}] {}", entry.message);

        // Ignore send errors: no subscribers is the normal case.
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for SSE streaming.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    EVENT_LOG.emit(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    EVENT_LOG.emit(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    EVENT_LOG.emit(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    EVENT_LOG.emit(LogEntry::new(LogLevel::Error, msg));
}
