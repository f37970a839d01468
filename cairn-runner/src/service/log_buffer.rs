//! Build log buffer
//!
//! Collects the lines a checkpoint run writes to the host build's log. The
//! runner binary drains the buffer and prints it once the run is over.

use cairn_core::domain::log::{LogEntry, LogLevel};
use std::sync::{Arc, Mutex, PoisonError};

/// Service for collecting build log lines
pub trait LogBufferService: Send + Sync {
    /// Adds a log entry to the buffer
    fn add_entry(&self, entry: LogEntry);

    /// Returns all buffered entries and clears the buffer
    fn drain(&self) -> Vec<LogEntry>;

    /// Adds a line stamped with the current time
    fn log(&self, level: LogLevel, message: String) {
        self.add_entry(LogEntry::now(level, message));
    }
}

/// In-memory implementation of LogBufferService
///
/// Clones share the same buffer.
#[derive(Clone)]
pub struct InMemoryLogBuffer {
    buffer: Arc<Mutex<Vec<LogEntry>>>,
}

impl InMemoryLogBuffer {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Default for InMemoryLogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBufferService for InMemoryLogBuffer {
    fn add_entry(&self, entry: LogEntry) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.push(entry);
    }

    fn drain(&self) -> Vec<LogEntry> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.drain(..).collect()
    }
}
