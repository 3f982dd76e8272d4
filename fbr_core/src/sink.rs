//! Diagnostic sinks.
//!
//! Every component reports what it is doing through a [`Sink`] handed in by the
//! caller. The binary uses [`TracingSink`]; tests use [`MemorySink`] or
//! [`NullSink`] to stay silent and deterministic.

use std::sync::Mutex;

/// Receiver for line-oriented diagnostics.
pub trait Sink {
    /// Informational notice (file opened, backup rotated, final result).
    fn info(&self, message: &str);

    /// Detail only wanted in verbose runs (chunk counts, digests).
    fn debug(&self, message: &str);

    /// Something went wrong; used for failure forensics.
    fn warn(&self, message: &str);
}

/// Forwards diagnostics to `tracing` under the `fbr` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!(target: "fbr", "{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "fbr", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "fbr", "{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
}

/// Severity of a recorded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Debug,
    Warn,
}

/// Records every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded lines, in order.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Recorded messages only.
    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, msg)| msg).collect()
    }

    /// True if any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|msg| msg.contains(needle))
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}

impl Sink for MemorySink {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }
}
