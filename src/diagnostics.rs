//! Build diagnostics sink.
//!
//! Builders never log through a global; every build entry point takes a
//! `&dyn Diagnostics` and reports through it. [`TracingDiagnostics`] is the
//! normal choice and forwards to `tracing`.

use parking_lot::Mutex;

/// Severity of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

/// Receiver for build progress and warnings.
pub trait Diagnostics: Send + Sync {
    fn event(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.event(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.event(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.event(Level::Warn, message);
    }
}

/// Forwards events to the `tracing` subscriber installed by the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn event(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "scene_accel", "{message}"),
            Level::Info => tracing::info!(target: "scene_accel", "{message}"),
            Level::Warn => tracing::warn!(target: "scene_accel", "{message}"),
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn event(&self, _level: Level, _message: &str) {}
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<(Level, String)>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.lock().clone()
    }

    /// Messages at `level` or above.
    pub fn messages_at_least(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|(l, _)| *l >= level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn event(&self, level: Level, message: &str) {
        self.events.lock().push((level, message.to_string()));
    }
}
