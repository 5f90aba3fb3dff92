//! Port for structured run archiving.
//!
//! Defines the [`RunArchive`] trait for recording run events (run start,
//! agent completion, rounds, terminal state) to durable storage.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the run
//! history in a machine-readable format for long-term retention. Durable
//! persistence itself is an external concern behind this interface.

use serde_json::Value;

/// A structured run event for archiving.
///
/// Each event has a type string and a JSON payload containing
/// event-specific fields.
pub struct ArchiveEvent {
    /// Event type identifier (e.g., "run_started", "agent_completed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ArchiveEvent {
    /// Create a new archive event.
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for recording run events to an archive.
///
/// Implementations write each event as a single record (e.g., one JSONL
/// line). The `record` method is intentionally synchronous and non-fallible
/// to avoid disrupting the main execution flow — archive failures are
/// silently ignored.
pub trait RunArchive: Send + Sync {
    /// Record a run event.
    fn record(&self, event: ArchiveEvent);
}

/// No-op implementation for tests and when archiving is disabled.
pub struct NoArchive;

impl RunArchive for NoArchive {
    fn record(&self, _event: ArchiveEvent) {}
}
