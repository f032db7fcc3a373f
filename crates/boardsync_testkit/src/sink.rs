//! Event capture for engine tests.

use boardsync_engine::{EventSink, SyncEvent};
use parking_lot::Mutex;

/// Keeps every emitted event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events in emission order.
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().clone()
    }

    /// Returns the keys of failed records.
    pub fn failed_keys(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SyncEvent::RecordFailed { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the short names of the events, for order assertions.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .iter()
            .map(|event| match event {
                SyncEvent::RunStarted { .. } => "run_started",
                SyncEvent::SourceFetched { .. } => "source_fetched",
                SyncEvent::SnapshotFetched { .. } => "snapshot_fetched",
                SyncEvent::Planned { .. } => "planned",
                SyncEvent::RecordApplied { .. } => "record_applied",
                SyncEvent::RecordSkipped { .. } => "record_skipped",
                SyncEvent::RecordFailed { .. } => "record_failed",
                SyncEvent::RunFinished { .. } => "run_finished",
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SyncEvent) {
        self.events.lock().push(event.clone());
    }
}
