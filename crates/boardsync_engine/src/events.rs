//! Run progress events.

use crate::summary::{Operation, RunSummary};
use boardsync_core::{ChangeCounts, Decision};
use tracing::{debug, info, warn};

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A run began.
    RunStarted {
        /// Source adapter name.
        source: String,
        /// True if nothing will be written.
        dry_run: bool,
    },
    /// The listing was fetched.
    SourceFetched {
        /// Records in the listing.
        records: usize,
    },
    /// The destination snapshot was fetched.
    SnapshotFetched {
        /// Keyed records.
        records: usize,
        /// Records without a key, ignored.
        unkeyed: usize,
    },
    /// The change set was computed.
    Planned {
        /// Group sizes.
        counts: ChangeCounts,
    },
    /// A record operation succeeded.
    RecordApplied {
        /// Record key.
        key: String,
        /// What was done.
        decision: Decision,
        /// Destination record id.
        id: String,
    },
    /// A stale record already carried today's annotation.
    RecordSkipped {
        /// Record key.
        key: String,
    },
    /// A record operation failed after retries.
    RecordFailed {
        /// Record key.
        key: String,
        /// The failed operation.
        operation: Operation,
        /// Error message.
        error: String,
    },
    /// The run ended.
    RunFinished {
        /// Final counts.
        summary: RunSummary,
    },
}

/// Receives run events.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: &SyncEvent);
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SyncEvent) {
        match event {
            SyncEvent::RunStarted { source, dry_run } => {
                info!(source = %source, dry_run, "sync started");
            }
            SyncEvent::SourceFetched { records } => {
                info!(records, "fetched source listing");
            }
            SyncEvent::SnapshotFetched { records, unkeyed } => {
                info!(records, unkeyed, "fetched destination snapshot");
            }
            SyncEvent::Planned { counts } => {
                info!(
                    creates = counts.creates,
                    updates = counts.updates,
                    stale_marks = counts.stale_marks,
                    unchanged = counts.unchanged,
                    "planned changes"
                );
            }
            SyncEvent::RecordApplied { key, decision, id } => {
                debug!(key = %key, decision = ?decision, id = %id, "record applied");
            }
            SyncEvent::RecordSkipped { key } => {
                debug!(key = %key, "already marked stale today");
            }
            SyncEvent::RecordFailed {
                key,
                operation,
                error,
            } => {
                warn!(key = %key, operation = %operation, error = %error, "record failed");
            }
            SyncEvent::RunFinished { summary } => {
                info!(
                    created = summary.created,
                    updated = summary.updated,
                    unchanged = summary.unchanged,
                    marked_stale = summary.marked_stale,
                    already_stale = summary.already_stale,
                    failed = summary.failed(),
                    duration_ms = summary.duration_ms,
                    dry_run = summary.dry_run,
                    "sync finished"
                );
            }
        }
    }
}
