//! Error types for the sync engine.

use crate::summary::{Operation, RunSummary};
use boardsync_client::ClientError;
use boardsync_core::CoreError;
use boardsync_source::SourceFetchError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a run.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The source listing could not be fetched. Nothing was written.
    #[error("source fetch failed: {0}")]
    SourceFetch(#[from] SourceFetchError),

    /// The source returned no records and empty listings are not allowed.
    #[error("source returned no records; refusing to mark every record stale")]
    EmptySource,

    /// The destination snapshot could not be fetched. Nothing was written.
    #[error("destination snapshot failed: {0}")]
    Snapshot(#[source] ClientError),

    /// A listing or snapshot broke the one-record-per-key contract.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The run was cancelled between two record operations.
    #[error("sync cancelled after {} writes", summary.writes())]
    Cancelled {
        /// What was applied before cancellation.
        summary: Box<RunSummary>,
    },

    /// A run was started while another was in progress.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },
}

/// A single create, update or stale mark that failed after retries.
///
/// Write errors are recorded in the run summary; the run continues.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{operation} failed for key {key:?}: {source}")]
pub struct WriteError {
    /// Key of the record.
    pub key: String,
    /// The failed operation.
    pub operation: Operation,
    /// The terminal client error.
    #[source]
    pub source: ClientError,
}

impl WriteError {
    /// Creates a write error.
    pub fn new(key: impl Into<String>, operation: Operation, source: ClientError) -> Self {
        Self {
            key: key.into(),
            operation,
            source,
        }
    }
}
