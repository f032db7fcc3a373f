//! # Boardsync Engine
//!
//! Run orchestration for boardsync.
//!
//! This crate provides:
//! - `SyncEngine`: fetch, snapshot, reconcile and apply as one run
//! - Write pacing and cooperative cancellation between record operations
//! - Structured progress events with a `tracing` sink
//! - End-of-run summaries with per-record failures
//!
//! ## Key Invariants
//!
//! - Nothing is written unless both the listing and the snapshot were read
//!   in full
//! - An empty listing aborts the run unless explicitly allowed
//! - A failed record operation never aborts the run
//! - Creates run before updates, updates before stale marks

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod error;
mod events;
mod state;
mod summary;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EngineConfig, DEFAULT_WRITE_INTERVAL};
pub use error::{EngineError, EngineResult, WriteError};
pub use events::{EventSink, SyncEvent, TracingSink};
pub use state::{EngineStats, Plan, RunState, SyncEngine};
pub use summary::{FailedWrite, Operation, RunSummary};
