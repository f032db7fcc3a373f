//! Sync engine state machine.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, WriteError};
use crate::events::{EventSink, SyncEvent, TracingSink};
use crate::summary::{FailedWrite, Operation, RunSummary};
use boardsync_client::{ClientResult, DestinationStore};
use boardsync_core::{
    create_fields, reconcile, render_content, update_fields, ChangeSet, Decision,
    DestinationRecord, PlannedUpdate, Snapshot, SourceRecord,
};
use boardsync_source::SourceAdapter;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// The current phase of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run has started yet.
    Idle,
    /// Reading the upstream listing.
    FetchingSource,
    /// Reading every destination record.
    FetchingSnapshot,
    /// Computing the change set.
    Reconciling,
    /// Writing creates, updates and stale marks.
    Applying,
    /// The last run finished.
    Completed,
    /// The last run aborted.
    Failed,
}

impl RunState {
    /// Returns true if a run is in progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunState::FetchingSource
                | RunState::FetchingSnapshot
                | RunState::Reconciling
                | RunState::Applying
        )
    }

    /// Returns true if the engine can start a new run.
    pub fn can_start_run(&self) -> bool {
        matches!(self, RunState::Idle | RunState::Completed | RunState::Failed)
    }
}

/// Cumulative statistics across runs.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    /// Runs that reached the end of their change set.
    pub runs_completed: u64,
    /// Runs that aborted or were cancelled.
    pub runs_failed: u64,
    /// Records created.
    pub records_created: u64,
    /// Records updated.
    pub records_updated: u64,
    /// Records marked stale.
    pub records_marked_stale: u64,
    /// Record operations that failed after retries.
    pub write_failures: u64,
    /// Summary of the last finished run.
    pub last_summary: Option<RunSummary>,
    /// Message of the last fatal error.
    pub last_error: Option<String>,
}

/// Fetched inputs and the change set computed from them.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Records in the listing.
    pub source_records: usize,
    /// Keyed records in the snapshot.
    pub destination_records: usize,
    /// The computed changes.
    pub changes: ChangeSet,
}

/// Runs one reconciliation of a source listing into a destination store.
pub struct SyncEngine<S: SourceAdapter, D: DestinationStore> {
    config: EngineConfig,
    source: S,
    store: D,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    state: RwLock<RunState>,
    stats: RwLock<EngineStats>,
    cancelled: AtomicBool,
}

impl<S: SourceAdapter, D: DestinationStore> SyncEngine<S, D> {
    /// Creates an engine using the system clock and tracing output.
    pub fn new(config: EngineConfig, source: S, store: D) -> Self {
        Self {
            config,
            source,
            store,
            clock: Arc::new(SystemClock),
            sink: Arc::new(TracingSink),
            state: RwLock::new(RunState::Idle),
            stats: RwLock::new(EngineStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the source adapter.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the destination store.
    pub fn store(&self) -> &D {
        &self.store
    }

    /// Gets the current state.
    pub fn state(&self) -> RunState {
        *self.state.read()
    }

    /// Gets the cumulative stats.
    pub fn stats(&self) -> EngineStats {
        self.stats.read().clone()
    }

    /// Requests cancellation. The current record operation finishes first.
    ///
    /// A request made while no run is applying stops the next run before its
    /// first write. The request is consumed when that run ends.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: RunState) {
        *self.state.write() = state;
    }

    fn begin(&self) -> EngineResult<()> {
        let mut state = self.state.write();
        if !state.can_start_run() {
            return Err(EngineError::InvalidStateTransition {
                from: format!("{:?}", *state),
                to: format!("{:?}", RunState::FetchingSource),
            });
        }
        *state = RunState::FetchingSource;
        Ok(())
    }

    fn fail(&self, error: EngineError) -> EngineError {
        self.set_state(RunState::Failed);
        let mut stats = self.stats.write();
        stats.runs_failed += 1;
        stats.last_error = Some(error.to_string());
        error
    }

    /// Fetches both sides and computes the change set without writing.
    pub fn plan(&self) -> EngineResult<Plan> {
        self.begin()?;
        match self.prepare() {
            Ok(plan) => {
                self.set_state(RunState::Completed);
                Ok(plan)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Runs a full sync and returns its summary.
    ///
    /// Fatal errors abort before any write. Per-record failures are collected
    /// in the summary and the run goes on.
    pub fn run(&self) -> EngineResult<RunSummary> {
        let start = Instant::now();
        self.begin()?;
        let result = self.execute(start);
        self.cancelled.store(false, Ordering::SeqCst);
        result
    }

    fn execute(&self, start: Instant) -> EngineResult<RunSummary> {
        self.sink.emit(&SyncEvent::RunStarted {
            source: self.source.name().to_string(),
            dry_run: self.config.dry_run,
        });

        let plan = match self.prepare() {
            Ok(plan) => plan,
            Err(e) => return Err(self.fail(e)),
        };

        let mut summary = RunSummary {
            source_records: plan.source_records,
            destination_records: plan.destination_records,
            unchanged: plan.changes.unchanged.len(),
            dry_run: self.config.dry_run,
            ..RunSummary::default()
        };

        if self.config.dry_run {
            summary.created = plan.changes.creates.len();
            summary.updated = plan.changes.updates.len();
            summary.marked_stale = plan.changes.stale_marks.len();
        } else {
            self.set_state(RunState::Applying);
            self.apply(&plan.changes, &mut summary);
        }

        summary.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.sink.emit(&SyncEvent::RunFinished {
            summary: summary.clone(),
        });

        if summary.cancelled {
            return Err(self.fail(EngineError::Cancelled {
                summary: Box::new(summary),
            }));
        }

        self.set_state(RunState::Completed);
        {
            let mut stats = self.stats.write();
            stats.runs_completed += 1;
            if !summary.dry_run {
                stats.records_created += summary.created as u64;
                stats.records_updated += summary.updated as u64;
                stats.records_marked_stale += summary.marked_stale as u64;
            }
            stats.write_failures += summary.failed() as u64;
            stats.last_summary = Some(summary.clone());
            stats.last_error = None;
        }
        Ok(summary)
    }

    fn prepare(&self) -> EngineResult<Plan> {
        self.set_state(RunState::FetchingSource);
        let sources = self.source.fetch_listing()?;
        self.sink.emit(&SyncEvent::SourceFetched {
            records: sources.len(),
        });
        if sources.is_empty() && !self.config.allow_empty_source {
            return Err(EngineError::EmptySource);
        }

        self.set_state(RunState::FetchingSnapshot);
        let records = self.store.query_all().map_err(EngineError::Snapshot)?;
        let snapshot = Snapshot::from_records(records)?;
        self.sink.emit(&SyncEvent::SnapshotFetched {
            records: snapshot.len(),
            unkeyed: snapshot.unkeyed(),
        });

        self.set_state(RunState::Reconciling);
        let changes = reconcile(&sources, &snapshot, &self.config.reconcile)?;
        self.sink.emit(&SyncEvent::Planned {
            counts: changes.counts(),
        });

        Ok(Plan {
            source_records: sources.len(),
            destination_records: snapshot.len(),
            changes,
        })
    }

    fn apply(&self, changes: &ChangeSet, summary: &mut RunSummary) {
        let now = self.clock.now();
        let today = now.date();
        let mut pacer = Pacer::new(&self.config);

        for source in &changes.creates {
            if self.stop_requested(summary) {
                return;
            }
            pacer.wait();
            match self.create_one(source, now) {
                Ok(record) => {
                    summary.created += 1;
                    self.applied(&source.key, Decision::Create, &record.id);
                }
                Err(e) => self.failed(summary, e),
            }
        }

        for update in &changes.updates {
            if self.stop_requested(summary) {
                return;
            }
            pacer.wait();
            match self.update_one(update) {
                Ok(()) => {
                    summary.updated += 1;
                    self.applied(&update.existing.key, Decision::Update, &update.existing.id);
                }
                Err(e) => {
                    self.failed(summary, e);
                    continue;
                }
            }
            if self.config.replace_content && update.source.content_sections.is_some() {
                pacer.wait();
                if let Err(e) = self.replace_one(update, now) {
                    self.failed(summary, e);
                }
            }
        }

        for existing in &changes.stale_marks {
            if self.stop_requested(summary) {
                return;
            }
            if self.config.reconcile.stale.is_marked_on(existing, today) {
                summary.already_stale += 1;
                self.sink.emit(&SyncEvent::RecordSkipped {
                    key: existing.key.clone(),
                });
                continue;
            }
            pacer.wait();
            match self.mark_one(existing, today) {
                Ok(()) => {
                    summary.marked_stale += 1;
                    self.applied(&existing.key, Decision::MarkStale, &existing.id);
                }
                Err(e) => self.failed(summary, e),
            }
        }
    }

    fn stop_requested(&self, summary: &mut RunSummary) -> bool {
        if self.is_cancelled() {
            debug!(writes = summary.writes(), "cancellation requested");
            summary.cancelled = true;
        }
        summary.cancelled
    }

    fn create_one(
        &self,
        source: &SourceRecord,
        now: NaiveDateTime,
    ) -> Result<DestinationRecord, WriteError> {
        let fields = create_fields(source, now.date());
        let content = render_content(source, now);
        self.store
            .create(&fields, &content)
            .map_err(|e| WriteError::new(&source.key, Operation::Create, e))
    }

    fn update_one(&self, update: &PlannedUpdate) -> Result<(), WriteError> {
        debug!(key = %update.existing.key, changed = ?update.changed, "updating record");
        let fields = update_fields(&update.source, &update.existing, &self.config.reconcile.stale);
        self.write(&update.existing.key, Operation::Update, || {
            self.store.update_fields(&update.existing.id, &fields)
        })
    }

    fn replace_one(&self, update: &PlannedUpdate, now: NaiveDateTime) -> Result<(), WriteError> {
        let content = render_content(&update.source, now);
        self.write(&update.existing.key, Operation::ReplaceContent, || {
            self.store.replace_content(&update.existing.id, &content)
        })
    }

    fn mark_one(&self, existing: &DestinationRecord, today: NaiveDate) -> Result<(), WriteError> {
        let patch = self.config.reconcile.stale.mark_patch(today);
        self.write(&existing.key, Operation::MarkStale, || {
            self.store.update_fields(&existing.id, &patch)
        })
    }

    fn write(
        &self,
        key: &str,
        operation: Operation,
        op: impl FnOnce() -> ClientResult<()>,
    ) -> Result<(), WriteError> {
        op().map_err(|e| WriteError::new(key, operation, e))
    }

    fn applied(&self, key: &str, decision: Decision, id: &str) {
        self.sink.emit(&SyncEvent::RecordApplied {
            key: key.to_string(),
            decision,
            id: id.to_string(),
        });
    }

    fn failed(&self, summary: &mut RunSummary, error: WriteError) {
        let failure = FailedWrite::from(&error);
        self.sink.emit(&SyncEvent::RecordFailed {
            key: failure.key.clone(),
            operation: failure.operation,
            error: failure.error.clone(),
        });
        summary.failures.push(failure);
    }
}

/// Spaces consecutive writes by the configured interval.
struct Pacer {
    interval: std::time::Duration,
    writes: usize,
}

impl Pacer {
    fn new(config: &EngineConfig) -> Self {
        Self {
            interval: config.write_interval,
            writes: 0,
        }
    }

    fn wait(&mut self) {
        if self.writes > 0 && !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        self.writes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_predicates() {
        assert!(RunState::Idle.can_start_run());
        assert!(RunState::Completed.can_start_run());
        assert!(RunState::Failed.can_start_run());
        assert!(!RunState::Applying.can_start_run());
        assert!(RunState::Reconciling.is_active());
        assert!(!RunState::Completed.is_active());
    }

    #[test]
    fn pacer_skips_first_write() {
        let config = EngineConfig::new().with_write_interval(std::time::Duration::from_millis(20));
        let mut pacer = Pacer::new(&config);
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() < std::time::Duration::from_millis(20));
        pacer.wait();
        assert!(start.elapsed() >= std::time::Duration::from_millis(20));
        assert_eq!(pacer.writes, 2);
    }
}
