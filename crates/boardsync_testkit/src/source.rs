//! Scripted source adapter.

use boardsync_core::SourceRecord;
use boardsync_source::{SourceAdapter, SourceFetchError, SourceResult};
use parking_lot::Mutex;

/// A source that returns a fixed listing, or a scripted failure.
#[derive(Debug, Default)]
pub struct StaticSource {
    records: Mutex<Vec<SourceRecord>>,
    failure: Mutex<Option<String>>,
    fetches: Mutex<usize>,
}

impl StaticSource {
    /// Creates a source returning `records`.
    pub fn new(records: Vec<SourceRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Creates a source whose fetches fail.
    pub fn failing(message: impl Into<String>) -> Self {
        let source = Self::default();
        *source.failure.lock() = Some(message.into());
        source
    }

    /// Replaces the listing returned by later fetches.
    pub fn set_records(&self, records: Vec<SourceRecord>) {
        *self.records.lock() = records;
    }

    /// Number of fetches so far.
    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock()
    }
}

impl SourceAdapter for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch_listing(&self) -> SourceResult<Vec<SourceRecord>> {
        *self.fetches.lock() += 1;
        if let Some(message) = self.failure.lock().clone() {
            return Err(SourceFetchError::Malformed(message));
        }
        Ok(self.records.lock().clone())
    }
}
