//! Destination store abstraction.

use crate::error::ClientResult;
use boardsync_core::{ContentBlock, DestinationRecord, FieldMap};
use std::sync::Arc;

/// A keyed record store the engine converges towards the source.
///
/// Implementations own all network-facing failure handling: every method
/// either succeeds or returns the terminal error left after retries.
pub trait DestinationStore: Send + Sync {
    /// Returns every record currently in the store.
    fn query_all(&self) -> ClientResult<Vec<DestinationRecord>>;

    /// Creates a record with the given fields and body.
    fn create(&self, fields: &FieldMap, content: &[ContentBlock]) -> ClientResult<DestinationRecord>;

    /// Overwrites the given fields of a record, leaving the rest alone.
    fn update_fields(&self, id: &str, fields: &FieldMap) -> ClientResult<()>;

    /// Replaces the body of a record.
    fn replace_content(&self, id: &str, content: &[ContentBlock]) -> ClientResult<()>;
}

impl<S: DestinationStore + ?Sized> DestinationStore for Arc<S> {
    fn query_all(&self) -> ClientResult<Vec<DestinationRecord>> {
        (**self).query_all()
    }

    fn create(&self, fields: &FieldMap, content: &[ContentBlock]) -> ClientResult<DestinationRecord> {
        (**self).create(fields, content)
    }

    fn update_fields(&self, id: &str, fields: &FieldMap) -> ClientResult<()> {
        (**self).update_fields(id, fields)
    }

    fn replace_content(&self, id: &str, content: &[ContentBlock]) -> ClientResult<()> {
        (**self).replace_content(id, content)
    }
}
