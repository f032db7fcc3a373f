//! Source adapter abstraction.

use crate::error::SourceResult;
use boardsync_core::SourceRecord;
use std::sync::Arc;

/// Produces the current listing of an upstream job board.
///
/// Each call returns a finite list with one record per posting. Adapters
/// never return partial listings: a listing that cannot be fetched in full
/// is an error.
pub trait SourceAdapter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetches the listing.
    fn fetch_listing(&self) -> SourceResult<Vec<SourceRecord>>;
}

impl<S: SourceAdapter + ?Sized> SourceAdapter for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_listing(&self) -> SourceResult<Vec<SourceRecord>> {
        (**self).fetch_listing()
    }
}
