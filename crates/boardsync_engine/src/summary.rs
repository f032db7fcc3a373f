//! End-of-run reporting.

use crate::error::WriteError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A destination write performed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Record creation.
    Create,
    /// Field update.
    Update,
    /// Body replacement after an update.
    ReplaceContent,
    /// Stale annotation.
    MarkStale,
}

impl Operation {
    /// Returns the operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::ReplaceContent => "replace_content",
            Operation::MarkStale => "mark_stale",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-record failure as reported in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedWrite {
    /// Key of the record.
    pub key: String,
    /// The failed operation.
    pub operation: Operation,
    /// Error message.
    pub error: String,
}

impl From<&WriteError> for FailedWrite {
    fn from(err: &WriteError) -> Self {
        Self {
            key: err.key.clone(),
            operation: err.operation,
            error: err.source.to_string(),
        }
    }
}

/// Outcome counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records in the source listing.
    pub source_records: usize,
    /// Keyed records in the destination snapshot.
    pub destination_records: usize,
    /// Records created.
    pub created: usize,
    /// Records updated.
    pub updated: usize,
    /// Records left alone.
    pub unchanged: usize,
    /// Records newly marked stale.
    pub marked_stale: usize,
    /// Stale records already carrying today's annotation.
    pub already_stale: usize,
    /// Per-record failures.
    pub failures: Vec<FailedWrite>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// True if nothing was written because the run was a dry run.
    pub dry_run: bool,
    /// True if the run stopped early.
    pub cancelled: bool,
}

impl RunSummary {
    /// Number of failed record operations.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.marked_stale
    }

    /// Returns true if any record operation failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} updated={} unchanged={} marked_stale={} already_stale={} failed={}",
            self.created,
            self.updated,
            self.unchanged,
            self.marked_stale,
            self.already_stale,
            self.failed()
        )?;
        if self.dry_run {
            f.write_str(" (dry run)")?;
        }
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsync_client::ClientError;

    #[test]
    fn summary_display() {
        let summary = RunSummary {
            created: 1,
            updated: 2,
            unchanged: 3,
            failures: vec![FailedWrite::from(&WriteError::new(
                "J1",
                Operation::Update,
                ClientError::timeout("t"),
            ))],
            dry_run: true,
            ..RunSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "created=1 updated=2 unchanged=3 marked_stale=0 already_stale=0 failed=1 (dry run)"
        );
        assert_eq!(summary.writes(), 3);
        assert!(summary.has_failures());
        assert_eq!(summary.failures[0].operation.to_string(), "update");
    }

    #[test]
    fn summary_serializes_operations_in_snake_case() {
        let failure = FailedWrite {
            key: "J1".into(),
            operation: Operation::ReplaceContent,
            error: "x".into(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["operation"], "replace_content");
    }
}
