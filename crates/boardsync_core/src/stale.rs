//! Stale-marking policy.

use crate::field::{Field, FieldMap, FieldValue};
use crate::record::DestinationRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default marker text written when a key disappears from the source.
pub const DEFAULT_MARKER_TEXT: &str = "⚠️ Posting may be closed";

/// How records whose key left the source are annotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalePolicy {
    /// Fixed text at the start of every annotation.
    pub marker_text: String,
    /// Whether a reappearing key gets its annotation cleared.
    pub clear_on_reappear: bool,
}

impl StalePolicy {
    /// Creates a policy with the given marker text.
    pub fn new(marker_text: impl Into<String>) -> Self {
        Self {
            marker_text: marker_text.into(),
            clear_on_reappear: false,
        }
    }

    /// Sets whether reappearing keys are cleared.
    pub fn with_clear_on_reappear(mut self, clear: bool) -> Self {
        self.clear_on_reappear = clear;
        self
    }

    /// Returns the annotation for the given date.
    pub fn annotation(&self, today: NaiveDate) -> String {
        format!("{} ({})", self.marker_text, today.format("%Y-%m-%d"))
    }

    /// Returns the patch that marks a record stale on `today`.
    pub fn mark_patch(&self, today: NaiveDate) -> FieldMap {
        let mut patch = FieldMap::new();
        patch.insert(Field::StaleMarker, FieldValue::Text(self.annotation(today)));
        patch
    }

    /// Returns true if the record already carries today's annotation.
    pub fn is_marked_on(&self, record: &DestinationRecord, today: NaiveDate) -> bool {
        record.stale_marker.as_deref() == Some(self.annotation(today).as_str())
    }

    /// Returns true if a record present in the source should be cleared.
    pub fn should_clear(&self, record: &DestinationRecord) -> bool {
        self.clear_on_reappear && record.is_stale()
    }
}

impl Default for StalePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_TEXT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn annotation_contains_marker_and_date() {
        let policy = StalePolicy::default();
        let text = policy.annotation(day());
        assert!(text.starts_with(DEFAULT_MARKER_TEXT));
        assert!(text.ends_with("(2024-05-17)"));
    }

    #[test]
    fn mark_patch_touches_only_marker() {
        let patch = StalePolicy::new("closed").mark_patch(day());
        assert_eq!(patch.len(), 1);
        assert_eq!(
            patch.get(&Field::StaleMarker),
            Some(&FieldValue::text("closed (2024-05-17)"))
        );
    }

    #[test]
    fn already_marked_today() {
        let policy = StalePolicy::new("closed");
        let record = DestinationRecord::new("p", "J1").with_stale_marker("closed (2024-05-17)");
        assert!(policy.is_marked_on(&record, day()));

        let yesterday = day().pred_opt().unwrap();
        assert!(!policy.is_marked_on(&record, yesterday));
    }

    #[test]
    fn clearing_is_opt_in() {
        let record = DestinationRecord::new("p", "J1").with_stale_marker("closed (2024-05-17)");
        assert!(!StalePolicy::default().should_clear(&record));
        assert!(StalePolicy::default().with_clear_on_reappear(true).should_clear(&record));

        let fresh = DestinationRecord::new("p", "J2");
        assert!(!StalePolicy::default().with_clear_on_reappear(true).should_clear(&fresh));
    }
}
