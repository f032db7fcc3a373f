//! Source-to-destination diffing.
//!
//! [`reconcile`] is a pure function: it reads a listing and a snapshot and
//! returns the operations that converge the destination, without touching
//! either input.

use crate::error::{CoreError, CoreResult};
use crate::field::{values_match, Field};
use crate::record::{DestinationRecord, SourceRecord};
use crate::snapshot::Snapshot;
use crate::stale::StalePolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The fields compared to decide whether an existing record needs an update.
///
/// The default watches only the title and the upstream last-modified marker,
/// so fields a user may have edited by hand are not rewritten on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDetection {
    fields: Vec<Field>,
}

impl ChangeDetection {
    /// Watches the given fields.
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        let mut unique = Vec::new();
        for field in fields {
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        Self { fields: unique }
    }

    /// Watches every field the source owns.
    pub fn all_tracked() -> Self {
        Self::new([
            Field::Title,
            Field::SourceUpdatedAt,
            Field::Location,
            Field::Department,
            Field::Experience,
            Field::ApplyUrl,
        ])
    }

    /// Returns the watched fields.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the watched fields whose destination value differs.
    pub fn changed_fields(&self, existing: &DestinationRecord, source: &SourceRecord) -> Vec<Field> {
        self.fields
            .iter()
            .copied()
            .filter(|&field| match source.value_for(field) {
                Some(wanted) => !values_match(existing.field(field), Some(&wanted)),
                None => false,
            })
            .collect()
    }
}

impl Default for ChangeDetection {
    fn default() -> Self {
        Self::new([Field::Title, Field::SourceUpdatedAt])
    }
}

/// Options for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Change-detection field set.
    pub detect: ChangeDetection,
    /// Stale-marking policy.
    pub stale: StalePolicy,
}

/// An existing record that must be brought in line with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    /// The record as found in the snapshot.
    pub existing: DestinationRecord,
    /// The current source record for the same key.
    pub source: SourceRecord,
    /// The fields that triggered the update.
    pub changed: Vec<Field>,
}

/// What a pass decided for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The key is new and gets a record.
    Create,
    /// The record exists and differs from the source.
    Update,
    /// The record exists and matches the source.
    Unchanged,
    /// The key left the source.
    MarkStale,
}

/// Group sizes of a change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    /// Records to create.
    pub creates: usize,
    /// Records to update.
    pub updates: usize,
    /// Records to mark stale.
    pub stale_marks: usize,
    /// Keys left alone.
    pub unchanged: usize,
}

/// The output of one reconciliation pass.
///
/// Each group keeps input order: creates, updates and unchanged keys follow
/// the listing, stale marks follow the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Source records with no destination record.
    pub creates: Vec<SourceRecord>,
    /// Destination records that need new field values.
    pub updates: Vec<PlannedUpdate>,
    /// Destination records whose key left the source.
    pub stale_marks: Vec<DestinationRecord>,
    /// Keys present on both sides with nothing to change.
    pub unchanged: Vec<String>,
}

impl ChangeSet {
    /// Returns true if nothing needs to be created or updated.
    pub fn is_converged(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty()
    }

    /// Returns true if the pass produced no writes at all.
    pub fn is_noop(&self) -> bool {
        self.write_count() == 0
    }

    /// Number of operations that write to the destination.
    pub fn write_count(&self) -> usize {
        self.creates.len() + self.updates.len() + self.stale_marks.len()
    }

    /// Per-group counts.
    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            creates: self.creates.len(),
            updates: self.updates.len(),
            stale_marks: self.stale_marks.len(),
            unchanged: self.unchanged.len(),
        }
    }

    /// Returns the decision taken for every key seen in the pass.
    pub fn outcomes(&self) -> Vec<(&str, Decision)> {
        let mut outcomes = Vec::with_capacity(
            self.write_count() + self.unchanged.len(),
        );
        outcomes.extend(self.creates.iter().map(|r| (r.key.as_str(), Decision::Create)));
        outcomes.extend(
            self.updates
                .iter()
                .map(|u| (u.existing.key.as_str(), Decision::Update)),
        );
        outcomes.extend(self.unchanged.iter().map(|k| (k.as_str(), Decision::Unchanged)));
        outcomes.extend(
            self.stale_marks
                .iter()
                .map(|r| (r.key.as_str(), Decision::MarkStale)),
        );
        outcomes
    }

    /// Returns the decision taken for one key.
    pub fn decision_for(&self, key: &str) -> Option<Decision> {
        self.outcomes()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, decision)| decision)
    }
}

/// Computes the change set converging `snapshot` towards `sources`.
///
/// Fails with [`CoreError::BlankKey`] if a listed record has no key and with
/// [`CoreError::DuplicateKey`] if the listing repeats a key; no partial
/// change set is returned in either case.
pub fn reconcile(
    sources: &[SourceRecord],
    snapshot: &Snapshot,
    options: &ReconcileOptions,
) -> CoreResult<ChangeSet> {
    let mut source_keys: HashSet<&str> = HashSet::with_capacity(sources.len());
    for record in sources {
        if record.key.trim().is_empty() {
            return Err(CoreError::BlankKey {
                title: record.title.clone(),
            });
        }
        if !source_keys.insert(record.key.as_str()) {
            return Err(CoreError::DuplicateKey {
                key: record.key.clone(),
            });
        }
    }

    let mut changes = ChangeSet::default();

    for record in sources {
        let Some(existing) = snapshot.get(&record.key) else {
            changes.creates.push(record.clone());
            continue;
        };

        let mut changed = options.detect.changed_fields(existing, record);
        if options.stale.should_clear(existing) {
            changed.push(Field::StaleMarker);
        }

        if changed.is_empty() {
            changes.unchanged.push(record.key.clone());
        } else {
            changes.updates.push(PlannedUpdate {
                existing: existing.clone(),
                source: record.clone(),
                changed,
            });
        }
    }

    changes.stale_marks = snapshot
        .iter()
        .filter(|existing| !source_keys.contains(existing.key.as_str()))
        .cloned()
        .collect();

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValue;

    fn source(key: &str, title: &str) -> SourceRecord {
        SourceRecord::new(key, title, "Tokyo, Japan", "Software")
    }

    fn dest(id: &str, key: &str, title: &str, updated_at: Option<&str>) -> DestinationRecord {
        let mut record =
            DestinationRecord::new(id, key).with_field(Field::Title, FieldValue::text(title));
        if let Some(ts) = updated_at {
            record = record.with_field(Field::SourceUpdatedAt, FieldValue::text(ts));
        }
        record
    }

    #[test]
    fn empty_snapshot_creates_everything() {
        let sources = vec![source("J1", "Engineer")];
        let changes = reconcile(&sources, &Snapshot::new(), &ReconcileOptions::default()).unwrap();

        assert_eq!(changes.creates, sources);
        assert!(changes.updates.is_empty());
        assert!(changes.stale_marks.is_empty());
        assert!(changes.unchanged.is_empty());
    }

    #[test]
    fn matching_record_is_unchanged() {
        let sources = vec![source("J1", "Engineer").with_updated_at("t0")];
        let snapshot =
            Snapshot::from_records(vec![dest("p1", "J1", "Engineer", Some("t0"))]).unwrap();

        let changes = reconcile(&sources, &snapshot, &ReconcileOptions::default()).unwrap();
        assert!(changes.creates.is_empty());
        assert!(changes.updates.is_empty());
        assert!(changes.stale_marks.is_empty());
        assert_eq!(changes.unchanged, vec!["J1".to_string()]);
        assert_eq!(changes.decision_for("J1"), Some(Decision::Unchanged));
    }

    #[test]
    fn title_change_updates_and_missing_key_goes_stale() {
        let sources = vec![source("J1", "New Title")];
        let snapshot = Snapshot::from_records(vec![
            dest("p1", "J1", "Engineer", None),
            dest("p2", "J2", "Analyst", None),
        ])
        .unwrap();

        let changes = reconcile(&sources, &snapshot, &ReconcileOptions::default()).unwrap();
        assert!(changes.creates.is_empty());
        assert_eq!(changes.updates.len(), 1);
        assert_eq!(changes.updates[0].existing.id, "p1");
        assert_eq!(changes.updates[0].changed, vec![Field::Title]);
        assert_eq!(changes.stale_marks.len(), 1);
        assert_eq!(changes.stale_marks[0].key, "J2");
    }

    #[test]
    fn updated_at_change_triggers_update() {
        let sources = vec![source("J1", "Engineer").with_updated_at("t1")];
        let snapshot =
            Snapshot::from_records(vec![dest("p1", "J1", "Engineer", Some("t0"))]).unwrap();

        let changes = reconcile(&sources, &snapshot, &ReconcileOptions::default()).unwrap();
        assert_eq!(changes.updates[0].changed, vec![Field::SourceUpdatedAt]);
    }

    #[test]
    fn location_drift_ignored_by_default() {
        let sources = vec![SourceRecord::new("J1", "Engineer", "Taipei", "Software")];
        let snapshot = Snapshot::from_records(vec![dest("p1", "J1", "Engineer", None)
            .with_field(Field::Location, FieldValue::select("Tokyo Japan"))])
        .unwrap();

        let default = reconcile(&sources, &snapshot, &ReconcileOptions::default()).unwrap();
        assert!(default.updates.is_empty());

        let options = ReconcileOptions {
            detect: ChangeDetection::all_tracked(),
            ..Default::default()
        };
        let strict = reconcile(&sources, &snapshot, &options).unwrap();
        assert!(strict.updates[0].changed.contains(&Field::Location));
    }

    #[test]
    fn empty_listing_marks_everything_stale() {
        let snapshot = Snapshot::from_records(vec![
            dest("p1", "J1", "A", None),
            dest("p2", "J2", "B", None),
        ])
        .unwrap();

        let changes = reconcile(&[], &snapshot, &ReconcileOptions::default()).unwrap();
        let stale: Vec<_> = changes.stale_marks.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(stale, vec!["J1", "J2"]);
        assert!(changes.is_converged());
        assert!(!changes.is_noop());
        assert_eq!(changes.counts().stale_marks, 2);
    }

    #[test]
    fn duplicate_source_keys_rejected() {
        let sources = vec![source("J1", "A"), source("J2", "B"), source("J1", "C")];
        let err = reconcile(&sources, &Snapshot::new(), &ReconcileOptions::default()).unwrap_err();
        assert_eq!(err, CoreError::DuplicateKey { key: "J1".into() });
    }

    #[test]
    fn blank_source_keys_rejected() {
        let snapshot = Snapshot::from_records(vec![dest("p1", "", "Engineer", None)]).unwrap();
        for key in ["", "  "] {
            let sources = vec![source("J1", "A"), source(key, "Engineer")];
            let err = reconcile(&sources, &snapshot, &ReconcileOptions::default()).unwrap_err();
            assert_eq!(
                err,
                CoreError::BlankKey {
                    title: "Engineer".into()
                }
            );
        }
    }

    #[test]
    fn stale_record_reappearing_keeps_marker_by_default() {
        let sources = vec![source("J1", "Engineer")];
        let snapshot = Snapshot::from_records(vec![
            dest("p1", "J1", "Engineer", None).with_stale_marker("closed (2024-01-01)"),
        ])
        .unwrap();

        let changes = reconcile(&sources, &snapshot, &ReconcileOptions::default()).unwrap();
        assert_eq!(changes.unchanged, vec!["J1".to_string()]);

        let options = ReconcileOptions {
            stale: StalePolicy::default().with_clear_on_reappear(true),
            ..Default::default()
        };
        let changes = reconcile(&sources, &snapshot, &options).unwrap();
        assert_eq!(changes.updates[0].changed, vec![Field::StaleMarker]);
    }

    #[test]
    fn groups_preserve_input_order() {
        let sources = vec![source("J3", "C"), source("J1", "A"), source("J2", "B")];
        let changes = reconcile(&sources, &Snapshot::new(), &ReconcileOptions::default()).unwrap();
        let keys: Vec<_> = changes.creates.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["J3", "J1", "J2"]);
    }

    #[test]
    fn change_detection_dedups_fields() {
        let detect = ChangeDetection::new([Field::Title, Field::Title, Field::ApplyUrl]);
        assert_eq!(detect.fields(), &[Field::Title, Field::ApplyUrl]);
    }
}
