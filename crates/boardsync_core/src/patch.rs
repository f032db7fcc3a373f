//! Field sets written by create and update operations.

use crate::field::{Field, FieldMap, FieldValue};
use crate::record::{DestinationRecord, SourceRecord};
use crate::stale::StalePolicy;
use chrono::NaiveDate;

/// Status given to every newly created record.
pub const INITIAL_STATUS: &str = "Not applied";

/// Fields copied from the source on both create and update.
const SOURCE_FIELDS: [Field; 6] = [
    Field::Title,
    Field::Department,
    Field::Location,
    Field::Experience,
    Field::ApplyUrl,
    Field::SourceUpdatedAt,
];

fn source_fields(source: &SourceRecord) -> FieldMap {
    let mut fields = FieldMap::new();
    for field in SOURCE_FIELDS {
        if let Some(value) = source.value_for(field) {
            fields.insert(field, value);
        }
    }
    if let Some(summary) = source.value_for(Field::Summary) {
        fields.insert(Field::Summary, summary);
    }
    fields
}

/// Returns the complete field set for a new record.
pub fn create_fields(source: &SourceRecord, today: NaiveDate) -> FieldMap {
    let mut fields = source_fields(source);
    fields.insert(Field::Key, FieldValue::text(&source.key));
    fields.insert(Field::Status, FieldValue::select(INITIAL_STATUS));
    fields.insert(Field::AddedOn, FieldValue::Date(today));
    fields
}

/// Returns the partial field set for an update.
///
/// Only source-derived fields are written. Status, creation date and key are
/// left as they are. The stale marker is blanked only when the policy clears
/// reappearing records and this one is marked.
pub fn update_fields(
    source: &SourceRecord,
    existing: &DestinationRecord,
    policy: &StalePolicy,
) -> FieldMap {
    let mut fields = source_fields(source);
    if policy.should_clear(existing) {
        fields.insert(Field::StaleMarker, FieldValue::Empty);
    }
    fields
}
