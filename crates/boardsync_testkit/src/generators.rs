//! Property-based test generators using proptest.
//!
//! Listings and snapshots are drawn from a small key space so that the
//! generated sides overlap often.

use boardsync_core::{DestinationRecord, Field, FieldValue, SourceRecord};
use proptest::prelude::*;
use std::collections::BTreeSet;

const LOCATIONS: &[&str] = &[
    "Taipei, Taiwan",
    "Tokyo, Japan",
    "Seoul, South Korea",
    "Singapore",
    "Costa Mesa, California, United States",
];

const DEPARTMENTS: &[&str] = &[
    "Hardware Engineering",
    "Software Engineering",
    "Supply Chain",
    "Business Development",
    "",
];

/// Strategy for generating record keys.
pub fn key_strategy() -> impl Strategy<Value = String> {
    (1u32..40).prop_map(|n| format!("J{n}"))
}

/// Strategy for generating posting titles.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "Test Engineer",
        "Senior Hardware Engineer",
        "Intern, Firmware",
        "Staff Software Engineer",
        "Supply Chain Manager",
        "Director, Operations",
    ])
    .prop_map(str::to_string)
}

/// Strategy for generating upstream timestamps.
pub fn updated_at_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of((0u32..3).prop_map(|n| format!("2025-03-0{}T00:00:00Z", n + 1)))
}

/// Strategy for generating one source record with the given key.
pub fn source_record_strategy(key: String) -> impl Strategy<Value = SourceRecord> {
    (
        title_strategy(),
        prop::sample::select(LOCATIONS),
        prop::sample::select(DEPARTMENTS),
        updated_at_strategy(),
    )
        .prop_map(move |(title, location, department, updated_at)| {
            let record = SourceRecord::new(key.clone(), title, location, department);
            match updated_at {
                Some(at) => record.with_updated_at(at),
                None => record,
            }
        })
}

/// Strategy for generating a listing with unique keys.
pub fn listing_strategy(max: usize) -> impl Strategy<Value = Vec<SourceRecord>> {
    prop::collection::btree_set(key_strategy(), 0..=max).prop_flat_map(|keys: BTreeSet<String>| {
        keys.into_iter()
            .map(source_record_strategy)
            .collect::<Vec<_>>()
    })
}

/// Strategy for generating destination records with unique keys.
///
/// Some records carry a stale marker.
pub fn destination_records_strategy(max: usize) -> impl Strategy<Value = Vec<DestinationRecord>> {
    prop::collection::btree_set(key_strategy(), 0..=max).prop_flat_map(|keys: BTreeSet<String>| {
        keys.into_iter()
            .enumerate()
            .map(|(i, key)| {
                (title_strategy(), updated_at_strategy(), any::<bool>()).prop_map(
                    move |(title, updated_at, stale)| {
                        let mut record = DestinationRecord::new(format!("page-{i}"), key.clone())
                            .with_field(Field::Title, FieldValue::text(title))
                            .with_field(Field::Key, FieldValue::text(key.clone()));
                        if let Some(at) = updated_at {
                            record = record.with_field(Field::SourceUpdatedAt, FieldValue::text(at));
                        }
                        if stale {
                            record = record.with_stale_marker("⚠️ Posting may be closed (2025-03-01)");
                        }
                        record
                    },
                )
            })
            .collect::<Vec<_>>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;
    use std::collections::HashSet;

    #[test]
    fn listings_have_unique_keys() {
        let mut runner = TestRunner::default();
        for _ in 0..32 {
            let listing = listing_strategy(20)
                .new_tree(&mut runner)
                .unwrap()
                .current();
            let keys: HashSet<_> = listing.iter().map(|r| r.key.as_str()).collect();
            assert_eq!(keys.len(), listing.len());
        }
    }

    #[test]
    fn destination_ids_are_unique() {
        let mut runner = TestRunner::default();
        let records = destination_records_strategy(20)
            .new_tree(&mut runner)
            .unwrap()
            .current();
        let ids: HashSet<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), records.len());
    }
}
