//! Test fixtures: sample records, a fixed clock and upstream payloads.

use boardsync_core::{
    ContentSections, DestinationRecord, Field, FieldValue, Section, SourceRecord,
};
use boardsync_engine::{EngineConfig, FixedClock};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use std::time::Duration;

/// The date every fixture run takes place on.
pub fn fixture_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid fixture date")
}

/// The instant every fixture run takes place at.
pub fn fixture_now() -> NaiveDateTime {
    fixture_date()
        .and_hms_opt(8, 15, 0)
        .expect("valid fixture time")
}

/// A clock stuck at [`fixture_now`].
pub fn fixed_clock() -> FixedClock {
    FixedClock(fixture_now())
}

/// Engine configuration with no pacing between writes.
pub fn fast_config() -> EngineConfig {
    EngineConfig::new().with_write_interval(Duration::ZERO)
}

/// A listing-only source record.
pub fn source_record(key: &str, title: &str) -> SourceRecord {
    SourceRecord::new(key, title, "Taipei, Taiwan", "Hardware Engineering")
        .with_apply_url(format!("https://boards.example/jobs/{key}"))
}

/// A source record carrying an upstream timestamp.
pub fn source_record_at(key: &str, title: &str, updated_at: &str) -> SourceRecord {
    source_record(key, title).with_updated_at(updated_at)
}

/// A source record with body sections.
pub fn detailed_record(key: &str, title: &str) -> SourceRecord {
    let mut sections = ContentSections::new();
    sections.insert(Section::About, format!("About {title}."));
    sections.insert(Section::Responsibilities, "Ship hardware.".to_string());
    sections.insert(Section::RequiredQualifications, "3+ years of EE".to_string());
    source_record(key, title)
        .with_years_required(3)
        .with_sections(sections)
}

/// A destination record as a previous run would have left it.
pub fn destination_record(id: &str, key: &str, title: &str) -> DestinationRecord {
    DestinationRecord::new(id, key)
        .with_field(Field::Title, FieldValue::text(title))
        .with_field(Field::Key, FieldValue::text(key))
        .with_field(Field::Status, FieldValue::select("Not applied"))
}

/// A destination record with an upstream timestamp.
pub fn destination_record_at(
    id: &str,
    key: &str,
    title: &str,
    updated_at: &str,
) -> DestinationRecord {
    destination_record(id, key, title).with_field(Field::SourceUpdatedAt, FieldValue::text(updated_at))
}

/// One job entry as returned by a board listing endpoint.
pub fn listing_job(id: u64, title: &str, location: &str, updated_at: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "location": { "name": location },
        "absolute_url": format!("https://boards.example/jobs/{id}"),
        "updated_at": updated_at,
    })
}

/// A board listing response.
pub fn listing_response(jobs: Vec<Value>) -> Value {
    let total = jobs.len();
    json!({ "jobs": jobs, "meta": { "total": total } })
}

/// A board detail response with escaped HTML content.
pub fn detail_response(id: u64, department: &str, content: &str) -> Value {
    json!({
        "id": id,
        "content": content,
        "departments": [{ "name": department }],
    })
}
