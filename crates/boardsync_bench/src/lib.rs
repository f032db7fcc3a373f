//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use boardsync_core::{DestinationRecord, Field, FieldValue, SourceRecord};
use rand::seq::SliceRandom;
use rand::Rng;

const TITLES: &[&str] = &[
    "Test Engineer",
    "Senior Hardware Engineer",
    "Staff Software Engineer",
    "Supply Chain Manager",
    "Intern, Firmware",
];

const LOCATIONS: &[&str] = &["Taipei, Taiwan", "Tokyo, Japan", "Hsinchu, Taiwan"];

/// Generates a listing of `count` postings with keys `J0..`.
pub fn generate_listing(count: usize) -> Vec<SourceRecord> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let title = TITLES.choose(&mut rng).copied().unwrap_or("Engineer");
            let location = LOCATIONS.choose(&mut rng).copied().unwrap_or("Taipei");
            SourceRecord::new(format!("J{i}"), title, location, "Hardware Engineering")
                .with_updated_at(format!("2025-03-{:02}T00:00:00Z", rng.gen_range(1..28)))
        })
        .collect()
}

/// Generates a snapshot matching `listing`, shifted by `offset` keys.
///
/// About `changed_ratio` of the overlapping records get a different title.
/// Keys below `offset` exist only in the snapshot, so they go stale.
pub fn generate_snapshot(
    listing: &[SourceRecord],
    offset: usize,
    changed_ratio: f64,
) -> Vec<DestinationRecord> {
    let mut rng = rand::thread_rng();
    let stale = (0..offset).map(|i| {
        DestinationRecord::new(format!("gone-{i}"), format!("X{i}"))
            .with_field(Field::Title, FieldValue::text("Closed posting"))
    });
    let live = listing.iter().skip(offset).enumerate().map(|(i, record)| {
        let title = if rng.gen_bool(changed_ratio) {
            "Renamed posting".to_string()
        } else {
            record.title.clone()
        };
        DestinationRecord::new(format!("page-{i}"), record.key.clone())
            .with_field(Field::Title, FieldValue::text(title))
            .with_field(
                Field::SourceUpdatedAt,
                FieldValue::optional_text(record.source_updated_at.as_deref()),
            )
    });
    stale.chain(live).collect()
}

/// A posting body as served by board APIs, HTML-escaped.
pub fn escaped_posting(paragraphs: usize) -> String {
    let mut html = String::from("&lt;h3&gt;About the Job&lt;/h3&gt;");
    for i in 0..paragraphs {
        html.push_str(&format!(
            "&lt;p&gt;Paragraph {i} about autonomous systems &amp;amp; sensors.&lt;/p&gt;"
        ));
    }
    html.push_str("&lt;h3&gt;What You'll Do&lt;/h3&gt;&lt;ul&gt;&lt;li&gt;Build rigs&lt;/li&gt;&lt;/ul&gt;");
    html.push_str("&lt;h3&gt;Required Qualifications&lt;/h3&gt;&lt;p&gt;5+ years&lt;/p&gt;");
    html
}
