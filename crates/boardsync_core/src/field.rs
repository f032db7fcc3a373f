//! Tracked destination fields and their values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A partial or complete set of field values, ordered by field.
pub type FieldMap = BTreeMap<Field, FieldValue>;

/// An attribute of a destination record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Posting title.
    Title,
    /// Stable identifier copied from the source.
    Key,
    /// Normalized department.
    Department,
    /// Normalized location.
    Location,
    /// Experience classification.
    Experience,
    /// Application link.
    ApplyUrl,
    /// Short description (the "about" section).
    Summary,
    /// Application status, owned by the user after creation.
    Status,
    /// Date the record was first created.
    AddedOn,
    /// Upstream last-modified marker.
    SourceUpdatedAt,
    /// Stale annotation.
    StaleMarker,
}

impl Field {
    /// Every field, in declaration order.
    pub const ALL: [Field; 11] = [
        Field::Title,
        Field::Key,
        Field::Department,
        Field::Location,
        Field::Experience,
        Field::ApplyUrl,
        Field::Summary,
        Field::Status,
        Field::AddedOn,
        Field::SourceUpdatedAt,
        Field::StaleMarker,
    ];

    /// Returns the snake_case name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Key => "key",
            Field::Department => "department",
            Field::Location => "location",
            Field::Experience => "experience",
            Field::ApplyUrl => "apply_url",
            Field::Summary => "summary",
            Field::Status => "status",
            Field::AddedOn => "added_on",
            Field::SourceUpdatedAt => "source_updated_at",
            Field::StaleMarker => "stale_marker",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// One option out of a set.
    Select(String),
    /// A link.
    Url(String),
    /// A calendar date.
    Date(NaiveDate),
    /// Explicitly cleared.
    Empty,
}

impl FieldValue {
    /// Creates a text value.
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Creates a select value.
    pub fn select(value: impl Into<String>) -> Self {
        FieldValue::Select(value.into())
    }

    /// Creates a URL value, or `Empty` when absent.
    pub fn url(value: Option<&str>) -> Self {
        match value {
            Some(url) if !url.trim().is_empty() => FieldValue::Url(url.to_string()),
            _ => FieldValue::Empty,
        }
    }

    /// Creates a text value, or `Empty` when absent.
    pub fn optional_text(value: Option<&str>) -> Self {
        match value {
            Some(text) if !text.is_empty() => FieldValue::Text(text.to_string()),
            _ => FieldValue::Empty,
        }
    }

    /// Returns the textual content of the value, if any.
    ///
    /// Dates are rendered as `YYYY-MM-DD`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) | FieldValue::Select(s) | FieldValue::Url(s) => Some(s.clone()),
            FieldValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            FieldValue::Empty => None,
        }
    }

    /// Returns true if the value carries no content.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Select(s) | FieldValue::Url(s) => s.trim().is_empty(),
            FieldValue::Date(_) => false,
            FieldValue::Empty => true,
        }
    }
}

/// Compares two optional values, treating blank and absent as equal.
///
/// Values of different variants with the same text compare equal, since a
/// store may round-trip a select as plain text.
pub fn values_match(left: Option<&FieldValue>, right: Option<&FieldValue>) -> bool {
    let left = left.filter(|v| !v.is_blank());
    let right = right.filter(|v| !v.is_blank());
    match (left, right) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b || a.as_text() == b.as_text(),
        _ => false,
    }
}
