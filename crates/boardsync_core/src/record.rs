//! Source and destination records.

use crate::field::{Field, FieldMap, FieldValue};
use crate::normalize::{
    classify_experience, normalize_department, normalize_location, truncate_chars,
    MAX_SECTION_LEN,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Seniority band inferred from a posting title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    /// Internship.
    Intern,
    /// Entry level or junior.
    Entry,
    /// Mid level.
    Mid,
    /// Senior or lead.
    Senior,
    /// Staff.
    Staff,
    /// Principal or distinguished.
    Principal,
    /// People manager.
    Manager,
    /// No recognizable marker in the title.
    Unspecified,
}

impl ExperienceLevel {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ExperienceLevel::Intern => "Intern",
            ExperienceLevel::Entry => "Entry",
            ExperienceLevel::Mid => "Mid",
            ExperienceLevel::Senior => "Senior",
            ExperienceLevel::Staff => "Staff",
            ExperienceLevel::Principal => "Principal",
            ExperienceLevel::Manager => "Manager",
            ExperienceLevel::Unspecified => "Unspecified",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named section of a posting body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// "About the job" / "About the team".
    About,
    /// "What you'll do".
    Responsibilities,
    /// "Required qualifications".
    RequiredQualifications,
    /// "Preferred qualifications".
    PreferredQualifications,
}

impl Section {
    /// All sections, in rendering order.
    pub const ALL: [Section; 4] = [
        Section::About,
        Section::Responsibilities,
        Section::RequiredQualifications,
        Section::PreferredQualifications,
    ];

    /// Returns the heading used when rendering the section.
    pub fn heading(&self) -> &'static str {
        match self {
            Section::About => "About the Job",
            Section::Responsibilities => "What You'll Do",
            Section::RequiredQualifications => "Required Qualifications",
            Section::PreferredQualifications => "Preferred Qualifications",
        }
    }
}

/// Section texts of a posting.
pub type ContentSections = BTreeMap<Section, String>;

/// One posting from the upstream listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Stable external identifier.
    pub key: String,
    /// Posting title.
    pub title: String,
    /// Raw location.
    pub location: String,
    /// Location mapped through the location table.
    pub normalized_location: String,
    /// Raw department.
    pub department: String,
    /// Department mapped through the department table.
    pub normalized_department: String,
    /// Seniority band inferred from the title.
    pub experience_level: ExperienceLevel,
    /// Minimum years of experience named in the requirements.
    pub years_required: Option<u32>,
    /// Application link.
    pub apply_url: Option<String>,
    /// Body sections; absent in reduced-fetch mode.
    pub content_sections: Option<ContentSections>,
    /// Upstream last-modified marker.
    pub source_updated_at: Option<String>,
}

impl SourceRecord {
    /// Creates a record, deriving the normalized fields.
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        location: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let location = location.into();
        let department = department.into();
        Self {
            key: key.into(),
            experience_level: classify_experience(&title),
            normalized_location: normalize_location(&location),
            normalized_department: normalize_department(&department),
            title,
            location,
            department,
            years_required: None,
            apply_url: None,
            content_sections: None,
            source_updated_at: None,
        }
    }

    /// Sets the application link.
    pub fn with_apply_url(mut self, url: impl Into<String>) -> Self {
        self.apply_url = Some(url.into());
        self
    }

    /// Sets the upstream last-modified marker.
    pub fn with_updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.source_updated_at = Some(updated_at.into());
        self
    }

    /// Sets the required years of experience.
    pub fn with_years_required(mut self, years: u32) -> Self {
        self.years_required = Some(years);
        self
    }

    /// Sets the body sections. Empty texts are dropped and the rest capped.
    pub fn with_sections(mut self, sections: ContentSections) -> Self {
        let sections = sections
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(section, text)| (section, truncate_chars(text.trim(), MAX_SECTION_LEN)))
            .collect();
        self.content_sections = Some(sections);
        self
    }

    /// Returns the text of a section, if fetched and non-empty.
    pub fn section(&self, section: Section) -> Option<&str> {
        self.content_sections
            .as_ref()
            .and_then(|sections| sections.get(&section))
            .map(String::as_str)
    }

    /// Returns the experience text written to the destination.
    pub fn experience_label(&self) -> String {
        match (self.experience_level, self.years_required) {
            (ExperienceLevel::Unspecified, Some(years)) => format!("{years}+ years"),
            (level, Some(years)) => format!("{level} · {years}+ years"),
            (level, None) => level.label().to_string(),
        }
    }

    /// Returns the destination value this record implies for a field.
    ///
    /// Fields the source does not own (status, creation date, stale marker)
    /// return `None`. Summary returns `None` when sections were not fetched
    /// and department when it is unknown, so reduced-fetch runs never blank
    /// them.
    pub fn value_for(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Title => Some(FieldValue::text(&self.title)),
            Field::Key => Some(FieldValue::text(&self.key)),
            Field::Department => (!self.department.trim().is_empty())
                .then(|| FieldValue::select(&self.normalized_department)),
            Field::Location => Some(FieldValue::select(&self.normalized_location)),
            Field::Experience => Some(FieldValue::text(self.experience_label())),
            Field::ApplyUrl => Some(FieldValue::url(self.apply_url.as_deref())),
            Field::Summary => self
                .content_sections
                .as_ref()
                .map(|sections| FieldValue::optional_text(sections.get(&Section::About).map(String::as_str))),
            Field::SourceUpdatedAt => Some(FieldValue::optional_text(self.source_updated_at.as_deref())),
            Field::Status | Field::AddedOn | Field::StaleMarker => None,
        }
    }
}

/// One persisted record in the destination store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRecord {
    /// Store-assigned identifier.
    pub id: String,
    /// Join key copied from the source at creation.
    pub key: String,
    /// Tracked attributes.
    pub fields: FieldMap,
    /// Stale annotation, if set.
    pub stale_marker: Option<String>,
}

impl DestinationRecord {
    /// Creates a record with no fields.
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            fields: FieldMap::new(),
            stale_marker: None,
        }
    }

    /// Sets a field value.
    pub fn with_field(mut self, field: Field, value: FieldValue) -> Self {
        self.fields.insert(field, value);
        self
    }

    /// Sets the stale annotation.
    pub fn with_stale_marker(mut self, marker: impl Into<String>) -> Self {
        self.stale_marker = Some(marker.into());
        self
    }

    /// Returns a field value.
    pub fn field(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Returns true if a stale annotation is present.
    pub fn is_stale(&self) -> bool {
        self.stale_marker
            .as_deref()
            .is_some_and(|marker| !marker.trim().is_empty())
    }

    /// Applies a partial update in place.
    ///
    /// A `StaleMarker` entry sets or clears the annotation; every other entry
    /// overwrites the field.
    pub fn apply_patch(&mut self, patch: &FieldMap) {
        for (field, value) in patch {
            if *field == Field::StaleMarker {
                self.stale_marker = value.as_text().filter(|s| !s.trim().is_empty());
            } else {
                self.fields.insert(*field, value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_normalizes_fields() {
        let record = SourceRecord::new("4001", "Senior Test Engineer", "Taipei, Taiwan", "Test");
        assert_eq!(record.normalized_location, "Taipei Taiwan");
        assert_eq!(record.normalized_department, "Electrical Test Engineering");
        assert_eq!(record.experience_level, ExperienceLevel::Senior);
        assert!(record.content_sections.is_none());
    }

    #[test]
    fn sections_are_trimmed_and_capped() {
        let mut sections = ContentSections::new();
        sections.insert(Section::About, format!("  {}  ", "a".repeat(2500)));
        sections.insert(Section::PreferredQualifications, "   ".into());

        let record = SourceRecord::new("1", "Engineer", "Tokyo", "R&D").with_sections(sections);
        assert_eq!(record.section(Section::About).unwrap().len(), 2000);
        assert!(record.section(Section::PreferredQualifications).is_none());
    }

    #[test]
    fn experience_labels() {
        let record = SourceRecord::new("1", "Engineer", "Tokyo", "R&D");
        assert_eq!(record.experience_label(), "Unspecified");
        assert_eq!(record.clone().with_years_required(3).experience_label(), "3+ years");

        let senior = SourceRecord::new("2", "Senior Engineer", "Tokyo", "R&D").with_years_required(5);
        assert_eq!(senior.experience_label(), "Senior · 5+ years");
    }

    #[test]
    fn summary_absent_without_sections() {
        let record = SourceRecord::new("1", "Engineer", "Tokyo", "R&D");
        assert_eq!(record.value_for(Field::Summary), None);
        assert_eq!(record.value_for(Field::Status), None);

        let unknown_department = SourceRecord::new("2", "Engineer", "Tokyo", "");
        assert_eq!(unknown_department.value_for(Field::Department), None);

        let with_sections = record.with_sections(ContentSections::new());
        assert_eq!(with_sections.value_for(Field::Summary), Some(FieldValue::Empty));
    }

    #[test]
    fn patch_sets_and_clears_stale_marker() {
        let mut record = DestinationRecord::new("page-1", "J1")
            .with_field(Field::Title, FieldValue::text("Old"));

        let mut patch = FieldMap::new();
        patch.insert(Field::StaleMarker, FieldValue::text("closed (2024-01-01)"));
        patch.insert(Field::Title, FieldValue::text("New"));
        record.apply_patch(&patch);
        assert!(record.is_stale());
        assert_eq!(record.field(Field::Title), Some(&FieldValue::text("New")));

        let mut clear = FieldMap::new();
        clear.insert(Field::StaleMarker, FieldValue::Empty);
        record.apply_patch(&clear);
        assert!(!record.is_stale());
        assert!(!record.fields.contains_key(&Field::StaleMarker));
    }
}
