//! Fixed normalization tables for free-text source fields.

use crate::record::ExperienceLevel;

/// Maximum length, in characters, of a value passed through unmapped.
///
/// Passthrough values lose their commas first, since select options cannot
/// hold them.
pub const MAX_PASSTHROUGH_LEN: usize = 100;

/// Maximum length, in characters, of a single content section.
pub const MAX_SECTION_LEN: usize = 2000;

/// Location keywords and their canonical names. First match wins.
pub const LOCATION_TABLE: &[(&str, &str)] = &[
    ("taipei", "Taipei Taiwan"),
    ("taiwan", "Taipei Taiwan"),
    ("tokyo", "Tokyo Japan"),
    ("japan", "Tokyo Japan"),
];

/// Department keywords and their canonical names. First match wins.
pub const DEPARTMENT_TABLE: &[(&str, &str)] = &[
    ("test", "Electrical Test Engineering"),
    ("electrical", "Electrical Test Engineering"),
    ("business", "Business Development"),
    ("bd", "Business Development"),
];

/// Truncates a string to at most `max` characters.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

fn lookup(table: &[(&str, &str)], raw: &str) -> String {
    let lower = raw.to_lowercase();
    table
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or_else(|| truncate_chars(&raw.replace(',', ""), MAX_PASSTHROUGH_LEN))
}

/// Maps a raw location onto its canonical name.
pub fn normalize_location(raw: &str) -> String {
    lookup(LOCATION_TABLE, raw)
}

/// Maps a raw department onto its canonical name.
pub fn normalize_department(raw: &str) -> String {
    lookup(DEPARTMENT_TABLE, raw)
}

/// Returns true if the location mentions any keyword of the location table.
pub fn is_tracked_location(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    LOCATION_TABLE.iter().any(|(keyword, _)| lower.contains(keyword))
}

/// Infers a seniority band from title keywords.
///
/// More specific bands are checked first, so "Senior Staff Engineer" is
/// `Staff` and "Principal Engineering Manager" is `Principal`.
pub fn classify_experience(title: &str) -> ExperienceLevel {
    let lower = title.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |w: &str| words.contains(&w);

    if has("intern") || has("internship") {
        ExperienceLevel::Intern
    } else if has("principal") || has("distinguished") {
        ExperienceLevel::Principal
    } else if has("staff") {
        ExperienceLevel::Staff
    } else if has("manager") || has("director") || lower.contains("head of") {
        ExperienceLevel::Manager
    } else if has("senior") || has("sr") || has("lead") {
        ExperienceLevel::Senior
    } else if has("junior")
        || has("jr")
        || has("entry")
        || has("associate")
        || lower.contains("new grad")
    {
        ExperienceLevel::Entry
    } else if has("mid") || has("ii") || has("iii") {
        ExperienceLevel::Mid
    } else {
        ExperienceLevel::Unspecified
    }
}
