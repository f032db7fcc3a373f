//! Plain-text extraction from posting HTML.

use boardsync_core::{ContentSections, Section};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});")
        .expect("ENTITY_RE is a valid regex pattern")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("TAG_RE is a valid regex pattern"));

static SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("SPACE_RE is a valid regex pattern"));

static BOUNDARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)what you|required|requirements|preferred|nice to have|about")
        .expect("BOUNDARY_RE is a valid regex pattern")
});

static YEARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\+?\s*years?").expect("YEARS_RE is a valid regex pattern")
});

/// Heading keywords per section, tried in order.
const SECTION_KEYWORDS: &[(Section, &[&str])] = &[
    (Section::About, &["about the job", "about the team"]),
    (
        Section::Responsibilities,
        &["what you'll do", "what you’ll do", "what you will do"],
    ),
    (
        Section::RequiredQualifications,
        &["required qualifications", "requirements"],
    ),
    (
        Section::PreferredQualifications,
        &["preferred qualifications", "nice to have"],
    ),
];

static SECTION_RES: LazyLock<Vec<(Section, Vec<Regex>)>> = LazyLock::new(|| {
    SECTION_KEYWORDS
        .iter()
        .map(|(section, keywords)| {
            let patterns = keywords
                .iter()
                .map(|keyword| {
                    Regex::new(&format!(r"(?i){}[:\s]*", regex::escape(keyword)))
                        .expect("section keyword patterns are valid")
                })
                .collect();
            (*section, patterns)
        })
        .collect()
});

fn decode_entity(caps: &Captures<'_>) -> String {
    let name = &caps[1];
    let decoded = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "ndash" => Some('–'),
        "mdash" => Some('—'),
        "rsquo" | "lsquo" => Some('\''),
        "rdquo" | "ldquo" => Some('"'),
        "hellip" => Some('…'),
        "bull" | "middot" => Some('·'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()
            } else {
                None
            };
            code.and_then(char::from_u32)
        }
    };
    match decoded {
        Some(c) => c.to_string(),
        None => caps[0].to_string(),
    }
}

/// Decodes HTML character references in one pass. Unknown references are
/// kept as-is.
pub fn unescape_entities(text: &str) -> String {
    ENTITY_RE.replace_all(text, decode_entity).into_owned()
}

/// Converts posting HTML to plain text.
///
/// Board APIs return the body HTML-escaped, so references are decoded before
/// and after stripping tags. Whitespace runs collapse to single spaces.
pub fn html_to_text(html: &str) -> String {
    let markup = unescape_entities(html);
    let stripped = TAG_RE.replace_all(&markup, " ");
    let text = unescape_entities(&stripped);
    SPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Returns the text following the first heading keyword found, up to the
/// next heading keyword.
fn extract_section(text: &str, patterns: &[Regex]) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        let start = pattern.find(text)?.end();
        let rest = &text[start..];
        let end = BOUNDARY_RE.find(rest).map_or(rest.len(), |m| m.start());
        let section = rest[..end].trim();
        (!section.is_empty()).then(|| section.to_string())
    })
}

/// Cuts plain text into named sections by heading keywords.
pub fn extract_sections(text: &str) -> ContentSections {
    SECTION_RES
        .iter()
        .filter_map(|(section, patterns)| {
            extract_section(text, patterns).map(|body| (*section, body))
        })
        .collect()
}

/// Returns the first "N years" / "N+ years" figure in the text.
pub fn extract_years(text: &str) -> Option<u32> {
    YEARS_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESCAPED: &str = "&lt;h3&gt;About the Job&lt;/h3&gt;&lt;p&gt;Build autonomous systems \
        in Taipei &amp;amp; beyond.&lt;/p&gt;&lt;h3&gt;What You'll Do&lt;/h3&gt;&lt;ul&gt;\
        &lt;li&gt;Design test fixtures&lt;/li&gt;&lt;li&gt;Debug boards&lt;/li&gt;&lt;/ul&gt;\
        &lt;h3&gt;Required Qualifications&lt;/h3&gt;&lt;p&gt;5+ years of EE experience&lt;/p&gt;\
        &lt;h3&gt;Preferred Qualifications&lt;/h3&gt;&lt;p&gt;Mandarin&amp;nbsp;fluency&lt;/p&gt;";

    #[test]
    fn unescapes_named_and_numeric_references() {
        assert_eq!(unescape_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(unescape_entities("&#39;x&#x27;"), "'x'");
        assert_eq!(unescape_entities("&amp;lt;"), "&lt;");
        assert_eq!(unescape_entities("&bogus; & alone"), "&bogus; & alone");
    }

    #[test]
    fn html_becomes_collapsed_text() {
        let text = html_to_text(ESCAPED);
        assert!(text.starts_with("About the Job Build autonomous systems in Taipei & beyond."));
        assert!(!text.contains('<'));
        assert!(!text.contains("  "));
        assert!(text.contains("Mandarin fluency"));
    }

    #[test]
    fn sections_run_until_next_heading() {
        let sections = extract_sections(&html_to_text(ESCAPED));
        assert_eq!(
            sections.get(&Section::About).map(String::as_str),
            Some("Build autonomous systems in Taipei & beyond.")
        );
        assert_eq!(
            sections.get(&Section::Responsibilities).map(String::as_str),
            Some("Design test fixtures Debug boards")
        );
        assert_eq!(
            sections.get(&Section::RequiredQualifications).map(String::as_str),
            Some("5+ years of EE experience")
        );
        assert_eq!(
            sections.get(&Section::PreferredQualifications).map(String::as_str),
            Some("Mandarin fluency")
        );
    }

    #[test]
    fn missing_headings_yield_no_sections() {
        assert!(extract_sections("Just a short blurb.").is_empty());
        assert!(extract_sections("").is_empty());
    }

    #[test]
    fn alternative_headings() {
        let sections = extract_sections("About the team: Radar folks. Requirements: BSEE. Nice to have: Rust");
        assert_eq!(sections.get(&Section::About).map(String::as_str), Some("Radar folks."));
        assert_eq!(
            sections.get(&Section::RequiredQualifications).map(String::as_str),
            Some("BSEE.")
        );
        assert_eq!(
            sections.get(&Section::PreferredQualifications).map(String::as_str),
            Some("Rust")
        );
    }

    #[test]
    fn years_of_experience() {
        assert_eq!(extract_years("Minimum 3 years in firmware"), Some(3));
        assert_eq!(extract_years("10+ Years of leadership"), Some(10));
        assert_eq!(extract_years("8 year old codebase, 2+ years"), Some(8));
        assert_eq!(extract_years("Experience with FPGAs"), None);
    }
}
