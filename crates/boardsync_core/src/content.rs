//! Page body rendering.

use crate::record::{Section, SourceRecord};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One block of a rendered page body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Section heading.
    Heading(String),
    /// Body text.
    Paragraph(String),
    /// Horizontal rule.
    Divider,
    /// Small trailing note.
    Footnote(String),
}

/// Renders the body of a record.
///
/// Each present section becomes a heading and a paragraph, in fixed order,
/// followed by a divider and the sync footer. A record without sections
/// renders only the footer.
pub fn render_content(record: &SourceRecord, synced_at: NaiveDateTime) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    for section in Section::ALL {
        if let Some(text) = record.section(section) {
            blocks.push(ContentBlock::Heading(section.heading().to_string()));
            blocks.push(ContentBlock::Paragraph(text.to_string()));
        }
    }
    blocks.push(ContentBlock::Divider);
    blocks.push(ContentBlock::Footnote(format!(
        "Last synced: {}",
        synced_at.format("%Y-%m-%d %H:%M")
    )));
    blocks
}
