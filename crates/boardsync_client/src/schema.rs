//! Mapping between record fields and Notion database properties.

use crate::error::{ClientError, ClientResult};
use boardsync_core::{truncate_chars, Field, FieldValue};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Longest text Notion accepts in one rich-text object.
pub const MAX_RICH_TEXT_LEN: usize = 2000;

/// Notion property type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// The page title.
    Title,
    /// Rich text.
    RichText,
    /// Single select.
    Select,
    /// URL.
    Url,
    /// Date.
    Date,
}

/// One mapped property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    /// Property name in the database.
    pub name: String,
    /// Property type.
    pub kind: PropertyKind,
}

impl PropertySpec {
    /// Creates a property spec.
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Field-to-property mapping of a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    properties: BTreeMap<Field, PropertySpec>,
}

impl PropertySchema {
    /// Builds a schema from explicit specs. Every field must be mapped.
    pub fn new(properties: BTreeMap<Field, PropertySpec>) -> ClientResult<Self> {
        let schema = Self { properties };
        schema.validate()?;
        Ok(schema)
    }

    /// Parses a schema from JSON, e.g.
    /// `{"properties": {"title": {"name": "Job Title", "kind": "title"}, ...}}`.
    ///
    /// Fields missing from the document keep their default mapping.
    pub fn from_json(text: &str) -> ClientResult<Self> {
        #[derive(Deserialize)]
        struct Overrides {
            properties: BTreeMap<Field, PropertySpec>,
        }

        let overrides: Overrides = serde_json::from_str(text)
            .map_err(|err| ClientError::Schema(format!("invalid schema document: {err}")))?;
        let mut schema = Self::default();
        schema.properties.extend(overrides.properties);
        schema.validate()?;
        Ok(schema)
    }

    /// Loads a schema from a JSON file.
    pub fn load(path: &Path) -> ClientResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| ClientError::Schema(format!("cannot read {}: {err}", path.display())))?;
        Self::from_json(&text)
    }

    fn validate(&self) -> ClientResult<()> {
        for field in Field::ALL {
            if !self.properties.contains_key(&field) {
                return Err(ClientError::Schema(format!("no property mapped for {field}")));
            }
        }
        let titles = self
            .properties
            .values()
            .filter(|spec| spec.kind == PropertyKind::Title)
            .count();
        if titles != 1 {
            return Err(ClientError::Schema(format!(
                "exactly one title property required, found {titles}"
            )));
        }
        let mut names: Vec<&str> = self.properties.values().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ClientError::Schema(format!("property {:?} mapped twice", pair[0])));
        }
        Ok(())
    }

    /// Returns the spec for a field.
    pub fn spec(&self, field: Field) -> ClientResult<&PropertySpec> {
        self.properties
            .get(&field)
            .ok_or_else(|| ClientError::Schema(format!("no property mapped for {field}")))
    }

    /// Iterates over every mapped property.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &PropertySpec)> {
        self.properties.iter().map(|(field, spec)| (*field, spec))
    }

    /// Encodes a field value as a Notion property value.
    pub fn encode(&self, field: Field, value: &FieldValue) -> ClientResult<Value> {
        let spec = self.spec(field)?;
        let text = value.as_text().filter(|s| !s.trim().is_empty());
        let encoded = match spec.kind {
            PropertyKind::Title => json!({ "title": rich_text(text.as_deref()) }),
            PropertyKind::RichText => json!({ "rich_text": rich_text(text.as_deref()) }),
            PropertyKind::Select => {
                let name = text.map(|s| s.replace(',', "")).filter(|s| !s.trim().is_empty());
                match name {
                    Some(name) => json!({ "select": { "name": name } }),
                    None => json!({ "select": null }),
                }
            }
            PropertyKind::Url => json!({ "url": text }),
            PropertyKind::Date => match value {
                FieldValue::Date(date) => json!({ "date": { "start": date.format("%Y-%m-%d").to_string() } }),
                _ => match text {
                    Some(raw) => {
                        let date = parse_date(&raw).ok_or_else(|| {
                            ClientError::Encode(format!("{field}: {raw:?} is not a date"))
                        })?;
                        json!({ "date": { "start": date.format("%Y-%m-%d").to_string() } })
                    }
                    None => json!({ "date": null }),
                },
            },
        };
        Ok(encoded)
    }

    /// Decodes a field from a page's `properties` object.
    ///
    /// Missing properties and empty values decode to `None`.
    pub fn decode(&self, field: Field, properties: &Value) -> Option<FieldValue> {
        let spec = self.properties.get(&field)?;
        let property = properties.get(&spec.name)?;
        let value = match spec.kind {
            PropertyKind::Title => FieldValue::text(plain_text(property.get("title")?)),
            PropertyKind::RichText => FieldValue::text(plain_text(property.get("rich_text")?)),
            PropertyKind::Select => {
                FieldValue::select(property.get("select")?.get("name")?.as_str()?)
            }
            PropertyKind::Url => FieldValue::Url(property.get("url")?.as_str()?.to_string()),
            PropertyKind::Date => {
                let start = property.get("date")?.get("start")?.as_str()?;
                FieldValue::Date(parse_date(start)?)
            }
        };
        (!value.is_blank()).then_some(value)
    }
}

impl Default for PropertySchema {
    fn default() -> Self {
        let properties = [
            (Field::Title, "Job Title", PropertyKind::Title),
            (Field::Key, "REQ ID", PropertyKind::RichText),
            (Field::Department, "Department", PropertyKind::Select),
            (Field::Location, "Location", PropertyKind::Select),
            (Field::Experience, "Experience", PropertyKind::RichText),
            (Field::ApplyUrl, "Apply URL", PropertyKind::Url),
            (Field::Summary, "Summary", PropertyKind::RichText),
            (Field::Status, "Status", PropertyKind::Select),
            (Field::AddedOn, "Added On", PropertyKind::Date),
            (Field::SourceUpdatedAt, "Source Updated", PropertyKind::RichText),
            (Field::StaleMarker, "Notes", PropertyKind::RichText),
        ]
        .into_iter()
        .map(|(field, name, kind)| (field, PropertySpec::new(name, kind)))
        .collect();
        Self { properties }
    }
}

/// Builds a rich-text array holding at most one capped text object.
pub(crate) fn rich_text(text: Option<&str>) -> Value {
    match text {
        Some(content) if !content.is_empty() => json!([
            { "type": "text", "text": { "content": truncate_chars(content, MAX_RICH_TEXT_LEN) } }
        ]),
        _ => json!([]),
    }
}

/// Concatenates the text of a rich-text array.
fn plain_text(array: &Value) -> String {
    array
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.get("plain_text")
                        .or_else(|| item.get("text").and_then(|t| t.get("content")))
                        .and_then(Value::as_str)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
