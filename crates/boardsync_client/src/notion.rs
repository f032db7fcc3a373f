//! Notion database as a destination store.

use crate::config::{ApiToken, ClientConfig};
use crate::error::{ClientError, ClientResult};
use crate::resilient::{RequestKind, ResilientClient};
use crate::schema::{rich_text, PropertySchema};
use crate::store::DestinationStore;
use crate::transport::{Method, Request, Transport};
use boardsync_core::{ContentBlock, DestinationRecord, Field, FieldMap, FieldValue};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

/// Default API root.
pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";

/// API version sent with every request.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Page size for paginated endpoints.
const PAGE_SIZE: usize = 100;

/// Connection settings for a Notion database.
#[derive(Debug, Clone)]
pub struct NotionConfig {
    /// Integration token.
    pub token: ApiToken,
    /// Target database.
    pub database_id: String,
    /// API root.
    pub api_base: String,
    /// Field-to-property mapping.
    pub schema: PropertySchema,
}

impl NotionConfig {
    /// Creates a configuration with the default API root and schema.
    pub fn new(token: ApiToken, database_id: impl Into<String>) -> Self {
        Self {
            token,
            database_id: database_id.into(),
            api_base: NOTION_API_BASE.to_string(),
            schema: PropertySchema::default(),
        }
    }

    /// Sets the API root.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the property schema.
    pub fn with_schema(mut self, schema: PropertySchema) -> Self {
        self.schema = schema;
        self
    }
}

/// Result of a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Name of the integration bot.
    pub bot_name: Option<String>,
    /// Title of the database.
    pub database_title: Option<String>,
    /// Mapped property names the database does not have.
    pub missing_properties: Vec<String>,
}

impl CheckReport {
    /// Returns true if every mapped property exists.
    pub fn is_complete(&self) -> bool {
        self.missing_properties.is_empty()
    }
}

/// A [`DestinationStore`] backed by a Notion database.
pub struct NotionStore<T: Transport> {
    client: ResilientClient<T>,
    config: NotionConfig,
}

impl<T: Transport> NotionStore<T> {
    /// Creates a store over a transport.
    pub fn new(transport: T, client_config: ClientConfig, config: NotionConfig) -> Self {
        let client = ResilientClient::new(transport, client_config)
            .with_default_header("Notion-Version", NOTION_VERSION)
            .with_default_header("Content-Type", "application/json");
        Self { client, config }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &ResilientClient<T> {
        &self.client
    }

    /// Returns the property schema.
    pub fn schema(&self) -> &PropertySchema {
        &self.config.schema
    }

    fn request(&self, method: Method, path: &str) -> Request {
        Request::new(method, format!("{}{}", self.config.api_base, path)).with_header(
            "Authorization",
            format!("Bearer {}", self.config.token.expose()),
        )
    }

    fn call(&self, method: Method, path: &str, body: Option<Value>, kind: RequestKind) -> ClientResult<Value> {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.with_json(&body)?;
        }
        self.client.execute(&request, kind)
    }

    /// Verifies the token and database access, and reports mapped
    /// properties the database lacks.
    pub fn check(&self) -> ClientResult<CheckReport> {
        let me = self.call(Method::Get, "/users/me", None, RequestKind::Read)?;
        let database = self.call(
            Method::Get,
            &format!("/databases/{}", self.config.database_id),
            None,
            RequestKind::Read,
        )?;

        let database_title = database
            .get("title")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|item| item.get("plain_text"))
            .and_then(Value::as_str)
            .map(String::from);
        let existing = database.get("properties").and_then(Value::as_object);
        let missing_properties = self
            .config
            .schema
            .iter()
            .map(|(_, spec)| spec.name.clone())
            .filter(|name| !existing.is_some_and(|props| props.contains_key(name)))
            .collect();

        Ok(CheckReport {
            bot_name: me.get("name").and_then(Value::as_str).map(String::from),
            database_title,
            missing_properties,
        })
    }

    fn encode_properties(&self, fields: &FieldMap) -> ClientResult<Value> {
        let mut properties = Map::new();
        for (field, value) in fields {
            let name = self.config.schema.spec(*field)?.name.clone();
            properties.insert(name, self.config.schema.encode(*field, value)?);
        }
        Ok(Value::Object(properties))
    }

    fn decode_page(&self, page: &Value) -> ClientResult<DestinationRecord> {
        let id = page
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::protocol(None, "page without id"))?;
        let empty = Value::Object(Map::new());
        let properties = page.get("properties").unwrap_or(&empty);

        let key = self
            .config
            .schema
            .decode(Field::Key, properties)
            .and_then(|value| value.as_text())
            .unwrap_or_default();
        let mut record = DestinationRecord::new(id, key.trim());
        for field in Field::ALL {
            match (field, self.config.schema.decode(field, properties)) {
                (_, None) => {}
                (Field::StaleMarker, Some(value)) => record.stale_marker = value.as_text(),
                (_, Some(value)) => {
                    record.fields.insert(field, value);
                }
            }
        }
        Ok(record)
    }

    fn list_children(&self, block_id: &str) -> ClientResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut path = format!("/blocks/{block_id}/children?page_size={PAGE_SIZE}");
            if let Some(cursor) = &cursor {
                path.push_str("&start_cursor=");
                path.push_str(cursor);
            }
            let page = self.call(Method::Get, &path, None, RequestKind::Read)?;
            ids.extend(
                results(&page)?
                    .iter()
                    .filter_map(|block| block.get("id").and_then(Value::as_str))
                    .map(String::from),
            );
            match next_cursor(&page)? {
                Some(next) => cursor = Some(next),
                None => return Ok(ids),
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for NotionStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionStore")
            .field("database_id", &self.config.database_id)
            .field("api_base", &self.config.api_base)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> DestinationStore for NotionStore<T> {
    fn query_all(&self) -> ClientResult<Vec<DestinationRecord>> {
        let path = format!("/databases/{}/query", self.config.database_id);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }
            let page = self.call(Method::Post, &path, Some(body), RequestKind::Read)?;
            for item in results(&page)? {
                records.push(self.decode_page(item)?);
            }
            match next_cursor(&page)? {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(records = records.len(), "queried destination database");
        Ok(records)
    }

    fn create(&self, fields: &FieldMap, content: &[ContentBlock]) -> ClientResult<DestinationRecord> {
        let body = json!({
            "parent": { "database_id": self.config.database_id },
            "properties": self.encode_properties(fields)?,
            "children": encode_blocks(content),
        });
        let page = self.call(Method::Post, "/pages", Some(body), RequestKind::Write)?;
        let id = page
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::protocol(None, "created page has no id"))?;

        let key = fields
            .get(&Field::Key)
            .and_then(FieldValue::as_text)
            .unwrap_or_default();
        let mut record = DestinationRecord::new(id, key);
        record.apply_patch(fields);
        debug!(page_id = id, "created page");
        Ok(record)
    }

    fn update_fields(&self, id: &str, fields: &FieldMap) -> ClientResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let body = json!({ "properties": self.encode_properties(fields)? });
        self.call(Method::Patch, &format!("/pages/{id}"), Some(body), RequestKind::Write)?;
        debug!(page_id = id, fields = fields.len(), "updated page properties");
        Ok(())
    }

    fn replace_content(&self, id: &str, content: &[ContentBlock]) -> ClientResult<()> {
        let existing = self.list_children(id)?;
        for block_id in &existing {
            self.call(Method::Delete, &format!("/blocks/{block_id}"), None, RequestKind::Write)?;
        }
        let blocks = encode_blocks(content);
        for chunk in blocks.chunks(PAGE_SIZE) {
            self.call(
                Method::Patch,
                &format!("/blocks/{id}/children"),
                Some(json!({ "children": chunk })),
                RequestKind::Write,
            )?;
        }
        debug!(page_id = id, removed = existing.len(), added = blocks.len(), "replaced page body");
        Ok(())
    }
}

fn results(page: &Value) -> ClientResult<&Vec<Value>> {
    page.get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::protocol(None, "list response without results"))
}

fn next_cursor(page: &Value) -> ClientResult<Option<String>> {
    if !page.get("has_more").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(None);
    }
    page.get("next_cursor")
        .and_then(Value::as_str)
        .map(|cursor| Some(cursor.to_string()))
        .ok_or_else(|| ClientError::protocol(None, "has_more without next_cursor"))
}

/// Encodes body blocks as Notion block objects.
pub fn encode_blocks(content: &[ContentBlock]) -> Vec<Value> {
    content
        .iter()
        .map(|block| match block {
            ContentBlock::Heading(text) => json!({
                "object": "block",
                "type": "heading_2",
                "heading_2": { "rich_text": rich_text(Some(text.as_str())) },
            }),
            ContentBlock::Paragraph(text) => json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": rich_text(Some(text.as_str())) },
            }),
            ContentBlock::Divider => json!({
                "object": "block",
                "type": "divider",
                "divider": {},
            }),
            ContentBlock::Footnote(text) => json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": rich_text(Some(text.as_str())), "color": "gray" },
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::transport::{MockTransport, Response};
    use std::time::Duration;

    fn store(transport: MockTransport) -> NotionStore<MockTransport> {
        let retry = RetryConfig::new(2).with_unit(Duration::from_millis(1)).with_jitter(0.0);
        let client_config = ClientConfig::new().with_read_retry(retry.clone()).with_write_retry(retry);
        let config = NotionConfig::new(ApiToken::new("secret_token"), "db-1")
            .with_api_base("https://notion.test/v1/");
        NotionStore::new(transport, client_config, config)
    }

    fn page(id: &str, key: &str, title: &str) -> Value {
        json!({
            "object": "page",
            "id": id,
            "properties": {
                "Job Title": { "title": [{ "plain_text": title }] },
                "REQ ID": { "rich_text": [{ "plain_text": key }] },
                "Notes": { "rich_text": [] }
            }
        })
    }

    #[test]
    fn query_follows_cursors() {
        let transport = MockTransport::new();
        transport
            .push_json(json!({ "results": [page("p1", "J1", "A")], "has_more": true, "next_cursor": "c2" }))
            .push_json(json!({ "results": [page("p2", "J2", "B")], "has_more": false, "next_cursor": null }));
        let store = store(transport);

        let records = store.query_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].key, "J2");
        assert_eq!(records[0].field(Field::Title), Some(&FieldValue::text("A")));
        assert!(!records[0].is_stale());

        let requests = store.client().transport().requests();
        assert_eq!(requests[0].url, "https://notion.test/v1/databases/db-1/query");
        let second: Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(second["start_cursor"], "c2");
        assert_eq!(second["page_size"], 100);
        assert_eq!(requests[0].header("Authorization"), Some("Bearer secret_token"));
        assert_eq!(requests[0].header("Notion-Version"), Some(NOTION_VERSION));
    }

    #[test]
    fn query_reads_stale_marker() {
        let transport = MockTransport::new();
        let mut stale = page("p1", "J1", "A");
        stale["properties"]["Notes"] = json!({ "rich_text": [{ "plain_text": "closed (2024-01-01)" }] });
        transport.push_json(json!({ "results": [stale], "has_more": false }));

        let records = store(transport).query_all().unwrap();
        assert_eq!(records[0].stale_marker.as_deref(), Some("closed (2024-01-01)"));
        assert!(!records[0].fields.contains_key(&Field::StaleMarker));
    }

    #[test]
    fn has_more_without_cursor_is_protocol_error() {
        let transport = MockTransport::new();
        transport.set_fallback(Ok(Response::json(&json!({ "results": [], "has_more": true }))));
        let err = store(transport).query_all().unwrap_err();
        assert!(matches!(err, ClientError::Protocol { .. }));
    }

    #[test]
    fn create_posts_properties_and_children() {
        let transport = MockTransport::new();
        transport.push_json(json!({ "object": "page", "id": "new-page" }));
        let store = store(transport);

        let mut fields = FieldMap::new();
        fields.insert(Field::Title, FieldValue::text("Test Engineer"));
        fields.insert(Field::Key, FieldValue::text("J9"));
        let record = store
            .create(&fields, &[ContentBlock::Divider, ContentBlock::Footnote("Last synced".into())])
            .unwrap();
        assert_eq!(record.id, "new-page");
        assert_eq!(record.key, "J9");

        let sent = &store.client().transport().requests()[0];
        assert_eq!(sent.method, Method::Post);
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["parent"]["database_id"], "db-1");
        assert_eq!(body["properties"]["REQ ID"]["rich_text"][0]["text"]["content"], "J9");
        assert_eq!(body["children"][0]["type"], "divider");
        assert_eq!(body["children"][1]["paragraph"]["color"], "gray");
    }

    #[test]
    fn update_patches_only_given_fields() {
        let transport = MockTransport::new();
        transport.push_json(json!({ "object": "page", "id": "p1" }));
        let store = store(transport);

        let mut fields = FieldMap::new();
        fields.insert(Field::StaleMarker, FieldValue::text("closed (2024-06-01)"));
        store.update_fields("p1", &fields).unwrap();

        let sent = &store.client().transport().requests()[0];
        assert_eq!(sent.method, Method::Patch);
        assert_eq!(sent.url, "https://notion.test/v1/pages/p1");
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        let properties = body["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 1);
        assert!(properties.contains_key("Notes"));

        store.update_fields("p1", &FieldMap::new()).unwrap();
        assert_eq!(store.client().transport().request_count(), 1);
    }

    #[test]
    fn replace_content_deletes_then_appends() {
        let transport = MockTransport::new();
        transport
            .push_json(json!({ "results": [{ "id": "b1" }], "has_more": true, "next_cursor": "n" }))
            .push_json(json!({ "results": [{ "id": "b2" }], "has_more": false }))
            .push_json(json!({}))
            .push_json(json!({}))
            .push_json(json!({ "results": [] }));
        let store = store(transport);

        store
            .replace_content("p1", &[ContentBlock::Heading("About the Job".into())])
            .unwrap();

        let requests = store.client().transport().requests();
        let calls: Vec<_> = requests.iter().map(|r| (r.method, r.url.as_str())).collect();
        assert_eq!(
            calls,
            vec![
                (Method::Get, "https://notion.test/v1/blocks/p1/children?page_size=100"),
                (Method::Get, "https://notion.test/v1/blocks/p1/children?page_size=100&start_cursor=n"),
                (Method::Delete, "https://notion.test/v1/blocks/b1"),
                (Method::Delete, "https://notion.test/v1/blocks/b2"),
                (Method::Patch, "https://notion.test/v1/blocks/p1/children"),
            ]
        );
    }

    #[test]
    fn validation_error_surfaces_without_retry() {
        let transport = MockTransport::new();
        transport.push(Ok(Response::new(
            400,
            json!({ "object": "error", "status": 400, "code": "validation_error", "message": "Location is not a property" }).to_string(),
        )));
        let store = store(transport);

        let mut fields = FieldMap::new();
        fields.insert(Field::Title, FieldValue::text("x"));
        let err = store.update_fields("p1", &fields).unwrap_err();
        assert_eq!(err.remote_code(), Some("validation_error"));
        assert_eq!(store.client().transport().request_count(), 1);
    }

    #[test]
    fn check_reports_missing_properties() {
        let transport = MockTransport::new();
        transport
            .push_json(json!({ "object": "user", "name": "Job Sync Bot" }))
            .push_json(json!({
                "object": "database",
                "title": [{ "plain_text": "Jobs" }],
                "properties": { "Job Title": {}, "REQ ID": {}, "Location": {} }
            }));
        let report = store(transport).check().unwrap();
        assert_eq!(report.bot_name.as_deref(), Some("Job Sync Bot"));
        assert_eq!(report.database_title.as_deref(), Some("Jobs"));
        assert!(!report.is_complete());
        assert!(report.missing_properties.contains(&"Notes".to_string()));
        assert!(!report.missing_properties.contains(&"REQ ID".to_string()));
    }

    #[test]
    fn debug_hides_token() {
        let store = store(MockTransport::new());
        assert!(!format!("{store:?}").contains("secret_token"));
    }
}
