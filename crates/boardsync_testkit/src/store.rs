//! In-memory destination store with failure injection.

use boardsync_client::{ClientError, ClientResult, DestinationStore, TransportErrorKind};
use boardsync_core::{ContentBlock, DestinationRecord, Field, FieldMap, FieldValue};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// A write observed by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    /// A record was created.
    Create {
        /// Assigned id.
        id: String,
        /// Record key.
        key: String,
    },
    /// Fields were updated.
    Update {
        /// Record id.
        id: String,
        /// Fields written.
        fields: Vec<Field>,
    },
    /// The body was replaced.
    ReplaceContent {
        /// Record id.
        id: String,
    },
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<DestinationRecord>,
    content: HashMap<String, Vec<ContentBlock>>,
    writes: Vec<StoreWrite>,
    failing_keys: HashSet<String>,
    query_error: Option<ClientError>,
    next_id: u64,
}

impl Inner {
    fn key_of(&self, id: &str) -> Option<String> {
        self.records.iter().find(|r| r.id == id).map(|r| r.key.clone())
    }

    fn injected(&self, key: &str) -> ClientResult<()> {
        if self.failing_keys.contains(key) {
            return Err(ClientError::Exhausted {
                attempts: 3,
                last: Box::new(ClientError::Transport {
                    kind: TransportErrorKind::Connect,
                    message: format!("injected failure for {key}"),
                }),
            });
        }
        Ok(())
    }
}

/// A destination store backed by a vector.
///
/// Field writes follow the same partial-update semantics as a real store:
/// fields absent from a patch are left alone.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given records.
    pub fn with_records(records: impl IntoIterator<Item = DestinationRecord>) -> Self {
        let store = Self::new();
        store.inner.lock().records.extend(records);
        store
    }

    /// Makes every write touching `key` fail.
    pub fn fail_key(&self, key: impl Into<String>) {
        self.inner.lock().failing_keys.insert(key.into());
    }

    /// Makes `query_all` fail with the given error.
    pub fn fail_query(&self, error: ClientError) {
        self.inner.lock().query_error = Some(error);
    }

    /// Returns every stored record.
    pub fn records(&self) -> Vec<DestinationRecord> {
        self.inner.lock().records.clone()
    }

    /// Returns the record with the given key.
    pub fn record(&self, key: &str) -> Option<DestinationRecord> {
        self.inner.lock().records.iter().find(|r| r.key == key).cloned()
    }

    /// Returns the body of the record with the given id.
    pub fn content(&self, id: &str) -> Option<Vec<ContentBlock>> {
        self.inner.lock().content.get(id).cloned()
    }

    /// Returns every write in order.
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.inner.lock().writes.clone()
    }

    /// Number of writes performed.
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes.len()
    }

    /// Forgets recorded writes.
    pub fn clear_writes(&self) {
        self.inner.lock().writes.clear();
    }
}

impl DestinationStore for MemoryStore {
    fn query_all(&self) -> ClientResult<Vec<DestinationRecord>> {
        let inner = self.inner.lock();
        if let Some(error) = &inner.query_error {
            return Err(error.clone());
        }
        Ok(inner.records.clone())
    }

    fn create(&self, fields: &FieldMap, content: &[ContentBlock]) -> ClientResult<DestinationRecord> {
        let mut inner = self.inner.lock();
        let key = fields
            .get(&Field::Key)
            .and_then(FieldValue::as_text)
            .unwrap_or_default();
        inner.injected(&key)?;

        inner.next_id += 1;
        let id = format!("mem-{}", inner.next_id);
        let mut record = DestinationRecord::new(id.clone(), key.clone());
        record.apply_patch(fields);
        inner.records.push(record.clone());
        inner.content.insert(id.clone(), content.to_vec());
        inner.writes.push(StoreWrite::Create { id, key });
        Ok(record)
    }

    fn update_fields(&self, id: &str, fields: &FieldMap) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        let key = inner.key_of(id).ok_or_else(|| ClientError::Remote {
            status: 404,
            code: Some("object_not_found".into()),
            message: format!("no record {id}"),
            retry_after: None,
        })?;
        inner.injected(&key)?;

        if let Some(record) = inner.records.iter_mut().find(|r| r.id == id) {
            record.apply_patch(fields);
        }
        inner.writes.push(StoreWrite::Update {
            id: id.to_string(),
            fields: fields.keys().copied().collect(),
        });
        Ok(())
    }

    fn replace_content(&self, id: &str, content: &[ContentBlock]) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        let key = inner.key_of(id).unwrap_or_default();
        inner.injected(&key)?;
        inner.content.insert(id.to_string(), content.to_vec());
        inner.writes.push(StoreWrite::ReplaceContent { id: id.to_string() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(key: &str, title: &str) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(Field::Key, FieldValue::text(key));
        fields.insert(Field::Title, FieldValue::text(title));
        fields
    }

    #[test]
    fn create_then_update() {
        let store = MemoryStore::new();
        let created = store.create(&fields("J1", "Engineer"), &[]).unwrap();
        assert_eq!(created.key, "J1");

        let mut patch = FieldMap::new();
        patch.insert(Field::Title, FieldValue::text("Senior Engineer"));
        store.update_fields(&created.id, &patch).unwrap();

        let record = store.record("J1").unwrap();
        assert_eq!(record.field(Field::Title), Some(&FieldValue::text("Senior Engineer")));
        assert_eq!(record.field(Field::Key), Some(&FieldValue::text("J1")));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn injected_failures() {
        let store = MemoryStore::new();
        store.fail_key("J2");
        let err = store.create(&fields("J2", "x"), &[]).unwrap_err();
        assert!(matches!(err, ClientError::Exhausted { attempts: 3, .. }));
        assert!(store.records().is_empty());

        store.fail_query(ClientError::timeout("slow"));
        assert!(store.query_all().unwrap_err().is_timeout());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update_fields("missing", &FieldMap::new()).unwrap_err();
        assert_eq!(err.remote_code(), Some("object_not_found"));
    }
}
