//! Shared test doubles
//!
//! In-memory storage implementation used by the crate's own tests and by
//! downstream consumers that want to exercise the mutation path without a
//! real database.

use crate::storage::{EntityStorage, StorageError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// HashMap-backed [`EntityStorage`] with uuid-assigned identities and a
/// fail-injection switch for exercising rollback paths.
#[derive(Default)]
pub struct MemoryStorage {
    collections: Mutex<HashMap<String, HashMap<String, Value>>>,
    fail_creates_in: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create` into the named collection fail with
    /// a backend error until cleared.
    pub fn fail_creates_in(&self, collection: &str) {
        if let Ok(mut fail) = self.fail_creates_in.lock() {
            *fail = Some(collection.to_string());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut fail) = self.fail_creates_in.lock() {
            *fail = None;
        }
    }

    /// Number of records currently held in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .ok()
            .and_then(|c| c.get(collection).map(|records| records.len()))
            .unwrap_or(0)
    }

    fn lock_collections(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, HashMap<String, Value>>>, StorageError>
    {
        self.collections
            .lock()
            .map_err(|_| StorageError::Backend("storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl EntityStorage for MemoryStorage {
    async fn create(&self, collection: &str, record: Value) -> Result<String, StorageError> {
        let failing = self
            .fail_creates_in
            .lock()
            .map_err(|_| StorageError::Backend("storage lock poisoned".to_string()))?
            .as_deref()
            == Some(collection);
        if failing {
            return Err(StorageError::Backend(format!(
                "simulated create failure in '{}'",
                collection
            )));
        }

        let mut record = match record {
            Value::Object(map) => map,
            _ => {
                return Err(StorageError::InvalidRecord(
                    "record must be a JSON object".to_string(),
                ))
            }
        };
        let id = Uuid::new_v4().to_string();
        record.insert("id".to_string(), Value::String(id.clone()));

        let mut collections = self.lock_collections()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), Value::Object(record));
        Ok(id)
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, StorageError> {
        let collections = self.lock_collections()?;
        Ok(collections
            .get(collection)
            .and_then(|records| records.get(id))
            .cloned())
    }

    async fn find_many(
        &self,
        collection: &str,
        limit: usize,
        sort: Option<&str>,
    ) -> Result<Vec<Value>, StorageError> {
        let collections = self.lock_collections()?;
        let mut records: Vec<Value> = collections
            .get(collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();

        let sort_key = sort.unwrap_or("id");
        records.sort_by(|a, b| {
            let key = |v: &Value| {
                v.get(sort_key)
                    .and_then(|s| s.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            key(a).cmp(&key(b))
        });
        records.truncate(limit);
        Ok(records)
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StorageError> {
        let mut collections = self.lock_collections()?;
        Ok(collections
            .get_mut(collection)
            .and_then(|records| records.remove(id))
            .is_some())
    }
}
