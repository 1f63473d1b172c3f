//! Storage binding
//!
//! The core never talks to a database directly; it calls out to an
//! externally supplied persistence object implementing this trait. The
//! crate ships an in-memory implementation for tests in
//! [`crate::testing_utils`].

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Per-entity-type persistence operations.
#[async_trait]
pub trait EntityStorage: Send + Sync {
    /// Persist a new record and return its assigned identity.
    async fn create(&self, collection: &str, record: Value) -> Result<String, StorageError>;

    async fn find_by_id(&self, collection: &str, id: &str)
        -> Result<Option<Value>, StorageError>;

    /// Fetch up to `limit` records, optionally sorted by a field name.
    async fn find_many(
        &self,
        collection: &str,
        limit: usize,
        sort: Option<&str>,
    ) -> Result<Vec<Value>, StorageError>;

    /// Remove a record, returning whether anything was deleted.
    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StorageError>;
}
