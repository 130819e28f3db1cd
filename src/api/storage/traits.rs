//! Storage trait definitions for the key-value backends.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::StorageError;

/// Key to JSON record store backing flows and run sessions.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the record stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Insert or replace the record stored under `key`
    async fn put(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Remove a record, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// List keys starting with `prefix`, sorted
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Read and decode a record.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode and write a record.
pub async fn put_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    store.put(key, serde_json::to_value(value)?).await
}
