//! Key-value persistence for workspace metadata

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored value with its last write time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbRecord<V> {
    pub key: String,
    pub value: V,
    pub last_modified: DateTime<Utc>,
}

#[async_trait]
pub trait KeyValueStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>>;

    async fn put(&self, key: &str, value: V) -> Result<()>;

    async fn get_all(&self) -> Result<Vec<DbRecord<V>>>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Process-local `KeyValueStore`
#[derive(Debug)]
pub struct MemoryKeyValueStore<V> {
    records: RwLock<BTreeMap<String, DbRecord<V>>>,
}

impl<V> MemoryKeyValueStore<V> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl<V> Default for MemoryKeyValueStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> KeyValueStore<V> for MemoryKeyValueStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(self.records.read().get(key).map(|r| r.value.clone()))
    }

    async fn put(&self, key: &str, value: V) -> Result<()> {
        self.records.write().insert(
            key.to_string(),
            DbRecord {
                key: key.to_string(),
                value,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    /// Records in key order
    async fn get_all(&self) -> Result<Vec<DbRecord<V>>> {
        Ok(self.records.read().values().cloned().collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.records.write().remove(key);
        Ok(())
    }
}
