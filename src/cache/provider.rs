use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::cache::redis_store::RedisStore;
use crate::cache::store::{CredentialStore, MemoryStore};
use crate::error::Result;

/// Hands out the credential store for a client's `cache_db_number`.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn store_for(&self, db: i64) -> Result<Arc<dyn CredentialStore>>;
}

/// Every database number shares one in-process map; keys carry the prefix.
#[async_trait]
impl StoreProvider for MemoryStore {
    async fn store_for(&self, _db: i64) -> Result<Arc<dyn CredentialStore>> {
        Ok(Arc::new(self.clone()))
    }
}

/// One connection manager per Redis database, opened on first use.
pub struct RedisStoreProvider {
    url: String,
    connections: Mutex<HashMap<i64, RedisStore>>,
}

impl RedisStoreProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connections: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl StoreProvider for RedisStoreProvider {
    async fn store_for(&self, db: i64) -> Result<Arc<dyn CredentialStore>> {
        let mut connections = self.connections.lock().await;
        if let Some(store) = connections.get(&db) {
            return Ok(Arc::new(store.clone()));
        }
        let store = RedisStore::connect(&self.url, db).await?;
        info!(db, "opened redis credential store");
        connections.insert(db, store.clone());
        Ok(Arc::new(store))
    }
}
