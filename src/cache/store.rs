use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::credential::{expiry_after, CachedCredential};
use crate::error::{Error, Result};
use crate::helpers::time::{Clock, SystemClock};

/// TTL-bearing key/value store for credentials.
///
/// Invariant: a value is absent once `ttl_seconds` have elapsed since its `set`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedCredential>>;

    async fn set(&self, key: &str, credential: CachedCredential, ttl_seconds: u64) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Entry {
    credential: CachedCredential,
    evict_at: i64,
}

/// In-process store: key -> credential
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        self.inner
            .read()
            .await
            .values()
            .filter(|entry| now < entry.evict_at)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CachedCredential>> {
        let now = self.clock.now();
        let map = self.inner.read().await;
        Ok(map
            .get(key)
            .filter(|entry| now < entry.evict_at)
            .map(|entry| entry.credential.clone()))
    }

    async fn set(&self, key: &str, credential: CachedCredential, ttl_seconds: u64) -> Result<()> {
        let evict_at = expiry_after(self.clock.now(), ttl_seconds)
            .ok_or_else(|| Error::Store(format!("ttl {} for '{}' is out of range", ttl_seconds, key)))?;
        let mut map = self.inner.write().await;
        map.insert(
            key.to_string(),
            Entry {
                credential,
                evict_at,
            },
        );
        Ok(())
    }
}
