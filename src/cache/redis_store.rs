//! Redis-backed credential store.
//!
//! Credentials are stored as JSON `{value, expires_at}` with `SET key json EX ttl`,
//! so Redis expiry and the local `expires_at` check agree.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, IntoConnectionInfo};
use tracing::{debug, warn};

use crate::cache::credential::CachedCredential;
use crate::cache::store::CredentialStore;
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
}

impl RedisStore {
    /// Connect to `redis_url`, selecting database `db`.
    pub async fn connect(redis_url: &str, db: i64) -> Result<Self> {
        let mut info = redis_url.into_connection_info()?;
        info.redis.db = db;
        let client = redis::Client::open(info)?;
        let redis = ConnectionManager::new(client).await?;
        debug!(db, "redis credential store connected");
        Ok(Self { redis })
    }

    pub fn with_connection(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl CredentialStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CachedCredential>> {
        let mut redis = self.redis.clone();
        let raw: Option<String> = redis.get(key).await?;
        Ok(raw.and_then(|raw| decode_credential(key, &raw)))
    }

    async fn set(&self, key: &str, credential: CachedCredential, ttl_seconds: u64) -> Result<()> {
        let json = serde_json::to_string(&credential).map_err(|e| Error::Store(e.to_string()))?;
        let mut redis = self.redis.clone();
        let _: () = redis.set_ex(key, json, ttl_seconds).await?;
        Ok(())
    }
}

/// Parse a stored value. Anything that is not our JSON layout (for example a
/// bare token written by another client under the same key) reads as absent,
/// so the next refresh overwrites it.
pub fn decode_credential(key: &str, raw: &str) -> Option<CachedCredential> {
    match serde_json::from_str(raw) {
        Ok(credential) => Some(credential),
        Err(e) => {
            warn!(key, "ignoring undecodable credential: {}", e);
            None
        }
    }
}
