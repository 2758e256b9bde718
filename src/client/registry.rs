//! Registry of live clients, keyed by a fingerprint of their configuration.
//!
//! Asking twice with an equal configuration returns the same client, so the
//! HTTP pool and credential store are shared.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::credential_cache::CredentialCache;
use crate::cache::provider::{RedisStoreProvider, StoreProvider};
use crate::cache::store::MemoryStore;
use crate::client::MiniGameClient;
use crate::config::clients::{OssConfig, QrCacheType, VendorConfig};
use crate::config::settings::{CacheBackend, CacheSettings};
use crate::error::{Error, Result};
use crate::helpers::redact::redact_id;
use crate::helpers::time::{Clock, SystemClock};
use crate::qrcode::object_store::{ObjectStore, OssObjectStore};
use crate::qrcode::QrAssetResolver;
use crate::transport::{ReqwestTransport, Transport};

pub type ObjectStoreFactory = Arc<dyn Fn(&OssConfig) -> Arc<dyn ObjectStore> + Send + Sync>;

pub struct ClientRegistry {
    transport: Arc<dyn Transport>,
    stores: Arc<dyn StoreProvider>,
    clock: Arc<dyn Clock>,
    single_flight: bool,
    object_stores: ObjectStoreFactory,
    clients: RwLock<HashMap<String, Arc<MiniGameClient>>>,
}

impl ClientRegistry {
    pub fn new(stores: Arc<dyn StoreProvider>) -> Self {
        Self {
            transport: Arc::new(ReqwestTransport::default()),
            stores,
            clock: Arc::new(SystemClock),
            single_flight: false,
            object_stores: Arc::new(|cfg: &OssConfig| {
                Arc::new(OssObjectStore::new(reqwest::Client::new(), cfg)) as Arc<dyn ObjectStore>
            }),
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Registry backed by the store named in `settings.cache`.
    pub fn from_settings(cache: &CacheSettings) -> Result<Self> {
        let stores: Arc<dyn StoreProvider> = match cache.backend {
            CacheBackend::Memory => Arc::new(MemoryStore::default()),
            CacheBackend::Redis => {
                let url = cache
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| Error::Store("settings.cache.redis_url is not set".to_owned()))?;
                Arc::new(RedisStoreProvider::new(url))
            }
        };
        Ok(Self::new(stores).with_single_flight(cache.single_flight))
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    pub fn with_object_stores(mut self, factory: ObjectStoreFactory) -> Self {
        self.object_stores = factory;
        self
    }

    /// Client for `config`, built on first request and reused afterwards.
    pub async fn get_or_create(&self, config: &VendorConfig) -> Result<Arc<MiniGameClient>> {
        let key = fingerprint(config)?;
        if let Some(client) = self.clients.read().await.get(&key) {
            debug!(vendor = %config.vendor, app_id = %redact_id(&config.app_id), "reusing client");
            return Ok(client.clone());
        }

        // built without holding the lock; a racing build of the same config loses
        let built = Arc::new(self.build(config).await?);
        let client = self
            .clients
            .write()
            .await
            .entry(key)
            .or_insert_with(|| {
                info!(vendor = %config.vendor, app_id = %redact_id(&config.app_id), "client created");
                built
            })
            .clone();
        Ok(client)
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn build(&self, config: &VendorConfig) -> Result<MiniGameClient> {
        let store = self.stores.store_for(config.cache_db_number).await?;
        let credentials =
            CredentialCache::new(store, self.clock.clone()).with_single_flight(self.single_flight);

        let qr = match &config.qrcode {
            Some(qr_cfg) => {
                let object_store = match &qr_cfg.cache_type {
                    QrCacheType::Oss(oss) => Some((self.object_stores)(oss)),
                    QrCacheType::Local { .. } => None,
                };
                Some(QrAssetResolver::from_config(qr_cfg, object_store)?)
            }
            None => None,
        };

        Ok(MiniGameClient::new(
            config.clone(),
            self.transport.clone(),
            credentials,
            qr,
        ))
    }
}

/// Hex SHA-256 of the canonical JSON form of a validated configuration.
pub fn fingerprint(config: &VendorConfig) -> Result<String> {
    let json = serde_json::to_vec(config)
        .map_err(|e| Error::Decode(format!("cannot fingerprint config: {}", e)))?;
    Ok(format!("{:x}", Sha256::digest(&json)))
}
