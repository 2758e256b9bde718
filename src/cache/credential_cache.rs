//! Credential cache façade.
//!
//! Serves a stored credential while it is fresh, otherwise runs the caller's
//! refresh exactly once and publishes the result with `expires_at = now + ttl`.
//! A failed refresh writes nothing, so the next `get` simply tries again.
//!
//! Concurrent misses for one key may each refresh upstream unless the cache is
//! built with `single_flight`, in which case they queue on a per-key guard and
//! re-check the store before refreshing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::credential::IssuedCredential;
use crate::cache::store::CredentialStore;
use crate::error::Result;
use crate::helpers::time::Clock;
use crate::observability::metrics::get_metrics;

static HIT_MSG: &str = "hit";
static MISS_MSG: &str = "miss";

#[derive(Clone)]
pub struct CredentialCache {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    // key -> in-flight guard, only used with single_flight
    in_flight: Option<Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>>,
}

impl CredentialCache {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            in_flight: None,
        }
    }

    /// Make concurrent misses for the same key share one refresh.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(|| Arc::new(RwLock::new(HashMap::new())));
        self
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Return the credential for `key`, refreshing it when absent or expired.
    pub async fn get<F, Fut>(&self, key: &str, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedCredential>>,
    {
        if let Some(value) = self.lookup(key).await? {
            record_lookup(key, HIT_MSG).await;
            return Ok(value);
        }

        match &self.in_flight {
            None => {
                record_lookup(key, MISS_MSG).await;
                self.refresh_and_store(key, refresh).await
            }
            Some(in_flight) => {
                let guard = guard_for(in_flight, key).await;
                let _in_flight = guard.lock().await;
                // another caller may have refreshed while we waited
                if let Some(value) = self.lookup(key).await? {
                    record_lookup(key, HIT_MSG).await;
                    return Ok(value);
                }
                record_lookup(key, MISS_MSG).await;
                self.refresh_and_store(key, refresh).await
            }
        }
    }

    async fn lookup(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now();
        match self.store.get(key).await? {
            Some(credential) if credential.is_fresh(now) => {
                debug!(key, remaining = credential.expires_at - now, "credential cache hit");
                Ok(Some(credential.value))
            }
            Some(_) => {
                debug!(key, "credential expired");
                Ok(None)
            }
            None => {
                debug!(key, "credential absent");
                Ok(None)
            }
        }
    }

    async fn refresh_and_store<F, Fut>(&self, key: &str, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedCredential>>,
    {
        let issued = refresh().await?;
        get_metrics().await.credential_refreshes.inc();

        let ttl_seconds = issued.ttl_seconds;
        let cached = issued.into_cached(self.clock.now())?;
        let value = cached.value.clone();
        if ttl_seconds == 0 {
            // already expired on arrival; nothing worth publishing
            info!(key, "refreshed credential has zero ttl; not cached");
            return Ok(value);
        }
        self.store.set(key, cached, ttl_seconds).await?;
        info!(key, ttl_seconds, "credential refreshed");
        Ok(value)
    }
}

async fn record_lookup(key: &str, outcome: &str) {
    get_metrics()
        .await
        .credential_lookups
        .with_label_values(&[key, outcome])
        .inc();
}

async fn guard_for(
    in_flight: &RwLock<HashMap<String, Arc<Mutex<()>>>>,
    key: &str,
) -> Arc<Mutex<()>> {
    if let Some(guard) = in_flight.read().await.get(key) {
        return guard.clone();
    }
    in_flight
        .write()
        .await
        .entry(key.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}
