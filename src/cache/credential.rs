use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bearer credential as kept in the store.
///
/// Never mutated in place: a refresh replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCredential {
    pub value: String,
    pub expires_at: i64, // UNIX TIMESTAMP
}

impl CachedCredential {
    pub fn new(value: String, expires_at: i64) -> Self {
        Self { value, expires_at }
    }

    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

/// Result of one upstream refresh: the token and the lifetime the vendor reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub value: String,
    pub ttl_seconds: u64,
}

impl IssuedCredential {
    pub fn new(value: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            value: value.into(),
            ttl_seconds,
        }
    }

    /// Fails when `now + ttl_seconds` does not fit a timestamp.
    pub fn into_cached(self, now: i64) -> Result<CachedCredential> {
        let expires_at = expiry_after(now, self.ttl_seconds).ok_or_else(|| {
            Error::Decode(format!("credential ttl {} is out of range", self.ttl_seconds))
        })?;
        Ok(CachedCredential::new(self.value, expires_at))
    }
}

/// `now + ttl_seconds`, or `None` when the sum overflows.
pub fn expiry_after(now: i64, ttl_seconds: u64) -> Option<i64> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
}

/// Cache key for a client's access token: `{prefix}:access_token:{app_id}`.
pub fn access_token_key(prefix: &str, app_id: &str) -> String {
    format!("{}:access_token:{}", prefix, app_id)
}
