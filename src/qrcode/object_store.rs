//! Object storage collaborator.
//!
//! `OssObjectStore` speaks Aliyun OSS `PutObject` with the header signature:
//! `Authorization: OSS {access_key_id}:base64(hmac_sha1(secret, string_to_sign))`.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha1::Sha1;
use tracing::{debug, error};

use crate::config::clients::OssConfig;
use crate::error::{Error, Result};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8], content_type: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct OssObjectStore {
    client: Client,
    access_key_id: String,
    access_key_secret: String,
    end_point: String,
    timeout: Duration,
}

impl OssObjectStore {
    pub fn new(client: Client, cfg: &OssConfig) -> Self {
        Self {
            client,
            access_key_id: cfg.access_key_id.clone(),
            access_key_secret: cfg.access_key_secret.clone(),
            end_point: cfg.end_point.clone(),
            timeout: Duration::from_millis(cfg.timeout_ms),
        }
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        let (scheme, host) = match self.end_point.split_once("://") {
            Some((scheme, host)) => (scheme, host),
            None => ("https", self.end_point.as_str()),
        };
        format!(
            "{}://{}.{}/{}",
            scheme,
            bucket,
            host.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }

    fn sign(&self, string_to_sign: &str) -> Result<String> {
        let mut mac = Hmac::<Sha1>::new_from_slice(self.access_key_secret.as_bytes())
            .map_err(|e| Error::Persistence(format!("invalid oss secret: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// `VERB\nContent-MD5\nContent-Type\nDate\n/bucket/key`
pub fn string_to_sign(verb: &str, content_type: &str, date: &str, bucket: &str, key: &str) -> String {
    format!(
        "{}\n\n{}\n{}\n/{}/{}",
        verb,
        content_type,
        date,
        bucket,
        key.trim_start_matches('/')
    )
}

#[async_trait]
impl ObjectStore for OssObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let signature = self.sign(&string_to_sign("PUT", content_type, &date, bucket, key))?;
        let url = self.object_url(bucket, key);
        debug!(bucket, key, "putting object");

        let response = self
            .client
            .put(&url)
            .timeout(self.timeout)
            .header("Date", &date)
            .header("Content-Type", content_type)
            .header(
                "Authorization",
                format!("OSS {}:{}", self.access_key_id, signature),
            )
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| Error::Persistence(format!("put {}/{}: {}", bucket, key, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(bucket, key, %status, "object store rejected put");
            return Err(Error::Persistence(format!(
                "put {}/{} failed with status {}: {}",
                bucket, key, status, body
            )));
        }
        Ok(())
    }
}
