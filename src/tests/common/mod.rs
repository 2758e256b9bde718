// tests/common/mod.rs
pub use axum::{body::Body, Router};
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::cache::credential::CachedCredential;
use crate::cache::store::{CredentialStore, MemoryStore};
use crate::config::clients::{QrCacheType, QrStorageConfig, Timeouts, VendorConfig};
use crate::error::{Result, TransportError};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::vendors::Vendor;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn timeouts() -> Timeouts {
    Timeouts {
        access_token_ms: 2000,
        code2session_ms: 2000,
        check_session_ms: Some(2000),
        send_template_ms: 2000,
        qrcode_ms: Some(2000),
    }
}

pub fn local_qr(dir: &Path) -> QrStorageConfig {
    QrStorageConfig {
        cache_type: QrCacheType::Local {
            real_dir_path: dir.display().to_string(),
        },
        relative_dir_path: "qrcode".to_owned(),
        request_url_prefix: "https://cdn.example.com".to_owned(),
    }
}

pub fn vendor_config(vendor: Vendor, base_url: &str, qr_dir: Option<&Path>) -> VendorConfig {
    let mut t = timeouts();
    if vendor == Vendor::Qq {
        t.check_session_ms = None;
        t.qrcode_ms = None;
    }
    if vendor == Vendor::Toutiao {
        t.check_session_ms = None;
    }
    VendorConfig {
        vendor,
        app_id: format!("{}-app-1", vendor),
        app_secret: "s3cret".to_owned(),
        api_base_url: base_url.trim_end_matches('/').to_owned(),
        cache_db_number: 0,
        cache_key_prefix: "game".to_owned(),
        timeouts: t,
        qrcode: qr_dir.map(local_qr),
    }
}

/// Scripted transport: answers from a queue and records every request.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<std::result::Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            content_type: Some("application/json".to_owned()),
            body: serde_json::to_vec(&body).unwrap(),
        }));
    }

    pub fn push_bytes(&self, content_type: &str, body: &[u8]) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status: 200,
            content_type: Some(content_type.to_owned()),
            body: body.to_vec(),
        }));
    }

    pub fn push_error(&self, err: TransportError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(TransportError::Connect("no scripted response".to_owned())))
    }
}

pub fn query_value(request: &HttpRequest, key: &str) -> Option<String> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

/// MemoryStore wrapper counting writes.
#[derive(Debug, Clone)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub writes: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<CachedCredential>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, credential: CachedCredential, ttl_seconds: u64) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, credential, ttl_seconds).await
    }
}
