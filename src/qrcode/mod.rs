//! QR asset resolver.
//!
//! Picks a file extension from the declared content type, names the file after
//! the MD5 of its bytes and hands it to the configured sink (local directory or
//! object store). The public URL is `request_url_prefix/relative_dir/filename`.

use std::sync::Arc;

use md5::{Digest, Md5};
use tracing::info;

use crate::config::clients::{QrCacheType, QrStorageConfig};
use crate::error::{Error, Result};
use crate::observability::metrics::get_metrics;

pub mod local_sink;
pub mod object_store;

use local_sink::LocalSink;
use object_store::ObjectStore;

/// Every entry carries its leading dot.
const EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("application/x-png", ".png"),
    ("image/gif", ".gif"),
    ("image/vnd.wap.wbmp", ".wbmp"),
    ("image/x-icon", ".ico"),
    ("image/vnd.rn-realpix", ".rp"),
    ("image/tiff", ".tiff"),
    ("image/pnetvue", ".net"),
    ("image/fax", ".fax"),
];

/// Extension for a content type; parameters such as `; charset=` are ignored.
pub fn extension_for(content_type: &str) -> Result<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(ct, _)| *ct == essence)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| Error::UnsupportedContentType(content_type.to_owned()))
}

/// Content-derived filename: lowercase hex MD5 of the bytes plus extension.
pub fn filename_for(bytes: &[u8], content_type: &str) -> Result<String> {
    let ext = extension_for(content_type)?;
    Ok(format!("{:x}{}", Md5::digest(bytes), ext))
}

/// Where a stored QR image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrAsset {
    pub filename: String,
    /// Local path or `bucket/key` of the stored object.
    pub location: String,
    pub url: String,
}

#[derive(Clone)]
pub enum QrSink {
    Local(LocalSink),
    ObjectStore {
        store: Arc<dyn ObjectStore>,
        bucket: String,
    },
}

impl QrSink {
    fn kind(&self) -> &'static str {
        match self {
            QrSink::Local(_) => "local",
            QrSink::ObjectStore { .. } => "object_store",
        }
    }
}

#[derive(Clone)]
pub struct QrAssetResolver {
    sink: QrSink,
    relative_dir_path: String,
    request_url_prefix: String,
}

impl QrAssetResolver {
    pub fn new(sink: QrSink, relative_dir_path: String, request_url_prefix: String) -> Self {
        Self {
            sink,
            relative_dir_path,
            request_url_prefix,
        }
    }

    /// Build the resolver from validated config; `object_store` is required in `oss` mode.
    pub fn from_config(
        cfg: &QrStorageConfig,
        object_store: Option<Arc<dyn ObjectStore>>,
    ) -> Result<Self> {
        let sink = match &cfg.cache_type {
            QrCacheType::Local { real_dir_path } => QrSink::Local(LocalSink::new(real_dir_path.clone())),
            QrCacheType::Oss(oss) => {
                let store = object_store
                    .ok_or_else(|| Error::Persistence("object store is not configured".to_owned()))?;
                QrSink::ObjectStore {
                    store,
                    bucket: oss.bucket.clone(),
                }
            }
        };
        Ok(Self::new(
            sink,
            cfg.relative_dir_path.clone(),
            cfg.request_url_prefix.clone(),
        ))
    }

    pub async fn persist(&self, bytes: &[u8], content_type: &str) -> Result<QrAsset> {
        let filename = filename_for(bytes, content_type)?;
        let relative_path = join_path(&self.relative_dir_path, &filename);

        let location = match &self.sink {
            QrSink::Local(local) => local.write(&filename, bytes).await?,
            QrSink::ObjectStore { store, bucket } => {
                store.put(bucket, &relative_path, bytes, content_type).await?;
                format!("{}/{}", bucket, relative_path)
            }
        };
        get_metrics()
            .await
            .qr_assets_stored
            .with_label_values(&[self.sink.kind()])
            .inc();
        info!(filename = %filename, sink = self.sink.kind(), "qr code stored");

        Ok(QrAsset {
            url: join_path(&self.request_url_prefix, &relative_path),
            filename,
            location,
        })
    }
}

fn join_path(base: &str, tail: &str) -> String {
    let base = base.trim_end_matches('/');
    let tail = tail.trim_start_matches('/');
    if base.is_empty() {
        tail.to_owned()
    } else {
        format!("{}/{}", base, tail)
    }
}
