use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::settings::SettingsConfig;
use crate::error::ConfigError;
use crate::vendors::Vendor;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub clients: HashMap<String, RawClientConfig>,
}

/// ================================
/// Clients, as written in YAML
/// ================================
///
/// Every field is optional here so that a missing one can be reported by
/// name. An empty string (e.g. an unset `${VAR}`) counts as missing.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawClientConfig {
    pub vendor: Option<Vendor>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub api_base_url: Option<String>,
    pub cache_db_number: Option<i64>,
    pub cache_key_prefix: Option<String>,
    #[serde(default)]
    pub timeouts: RawTimeouts,
    pub qrcode: Option<RawQrConfig>,
}

/// Per-operation timeouts in milliseconds. No defaults: every operation the
/// vendor offers needs one.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawTimeouts {
    pub access_token_ms: Option<u64>,
    pub code2session_ms: Option<u64>,
    pub check_session_ms: Option<u64>,
    pub send_template_ms: Option<u64>,
    pub qrcode_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawQrConfig {
    pub cache_type: Option<String>, // local | oss
    pub real_dir_path: Option<String>,
    pub relative_dir_path: Option<String>,
    pub request_url_prefix: Option<String>,
    pub oss: Option<RawOssConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawOssConfig {
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub end_point: Option<String>,
    pub bucket: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// ================================
/// Validated client configuration
/// ================================
///
/// Serialized only to fingerprint the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorConfig {
    pub vendor: Vendor,
    pub app_id: String,
    pub app_secret: String,
    pub api_base_url: String,
    pub cache_db_number: i64,
    pub cache_key_prefix: String,
    pub timeouts: Timeouts,
    pub qrcode: Option<QrStorageConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeouts {
    pub access_token_ms: u64,
    pub code2session_ms: u64,
    pub check_session_ms: Option<u64>,
    pub send_template_ms: u64,
    pub qrcode_ms: Option<u64>,
}

impl Timeouts {
    pub fn access_token(&self) -> Duration {
        Duration::from_millis(self.access_token_ms)
    }

    pub fn code2session(&self) -> Duration {
        Duration::from_millis(self.code2session_ms)
    }

    pub fn send_template(&self) -> Duration {
        Duration::from_millis(self.send_template_ms)
    }

    /// Only set for vendors that offer the operation.
    pub fn check_session(&self) -> Option<Duration> {
        self.check_session_ms.map(Duration::from_millis)
    }

    pub fn qrcode(&self) -> Option<Duration> {
        self.qrcode_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrStorageConfig {
    pub cache_type: QrCacheType,
    pub relative_dir_path: String,
    pub request_url_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QrCacheType {
    Local { real_dir_path: String },
    Oss(OssConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OssConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub end_point: String,
    pub bucket: String,
    pub timeout_ms: u64,
}

impl RawClientConfig {
    /// Validate every setting before any network call is possible.
    /// Fails on the first missing or invalid field, naming it.
    pub fn validate(&self, client: &str) -> Result<VendorConfig, ConfigError> {
        let v = FieldCheck { client };

        let vendor = self.vendor.ok_or_else(|| v.missing("vendor"))?;
        let profile = vendor.profile();
        let app_id = v.required_str(&self.app_id, "app_id")?;
        let app_secret = v.required_str(&self.app_secret, "app_secret")?;

        let api_base_url = match non_empty(&self.api_base_url) {
            Some(url) => {
                Url::parse(url).map_err(|e| v.invalid("api_base_url", e.to_string()))?;
                url.trim_end_matches('/').to_owned()
            }
            None => profile.default_base_url.to_owned(),
        };

        let cache_db_number = self
            .cache_db_number
            .ok_or_else(|| v.missing("cache_db_number"))?;
        if cache_db_number < 0 {
            return Err(v.invalid("cache_db_number", "must not be negative".to_owned()));
        }
        let cache_key_prefix = v.required_str(&self.cache_key_prefix, "cache_key_prefix")?;

        let t = &self.timeouts;
        let timeouts = Timeouts {
            access_token_ms: v.timeout(t.access_token_ms, "timeouts.access_token_ms")?,
            code2session_ms: v.timeout(t.code2session_ms, "timeouts.code2session_ms")?,
            check_session_ms: match profile.check_session {
                Some(_) => Some(v.timeout(t.check_session_ms, "timeouts.check_session_ms")?),
                None => None,
            },
            send_template_ms: v.timeout(t.send_template_ms, "timeouts.send_template_ms")?,
            qrcode_ms: match profile.qrcode {
                Some(_) => Some(v.timeout(t.qrcode_ms, "timeouts.qrcode_ms")?),
                None => None,
            },
        };

        let qrcode = match profile.qrcode {
            Some(_) => {
                let raw = self.qrcode.as_ref().ok_or_else(|| v.missing("qrcode"))?;
                Some(raw.validate(&v)?)
            }
            None => None,
        };

        Ok(VendorConfig {
            vendor,
            app_id,
            app_secret,
            api_base_url,
            cache_db_number,
            cache_key_prefix,
            timeouts,
            qrcode,
        })
    }
}

impl RawQrConfig {
    fn validate(&self, v: &FieldCheck<'_>) -> Result<QrStorageConfig, ConfigError> {
        let cache_type = v.required_str(&self.cache_type, "qrcode.cache_type")?;
        let cache_type = match cache_type.as_str() {
            "local" => {
                let dir = v.required_str(&self.real_dir_path, "qrcode.real_dir_path")?;
                if !Path::new(&dir).is_dir() {
                    return Err(v.invalid(
                        "qrcode.real_dir_path",
                        format!("'{}' is not an existing directory", dir),
                    ));
                }
                QrCacheType::Local { real_dir_path: dir }
            }
            "oss" => {
                let oss = self.oss.as_ref().ok_or_else(|| v.missing("qrcode.oss"))?;
                QrCacheType::Oss(OssConfig {
                    access_key_id: v.required_str(&oss.access_key_id, "qrcode.oss.access_key_id")?,
                    access_key_secret: v
                        .required_str(&oss.access_key_secret, "qrcode.oss.access_key_secret")?,
                    end_point: v.required_str(&oss.end_point, "qrcode.oss.end_point")?,
                    bucket: v.required_str(&oss.bucket, "qrcode.oss.bucket")?,
                    timeout_ms: v.timeout(oss.timeout_ms, "qrcode.oss.timeout_ms")?,
                })
            }
            other => {
                return Err(v.invalid(
                    "qrcode.cache_type",
                    format!("'{}' is not supported; expected 'local' or 'oss'", other),
                ))
            }
        };

        Ok(QrStorageConfig {
            cache_type,
            relative_dir_path: v.required_str(&self.relative_dir_path, "qrcode.relative_dir_path")?,
            request_url_prefix: v
                .required_str(&self.request_url_prefix, "qrcode.request_url_prefix")?,
        })
    }
}

struct FieldCheck<'a> {
    client: &'a str,
}

impl FieldCheck<'_> {
    fn missing(&self, field: &'static str) -> ConfigError {
        ConfigError::MissingField {
            client: self.client.to_owned(),
            field,
        }
    }

    fn invalid(&self, field: &'static str, reason: String) -> ConfigError {
        ConfigError::InvalidField {
            client: self.client.to_owned(),
            field,
            reason,
        }
    }

    fn required_str(&self, value: &Option<String>, field: &'static str) -> Result<String, ConfigError> {
        non_empty(value)
            .map(str::to_owned)
            .ok_or_else(|| self.missing(field))
    }

    fn timeout(&self, value: Option<u64>, field: &'static str) -> Result<u64, ConfigError> {
        match value {
            None => Err(self.missing(field)),
            Some(0) => Err(self.invalid(field, "must be greater than zero".to_owned())),
            Some(ms) => Ok(ms),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
