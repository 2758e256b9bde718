//! Generic mini-game client.
//!
//! One implementation serves every vendor: requests are assembled from the
//! vendor's `VendorProfile`, responses are checked against its
//! `StatusSchema`, and the access token goes through the credential cache.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde_json::{json, Map, Value};
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::cache::credential::{access_token_key, IssuedCredential};
use crate::cache::credential_cache::CredentialCache;
use crate::config::clients::VendorConfig;
use crate::error::{Error, Result};
use crate::helpers::redact::redact_id;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::qrcode::{QrAsset, QrAssetResolver};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::vendors::response::{optional_str, parse_json, required_str, required_u64};
use crate::vendors::{QrBodyShape, StatusSchema, TokenPlacement, Vendor, VendorProfile};

pub mod registry;
pub mod types;

pub use registry::ClientRegistry;
pub use types::{LoginCode, LoginSession, QrCodeRequest, Rgb, TemplateMessage};

pub const OP_ACCESS_TOKEN: &str = "access_token";
pub const OP_CODE2SESSION: &str = "code2session";
pub const OP_CHECK_SESSION: &str = "check_session";
pub const OP_SEND_TEMPLATE: &str = "send_template";
pub const OP_QRCODE: &str = "qrcode";

/// Longest token lifetime accepted from a vendor (one year).
pub const MAX_TOKEN_TTL_SECONDS: u64 = 365 * 24 * 3600;

pub struct MiniGameClient {
    config: VendorConfig,
    profile: &'static VendorProfile,
    transport: Arc<dyn Transport>,
    credentials: CredentialCache,
    qr: Option<QrAssetResolver>,
    token_key: String,
}

impl MiniGameClient {
    pub fn new(
        config: VendorConfig,
        transport: Arc<dyn Transport>,
        credentials: CredentialCache,
        qr: Option<QrAssetResolver>,
    ) -> Self {
        let profile = config.vendor.profile();
        let token_key = access_token_key(&config.cache_key_prefix, &config.app_id);
        Self {
            config,
            profile,
            transport,
            credentials,
            qr,
            token_key,
        }
    }

    pub fn vendor(&self) -> Vendor {
        self.config.vendor
    }

    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    /// Store key of this client's access token.
    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    /// Cached access token, refreshed through the client-credential grant when needed.
    pub async fn access_token(&self) -> Result<String> {
        self.credentials
            .get(&self.token_key, || self.fetch_access_token())
            .await
    }

    async fn fetch_access_token(&self) -> Result<IssuedCredential> {
        let ep = &self.profile.access_token;
        debug!(
            vendor = %self.vendor(),
            app_id = %redact_id(&self.config.app_id),
            "requesting access_token (no secrets)"
        );
        let request = HttpRequest::new(
            ep.method.clone(),
            self.url(ep.path),
            self.config.timeouts.access_token(),
        )
        .query(ep.app_id_param, &self.config.app_id)
        .query(ep.secret_param, &self.config.app_secret)
        .query("grant_type", ep.grant_type);

        let body = self.call_json(OP_ACCESS_TOKEN, request, &ep.status).await?;
        let token = required_str(&body, ep.token_field)?;
        let ttl_seconds = required_u64(&body, ep.ttl_field)?;
        if ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            return Err(Error::Decode(format!(
                "field '{}' is out of range: {}",
                ep.ttl_field, ttl_seconds
            )));
        }
        Ok(IssuedCredential::new(token, ttl_seconds))
    }

    /// Exchange a login code for the user's session.
    pub async fn code2session(&self, code: &LoginCode) -> Result<LoginSession> {
        let ep = &self.profile.code2session;
        let mut request = HttpRequest::new(
            ep.method.clone(),
            self.url(ep.path),
            self.config.timeouts.code2session(),
        )
        .query(ep.app_id_param, &self.config.app_id)
        .query(ep.secret_param, &self.config.app_secret);

        request = match code {
            LoginCode::Code(js_code) => request.query(ep.code_param, js_code),
            LoginCode::Anonymous(anonymous_code) => {
                let param = ep.anonymous_code_param.ok_or(Error::UnsupportedOperation {
                    vendor: self.vendor(),
                    operation: "anonymous code2session",
                })?;
                request.query(param, anonymous_code)
            }
        };
        if let Some(grant_type) = ep.grant_type {
            request = request.query("grant_type", grant_type);
        }

        let body = self.call_json(OP_CODE2SESSION, request, &ep.status).await?;
        let session = LoginSession {
            open_id: optional_str(&body, Some(ep.open_id_field)),
            anonymous_open_id: optional_str(&body, ep.anonymous_open_id_field),
            session_key: required_str(&body, ep.session_key_field)?,
            union_id: optional_str(&body, ep.union_id_field),
        };
        if session.open_id.is_none() && session.anonymous_open_id.is_none() {
            return Err(Error::Decode(format!(
                "field '{}' not found or not a string",
                ep.open_id_field
            )));
        }
        Ok(session)
    }

    /// Ask the vendor whether `session_key` is still the user's current key.
    pub async fn check_session(&self, open_id: &str, session_key: &str) -> Result<()> {
        let (ep, timeout) = match (&self.profile.check_session, self.config.timeouts.check_session()) {
            (Some(ep), Some(timeout)) => (ep, timeout),
            _ => {
                return Err(Error::UnsupportedOperation {
                    vendor: self.vendor(),
                    operation: OP_CHECK_SESSION,
                })
            }
        };
        let signature = session_signature(session_key)?;
        let access_token = self.access_token().await?;

        let request = HttpRequest::new(ep.method.clone(), self.url(ep.path), timeout)
            .query("access_token", access_token)
            .query("openid", open_id)
            .query("signature", signature)
            .query("sig_method", ep.sig_method);

        self.call_json(OP_CHECK_SESSION, request, &ep.status).await?;
        Ok(())
    }

    pub async fn send_template_message(&self, message: &TemplateMessage) -> Result<()> {
        let ep = &self.profile.template_message;
        let access_token = self.access_token().await?;

        let mut body = Map::new();
        body.insert("touser".into(), json!(message.to_user));
        body.insert("template_id".into(), json!(message.template_id));
        body.insert("page".into(), json!(message.page));
        body.insert("data".into(), message.data.clone());
        match (&message.form_id, ep.form_id) {
            (Some(form_id), true) => {
                body.insert("form_id".into(), json!(form_id));
            }
            (Some(_), false) => debug!(vendor = %self.vendor(), "form_id ignored"),
            (None, _) => {}
        }
        match (&message.emphasis_keyword, ep.emphasis_keyword) {
            (Some(keyword), true) => {
                body.insert("emphasis_keyword".into(), json!(keyword));
            }
            (Some(_), false) => debug!(vendor = %self.vendor(), "emphasis_keyword ignored"),
            (None, _) => {}
        }

        let request = self.authenticated(
            HttpRequest::new(
                ep.method.clone(),
                self.url(ep.path),
                self.config.timeouts.send_template(),
            ),
            ep.token,
            access_token,
            body,
        );
        self.call_json(OP_SEND_TEMPLATE, request, &ep.status).await?;
        info!(vendor = %self.vendor(), template_id = %message.template_id, "template message sent");
        Ok(())
    }

    /// Generate a QR code and persist the image; returns where it was stored.
    pub async fn generate_qr_code(&self, qr: &QrCodeRequest) -> Result<QrAsset> {
        let unsupported = || Error::UnsupportedOperation {
            vendor: self.vendor(),
            operation: OP_QRCODE,
        };
        let ep = self.profile.qrcode.as_ref().ok_or_else(unsupported)?;
        let timeout = self.config.timeouts.qrcode().ok_or_else(unsupported)?;
        let resolver = self.qr.as_ref().ok_or_else(|| {
            Error::Persistence(format!("no qrcode storage configured for {}", self.vendor()))
        })?;

        let access_token = self.access_token().await?;
        let request = self.authenticated(
            HttpRequest::new(ep.method.clone(), self.url(ep.path), timeout),
            ep.token,
            access_token,
            qr_body(ep.shape, qr),
        );

        let response = self.call(OP_QRCODE, request).await?;
        // errors come back as JSON, images as raw bytes
        if response.is_json() || response.body.first() == Some(&b'{') {
            let body = self.checked_json(OP_QRCODE, &response, &ep.status).await?;
            warn!(vendor = %self.vendor(), "qrcode endpoint returned JSON without an image: {}", body);
            return Err(Error::Decode("expected image bytes, got a JSON body".to_owned()));
        }
        let content_type = response
            .content_type
            .as_deref()
            .ok_or_else(|| Error::UnsupportedContentType(String::new()))?;
        resolver.persist(&response.body, content_type).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn authenticated(
        &self,
        request: HttpRequest,
        placement: TokenPlacement,
        access_token: String,
        mut body: Map<String, Value>,
    ) -> HttpRequest {
        match placement {
            TokenPlacement::Query => request.query("access_token", access_token),
            TokenPlacement::Body => {
                body.insert("access_token".into(), Value::String(access_token));
                request
            }
        }
        .header("Content-Type", "application/json;charset=utf-8")
        .json(Value::Object(body))
    }

    /// Send, record metrics, and reject non-2xx statuses.
    async fn call(&self, operation: &'static str, request: HttpRequest) -> Result<HttpResponse> {
        let metrics = get_metrics().await;
        let vendor = self.vendor().as_str();
        let start = get_instant();
        metrics
            .upstream_requests
            .with_label_values(&[vendor, operation])
            .inc();

        let result = self
            .transport
            .send(request)
            .await
            .and_then(HttpResponse::error_for_status);
        metrics
            .upstream_duration
            .with_label_values(&[vendor, operation])
            .observe(start.elapsed().as_secs_f64());

        result.map_err(|e| {
            warn!(vendor, operation, "upstream call failed: {}", e);
            metrics
                .upstream_failures
                .with_label_values(&[vendor, operation, "transport"])
                .inc();
            Error::from(e)
        })
    }

    async fn call_json(
        &self,
        operation: &'static str,
        request: HttpRequest,
        status: &StatusSchema,
    ) -> Result<Value> {
        let response = self.call(operation, request).await?;
        self.checked_json(operation, &response, status).await
    }

    async fn checked_json(
        &self,
        operation: &'static str,
        response: &HttpResponse,
        status: &StatusSchema,
    ) -> Result<Value> {
        let checked = parse_json(&response.body).and_then(|body| status.check(&body).map(|_| body));
        if let Err(e) = &checked {
            let reason = match e {
                Error::Upstream { .. } => "upstream",
                _ => "decode",
            };
            warn!(vendor = %self.vendor(), operation, "upstream rejected call: {}", e);
            get_metrics()
                .await
                .upstream_failures
                .with_label_values(&[self.vendor().as_str(), operation, reason])
                .inc();
        }
        checked
    }
}

/// `hex(hmac_sha256(key = session_key, message = ""))`
pub fn session_signature(session_key: &str) -> Result<String> {
    let mac = Hmac::<Sha256>::new_from_slice(session_key.as_bytes())
        .map_err(|e| Error::Decode(format!("invalid session key: {}", e)))?;
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

fn qr_body(shape: QrBodyShape, qr: &QrCodeRequest) -> Map<String, Value> {
    let body = match shape {
        QrBodyShape::Wechat => json!({
            "path": qr.path,
            "width": qr.width,
            "auto_color": qr.auto_color,
            "line_color": qr.line_color,
            "is_hyaline": qr.is_hyaline,
        }),
        QrBodyShape::Toutiao => json!({
            "appname": qr.app_name,
            "path": qr.path,
            "width": qr.width,
            "line_color": qr.line_color,
            "background": qr.background,
            "set_icon": qr.set_icon,
        }),
    };
    match body {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl std::fmt::Debug for MiniGameClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniGameClient")
            .field("vendor", &self.config.vendor)
            .field("app_id", &redact_id(&self.config.app_id))
            .field("token_key", &self.token_key)
            .finish()
    }
}

