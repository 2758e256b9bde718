/// Vendors module
///
/// Each platform is described by a static `VendorProfile`: endpoint paths,
/// parameter names, where the access token travels and how the response
/// reports success. The client reads these tables; it never branches on the
/// vendor itself except through `QrBodyShape`.
use std::fmt;

use http::Method;
use serde::{Deserialize, Serialize};

pub mod profiles;
pub mod response;

pub use response::StatusSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Wechat,
    Qq,
    Toutiao,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Wechat => "wechat",
            Vendor::Qq => "qq",
            Vendor::Toutiao => "toutiao",
        }
    }

    pub fn profile(&self) -> &'static VendorProfile {
        match self {
            Vendor::Wechat => &profiles::WECHAT,
            Vendor::Qq => &profiles::QQ,
            Vendor::Toutiao => &profiles::TOUTIAO,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an authenticated call carries the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPlacement {
    /// `?access_token=...`
    Query,
    /// `"access_token"` field of the JSON body
    Body,
}

/// Client-credential grant.
#[derive(Debug)]
pub struct TokenEndpoint {
    pub method: Method,
    pub path: &'static str,
    pub app_id_param: &'static str,
    pub secret_param: &'static str,
    pub grant_type: &'static str,
    pub token_field: &'static str,
    pub ttl_field: &'static str,
    pub status: StatusSchema,
}

/// Login-code exchange.
#[derive(Debug)]
pub struct SessionEndpoint {
    pub method: Method,
    pub path: &'static str,
    pub app_id_param: &'static str,
    pub secret_param: &'static str,
    pub code_param: &'static str,
    /// Set when the vendor accepts an anonymous login code instead.
    pub anonymous_code_param: Option<&'static str>,
    pub grant_type: Option<&'static str>,
    pub open_id_field: &'static str,
    pub session_key_field: &'static str,
    pub union_id_field: Option<&'static str>,
    pub anonymous_open_id_field: Option<&'static str>,
    pub status: StatusSchema,
}

/// Session-key verification.
#[derive(Debug)]
pub struct CheckSessionEndpoint {
    pub method: Method,
    pub path: &'static str,
    pub sig_method: &'static str,
    pub status: StatusSchema,
}

/// Template / subscribe message push.
#[derive(Debug)]
pub struct TemplateEndpoint {
    pub method: Method,
    pub path: &'static str,
    pub token: TokenPlacement,
    pub form_id: bool,
    pub emphasis_keyword: bool,
    pub status: StatusSchema,
}

/// Request body layout for QR generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrBodyShape {
    /// path, width, auto_color, line_color, is_hyaline
    Wechat,
    /// appname, path, width, line_color, background, set_icon
    Toutiao,
}

#[derive(Debug)]
pub struct QrEndpoint {
    pub method: Method,
    pub path: &'static str,
    pub token: TokenPlacement,
    pub shape: QrBodyShape,
    pub status: StatusSchema,
}

#[derive(Debug)]
pub struct VendorProfile {
    pub vendor: Vendor,
    pub default_base_url: &'static str,
    pub access_token: TokenEndpoint,
    pub code2session: SessionEndpoint,
    pub check_session: Option<CheckSessionEndpoint>,
    pub template_message: TemplateEndpoint,
    pub qrcode: Option<QrEndpoint>,
}
