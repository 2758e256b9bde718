use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Code handed over by the mini-game after `login()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginCode {
    Code(String),
    /// Toutiao guests without a logged-in account.
    Anonymous(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSession {
    pub open_id: Option<String>,
    pub anonymous_open_id: Option<String>,
    pub session_key: String,
    pub union_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMessage {
    pub to_user: String,
    pub template_id: String,
    pub page: String,
    pub data: Value,
    /// QQ and Toutiao only
    pub form_id: Option<String>,
    /// QQ only
    pub emphasis_keyword: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCodeRequest {
    pub path: String,
    pub width: u32,
    pub auto_color: bool,
    pub line_color: Rgb,
    /// WeChat: transparent background
    pub is_hyaline: bool,
    /// Toutiao host app: toutiao, douyin, pipixia, huoshan
    pub app_name: String,
    pub background: Rgb,
    pub set_icon: bool,
}

impl QrCodeRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for QrCodeRequest {
    fn default() -> Self {
        Self {
            path: String::new(),
            width: 430,
            auto_color: false,
            line_color: Rgb::BLACK,
            is_hyaline: false,
            app_name: "toutiao".to_owned(),
            background: Rgb::WHITE,
            set_icon: false,
        }
    }
}
