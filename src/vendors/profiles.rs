use http::Method;

use crate::vendors::{
    CheckSessionEndpoint, QrBodyShape, QrEndpoint, SessionEndpoint, StatusSchema,
    TemplateEndpoint, TokenEndpoint, TokenPlacement, Vendor, VendorProfile,
};

const ERRCODE: StatusSchema = StatusSchema::new("errcode", "errmsg");

pub static WECHAT: VendorProfile = VendorProfile {
    vendor: Vendor::Wechat,
    default_base_url: "https://api.weixin.qq.com",
    access_token: TokenEndpoint {
        method: Method::GET,
        path: "/cgi-bin/token",
        app_id_param: "appid",
        secret_param: "secret",
        grant_type: "client_credential",
        token_field: "access_token",
        ttl_field: "expires_in",
        status: ERRCODE,
    },
    code2session: SessionEndpoint {
        method: Method::GET,
        path: "/sns/jscode2session",
        app_id_param: "appid",
        secret_param: "secret",
        code_param: "js_code",
        anonymous_code_param: None,
        grant_type: Some("authorization_code"),
        open_id_field: "openid",
        session_key_field: "session_key",
        union_id_field: Some("unionid"),
        anonymous_open_id_field: None,
        status: ERRCODE,
    },
    check_session: Some(CheckSessionEndpoint {
        method: Method::GET,
        path: "/wxa/checksession",
        sig_method: "hmac_sha256",
        status: ERRCODE,
    }),
    template_message: TemplateEndpoint {
        method: Method::POST,
        path: "/cgi-bin/message/subscribe/send",
        token: TokenPlacement::Query,
        form_id: false,
        emphasis_keyword: false,
        status: ERRCODE,
    },
    qrcode: Some(QrEndpoint {
        method: Method::POST,
        path: "/wxa/getwxacode",
        token: TokenPlacement::Query,
        shape: QrBodyShape::Wechat,
        status: ERRCODE,
    }),
};

pub static QQ: VendorProfile = VendorProfile {
    vendor: Vendor::Qq,
    default_base_url: "https://api.q.qq.com",
    access_token: TokenEndpoint {
        method: Method::GET,
        path: "/api/getToken",
        app_id_param: "appid",
        secret_param: "secret",
        grant_type: "client_credential",
        token_field: "access_token",
        ttl_field: "expires_in",
        status: ERRCODE,
    },
    code2session: SessionEndpoint {
        method: Method::GET,
        path: "/sns/jscode2session",
        app_id_param: "appid",
        secret_param: "secret",
        code_param: "js_code",
        anonymous_code_param: None,
        grant_type: Some("authorization_code"),
        open_id_field: "openid",
        session_key_field: "session_key",
        union_id_field: Some("unionid"),
        anonymous_open_id_field: None,
        status: ERRCODE,
    },
    check_session: None,
    template_message: TemplateEndpoint {
        method: Method::POST,
        path: "/api/json/template/send",
        token: TokenPlacement::Query,
        form_id: true,
        emphasis_keyword: true,
        status: ERRCODE,
    },
    qrcode: None,
};

pub static TOUTIAO: VendorProfile = VendorProfile {
    vendor: Vendor::Toutiao,
    default_base_url: "https://developer.toutiao.com",
    access_token: TokenEndpoint {
        method: Method::GET,
        path: "/api/apps/token",
        app_id_param: "appid",
        secret_param: "secret",
        grant_type: "client_credential",
        token_field: "access_token",
        ttl_field: "expires_in",
        status: ERRCODE,
    },
    code2session: SessionEndpoint {
        method: Method::GET,
        path: "/api/apps/jscode2session",
        app_id_param: "appid",
        secret_param: "secret",
        code_param: "code",
        anonymous_code_param: Some("anonymous_code"),
        grant_type: None,
        open_id_field: "openid",
        session_key_field: "session_key",
        union_id_field: None,
        anonymous_open_id_field: Some("anonymous_openid"),
        // this endpoint alone reports failures through `error`
        status: StatusSchema::new("error", "errmsg"),
    },
    check_session: None,
    template_message: TemplateEndpoint {
        method: Method::POST,
        path: "/api/apps/game/template/send",
        token: TokenPlacement::Body,
        form_id: true,
        emphasis_keyword: false,
        status: ERRCODE,
    },
    qrcode: Some(QrEndpoint {
        method: Method::POST,
        path: "/api/apps/qrcode",
        token: TokenPlacement::Body,
        shape: QrBodyShape::Toutiao,
        status: ERRCODE,
    }),
};
