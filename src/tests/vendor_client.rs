#[cfg(test)]
mod tests {

    use std::path::Path;
    use std::sync::Arc;

    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use md5::{Digest, Md5};
    use serde_json::json;

    use crate::cache::store::{CredentialStore, MemoryStore};
    use crate::client::{session_signature, ClientRegistry, LoginCode, MiniGameClient, QrCodeRequest, TemplateMessage};
    use crate::config::clients::VendorConfig;
    use crate::error::{Error, TransportError};
    use crate::tests::common::{query_value, vendor_config, RecordingTransport};
    use crate::transport::{ReqwestTransport, Transport};
    use crate::vendors::Vendor;

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

    async fn build(
        transport: Arc<dyn Transport>,
        cfg: &VendorConfig,
    ) -> (Arc<MiniGameClient>, MemoryStore) {
        let store = MemoryStore::default();
        let registry = ClientRegistry::new(Arc::new(store.clone())).with_transport(transport);
        let client = registry.get_or_create(cfg).await.unwrap();
        (client, store)
    }

    async fn over_http(server: &MockServer, vendor: Vendor, qr_dir: Option<&Path>) -> (Arc<MiniGameClient>, MemoryStore) {
        let cfg = vendor_config(vendor, &server.base_url(), qr_dir);
        build(Arc::new(ReqwestTransport::default()), &cfg).await
    }

    fn template() -> TemplateMessage {
        TemplateMessage {
            to_user: "open-1".into(),
            template_id: "tpl-1".into(),
            page: "pages/index".into(),
            data: json!({ "thing1": { "value": "hello" } }),
            form_id: Some("form-1".into()),
            emphasis_keyword: Some("thing1.DATA".into()),
        }
    }

    #[tokio::test]
    async fn wechat_access_token_is_fetched_once_then_cached() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/cgi-bin/token")
                    .query_param("appid", "wechat-app-1")
                    .query_param("secret", "s3cret")
                    .query_param("grant_type", "client_credential");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({ "access_token": "AT-1", "expires_in": 7200 }));
            })
            .await;

        let (client, store) = over_http(&server, Vendor::Wechat, None).await;
        assert_eq!(client.access_token().await.unwrap(), "AT-1");
        assert_eq!(client.access_token().await.unwrap(), "AT-1");

        token_mock.assert_hits_async(1).await;
        let cached = store.get("game:access_token:wechat-app-1").await.unwrap().unwrap();
        assert_eq!(cached.value, "AT-1");
    }

    #[tokio::test]
    async fn upstream_errcode_is_surfaced_and_not_cached() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cgi-bin/token");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({ "errcode": 40001, "errmsg": "invalid credential" }));
            })
            .await;

        let (client, store) = over_http(&server, Vendor::Wechat, None).await;
        match client.access_token().await.unwrap_err() {
            Error::Upstream { code, message } => {
                assert_eq!(code, 40001);
                assert_eq!(message, "invalid credential");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn non_2xx_is_a_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/getToken");
                then.status(503).body("unavailable");
            })
            .await;

        let (client, store) = over_http(&server, Vendor::Qq, None).await;
        assert!(matches!(
            client.access_token().await.unwrap_err(),
            Error::Transport(TransportError::Status(503))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn oversized_expires_in_is_rejected_and_not_cached() {
        let transport = RecordingTransport::new();
        transport.push_json(200, json!({ "access_token": "AT-HUGE", "expires_in": u64::MAX }));
        transport.push_json(200, json!({ "access_token": "AT-OK", "expires_in": 7200 }));
        let cfg = vendor_config(Vendor::Wechat, "https://api.example.com", None);
        let (client, store) = build(transport.clone(), &cfg).await;

        assert!(matches!(client.access_token().await.unwrap_err(), Error::Decode(_)));
        assert!(store.is_empty().await);

        assert_eq!(client.access_token().await.unwrap(), "AT-OK");
        assert_eq!(client.access_token().await.unwrap(), "AT-OK");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn wechat_code2session_returns_session() {
        let server = MockServer::start_async().await;
        let session_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/sns/jscode2session")
                    .query_param("js_code", "CODE-1")
                    .query_param("grant_type", "authorization_code");
                then.status(200)
                    .header("Content-Type", "text/plain")
                    .json_body(json!({ "openid": "open-1", "session_key": "sk-1", "unionid": "union-1" }));
            })
            .await;

        let (client, _) = over_http(&server, Vendor::Wechat, None).await;
        let session = client
            .code2session(&LoginCode::Code("CODE-1".into()))
            .await
            .unwrap();

        session_mock.assert_hits_async(1).await;
        assert_eq!(session.open_id.as_deref(), Some("open-1"));
        assert_eq!(session.session_key, "sk-1");
        assert_eq!(session.union_id.as_deref(), Some("union-1"));
        assert!(session.anonymous_open_id.is_none());
    }

    #[tokio::test]
    async fn toutiao_anonymous_login() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/apps/jscode2session")
                    .query_param("anonymous_code", "ANON-1");
                then.status(200).json_body(json!({
                    "error": 0,
                    "openid": "",
                    "anonymous_openid": "anon-open-1",
                    "session_key": "sk-tt"
                }));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (client, _) = over_http(&server, Vendor::Toutiao, Some(dir.path())).await;
        let session = client
            .code2session(&LoginCode::Anonymous("ANON-1".into()))
            .await
            .unwrap();

        assert!(session.open_id.is_none());
        assert_eq!(session.anonymous_open_id.as_deref(), Some("anon-open-1"));
        assert_eq!(session.session_key, "sk-tt");
    }

    #[tokio::test]
    async fn toutiao_session_failure_uses_error_field() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/apps/jscode2session");
                then.status(200)
                    .json_body(json!({ "error": 2, "errcode": 40015, "errmsg": "bad code" }));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (client, _) = over_http(&server, Vendor::Toutiao, Some(dir.path())).await;
        match client.code2session(&LoginCode::Code("x".into())).await.unwrap_err() {
            Error::Upstream { code, message } => {
                assert_eq!(code, 2);
                assert_eq!(message, "bad code");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn anonymous_code_is_toutiao_only() {
        let transport = RecordingTransport::new();
        let cfg = vendor_config(Vendor::Wechat, "http://127.0.0.1:9", None);
        let (client, _) = build(transport.clone(), &cfg).await;

        assert!(matches!(
            client.code2session(&LoginCode::Anonymous("a".into())).await.unwrap_err(),
            Error::UnsupportedOperation { vendor: Vendor::Wechat, .. }
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn wechat_qrcode_is_stored_locally() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cgi-bin/token");
                then.status(200)
                    .json_body(json!({ "access_token": "AT-QR", "expires_in": 7200 }));
            })
            .await;
        let qr_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/wxa/getwxacode")
                    .query_param("access_token", "AT-QR");
                then.status(200)
                    .header("Content-Type", "image/png")
                    .body(PNG_BYTES);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (client, _) = over_http(&server, Vendor::Wechat, Some(dir.path())).await;
        let asset = client
            .generate_qr_code(&QrCodeRequest::new("pages/index?room=1"))
            .await
            .unwrap();

        qr_mock.assert_hits_async(1).await;
        let expected = format!("{:x}.png", Md5::digest(PNG_BYTES));
        assert_eq!(asset.filename, expected);
        assert_eq!(asset.url, format!("https://cdn.example.com/qrcode/{}", expected));
        assert_eq!(std::fs::read(dir.path().join(&expected)).unwrap(), PNG_BYTES);
    }

    #[tokio::test]
    async fn qrcode_json_error_is_upstream() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/cgi-bin/token");
                then.status(200)
                    .json_body(json!({ "access_token": "AT", "expires_in": 7200 }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/wxa/getwxacode");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({ "errcode": 45029, "errmsg": "qrcode count out of limit" }));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (client, _) = over_http(&server, Vendor::Wechat, Some(dir.path())).await;
        assert!(matches!(
            client.generate_qr_code(&QrCodeRequest::new("p")).await.unwrap_err(),
            Error::Upstream { code: 45029, .. }
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn qq_has_no_qrcode_and_makes_no_call() {
        let transport = RecordingTransport::new();
        let cfg = vendor_config(Vendor::Qq, "http://127.0.0.1:9", None);
        let (client, _) = build(transport.clone(), &cfg).await;

        assert!(matches!(
            client.generate_qr_code(&QrCodeRequest::new("p")).await.unwrap_err(),
            Error::UnsupportedOperation { vendor: Vendor::Qq, operation: "qrcode" }
        ));
        assert!(matches!(
            client.check_session("open-1", "sk").await.unwrap_err(),
            Error::UnsupportedOperation { vendor: Vendor::Qq, .. }
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn wechat_check_session_signs_with_session_key() {
        let transport = RecordingTransport::new();
        transport.push_json(200, json!({ "access_token": "AT", "expires_in": 7200 }));
        transport.push_json(200, json!({ "errcode": 0, "errmsg": "ok" }));
        let cfg = vendor_config(Vendor::Wechat, "https://api.example.com", None);
        let (client, _) = build(transport.clone(), &cfg).await;

        client.check_session("open-1", "sk-1").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        let check = &requests[1];
        assert_eq!(check.url, "https://api.example.com/wxa/checksession");
        assert_eq!(query_value(check, "access_token").as_deref(), Some("AT"));
        assert_eq!(query_value(check, "openid").as_deref(), Some("open-1"));
        assert_eq!(query_value(check, "sig_method").as_deref(), Some("hmac_sha256"));
        assert_eq!(query_value(check, "signature"), Some(session_signature("sk-1").unwrap()));
    }

    #[test]
    fn session_signature_is_hmac_sha256_of_empty_message() {
        assert_eq!(
            session_signature("").unwrap(),
            "b613679a0814d9ec772f95d778c35fc5ff1697c493715653c6c712144292c5ad"
        );
    }

    #[tokio::test]
    async fn wechat_template_carries_token_in_query() {
        let transport = RecordingTransport::new();
        transport.push_json(200, json!({ "access_token": "AT", "expires_in": 7200 }));
        transport.push_json(200, json!({ "errcode": 0, "errmsg": "ok" }));
        let cfg = vendor_config(Vendor::Wechat, "https://api.example.com", None);
        let (client, _) = build(transport.clone(), &cfg).await;

        client.send_template_message(&template()).await.unwrap();

        let send = &transport.requests()[1];
        assert_eq!(send.url, "https://api.example.com/cgi-bin/message/subscribe/send");
        assert_eq!(query_value(send, "access_token").as_deref(), Some("AT"));
        let body = send.json.as_ref().unwrap();
        assert_eq!(body["touser"], "open-1");
        assert_eq!(body["template_id"], "tpl-1");
        assert!(body.get("form_id").is_none());
        assert!(body.get("emphasis_keyword").is_none());
        assert!(body.get("access_token").is_none());
    }

    #[tokio::test]
    async fn toutiao_template_carries_token_in_body() {
        let transport = RecordingTransport::new();
        transport.push_json(200, json!({ "access_token": "AT", "expires_in": 7200 }));
        transport.push_json(200, json!({ "errcode": 0, "errmsg": "" }));
        let dir = tempfile::tempdir().unwrap();
        let cfg = vendor_config(Vendor::Toutiao, "https://tt.example.com", Some(dir.path()));
        let (client, _) = build(transport.clone(), &cfg).await;

        client.send_template_message(&template()).await.unwrap();

        let send = &transport.requests()[1];
        assert!(query_value(send, "access_token").is_none());
        let body = send.json.as_ref().unwrap();
        assert_eq!(body["access_token"], "AT");
        assert_eq!(body["form_id"], "form-1");
        assert!(body.get("emphasis_keyword").is_none());
    }

    #[tokio::test]
    async fn qq_template_keeps_form_id_and_keyword() {
        let transport = RecordingTransport::new();
        transport.push_json(200, json!({ "access_token": "AT", "expires_in": 7200 }));
        transport.push_json(200, json!({ "errcode": 0 }));
        let cfg = vendor_config(Vendor::Qq, "https://qq.example.com", None);
        let (client, _) = build(transport.clone(), &cfg).await;

        client.send_template_message(&template()).await.unwrap();

        let send = &transport.requests()[1];
        assert_eq!(send.url, "https://qq.example.com/api/json/template/send");
        let body = send.json.as_ref().unwrap();
        assert_eq!(body["form_id"], "form-1");
        assert_eq!(body["emphasis_keyword"], "thing1.DATA");
    }

    #[tokio::test]
    async fn toutiao_qrcode_body_and_jpeg_extension() {
        let transport = RecordingTransport::new();
        transport.push_json(200, json!({ "access_token": "AT", "expires_in": 7200 }));
        transport.push_bytes("image/jpeg", b"jpeg-bytes");
        let dir = tempfile::tempdir().unwrap();
        let cfg = vendor_config(Vendor::Toutiao, "https://tt.example.com", Some(dir.path()));
        let (client, _) = build(transport.clone(), &cfg).await;

        let mut request = QrCodeRequest::new("pages/index");
        request.app_name = "douyin".into();
        request.set_icon = true;
        let asset = client.generate_qr_code(&request).await.unwrap();

        assert!(asset.filename.ends_with(".jpg"));
        let body = transport.requests()[1].json.clone().unwrap();
        assert_eq!(body["access_token"], "AT");
        assert_eq!(body["appname"], "douyin");
        assert_eq!(body["set_icon"], true);
        assert_eq!(body["background"], json!({ "r": 255, "g": 255, "b": 255 }));
    }

    #[tokio::test]
    async fn unknown_image_type_is_rejected() {
        let transport = RecordingTransport::new();
        transport.push_json(200, json!({ "access_token": "AT", "expires_in": 7200 }));
        transport.push_bytes("image/webp", b"webp-bytes");
        let dir = tempfile::tempdir().unwrap();
        let cfg = vendor_config(Vendor::Wechat, "https://api.example.com", Some(dir.path()));
        let (client, _) = build(transport.clone(), &cfg).await;

        assert!(matches!(
            client.generate_qr_code(&QrCodeRequest::new("p")).await.unwrap_err(),
            Error::UnsupportedContentType(ct) if ct == "image/webp"
        ));
    }

    #[tokio::test]
    async fn transport_timeout_propagates() {
        let transport = RecordingTransport::new();
        transport.push_error(TransportError::Timeout);
        let cfg = vendor_config(Vendor::Qq, "https://qq.example.com", None);
        let (client, store) = build(transport.clone(), &cfg).await;

        assert!(matches!(
            client.access_token().await.unwrap_err(),
            Error::Transport(TransportError::Timeout)
        ));
        assert!(store.is_empty().await);
    }
}
