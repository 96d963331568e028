//! Integration Test: CORSヘッダー

use reqwest::Client;

use crate::support::hawk::{healthy_target, test_config};
use crate::support::http::spawn_hawk;

#[tokio::test]
async fn test_configured_origin_is_allowed_with_credentials() {
    let ok = healthy_target().await;
    let (mut config, _dir) = test_config(vec![format!("{}/up", ok.uri())], 0);
    config.cors_origin = Some("http://dashboard.test".to_string());
    let server = spawn_hawk(config).await;

    let resp = Client::new()
        .get(server.url("/up"))
        .header("origin", "http://dashboard.test")
        .send()
        .await
        .unwrap();
    let headers = resp.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://dashboard.test"
    );
    assert_eq!(
        headers.get("access-control-allow-credentials").unwrap(),
        "true"
    );

    // 事前リクエストも同じオリジンを返す
    let preflight = Client::new()
        .request(reqwest::Method::OPTIONS, server.url("/history"))
        .header("origin", "http://dashboard.test")
        .header("access-control-request-method", "GET")
        .send()
        .await
        .unwrap();
    assert!(preflight.status().is_success());
    assert_eq!(
        preflight
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://dashboard.test"
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_no_cors_headers_when_unconfigured() {
    let ok = healthy_target().await;
    let (config, _dir) = test_config(vec![format!("{}/up", ok.uri())], 0);
    let server = spawn_hawk(config).await;

    let resp = Client::new()
        .get(server.url("/up"))
        .header("origin", "http://dashboard.test")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());
    assert!(resp
        .headers()
        .get("access-control-allow-credentials")
        .is_none());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_wildcard_origin_is_served_without_credentials() {
    let ok = healthy_target().await;
    let (mut config, _dir) = test_config(vec![format!("{}/up", ok.uri())], 0);
    config.cors_origin = Some("*".to_string());
    config.validate().unwrap();
    let server = spawn_hawk(config).await;

    let resp = Client::new()
        .get(server.url("/up"))
        .header("origin", "http://anywhere.test")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert!(resp
        .headers()
        .get("access-control-allow-credentials")
        .is_none());

    server.stop().await.unwrap();
}
