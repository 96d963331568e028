//! テスト用の設定・監視対象モック

use std::time::Duration;

use tempfile::TempDir;
use webhawk::config::HawkConfig;
use webhawk::health::OverlapPolicy;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// テスト用設定（一時ディレクトリ上のSQLiteを使う）
///
/// `TempDir` はサーバーを止めるまで保持すること。
pub fn test_config(targets: Vec<String>, poll_interval_secs: u64) -> (HawkConfig, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let config = config_in(&dir, targets, poll_interval_secs);
    (config, dir)
}

/// 既存の一時ディレクトリのDBを使う設定
pub fn config_in(dir: &TempDir, targets: Vec<String>, poll_interval_secs: u64) -> HawkConfig {
    HawkConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        targets,
        cors_origin: None,
        database_url: format!("sqlite:{}", dir.path().join("hawk.db").display()),
        poll_interval_secs,
        url_cleaners: vec!["http://".to_string(), "https://".to_string()],
        check_timeout: Duration::from_millis(300),
        once: false,
        overlap: OverlapPolicy::Allow,
    }
}

/// HEADに200を返すターゲット
pub async fn healthy_target() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

/// タイムアウトより遅れて応答するターゲット
pub async fn slow_target() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    server
}
