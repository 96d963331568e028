//! Integration Test: 参照API
//!
//! `/up` `/history` `/refresh` の振る舞いを実サーバーで検証する。

use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::support::hawk::{healthy_target, slow_target, test_config};
use crate::support::http::{get_json, spawn_hawk};

/// ポーリング無効時はオンデマンド実行まで何も保存されない
#[tokio::test]
async fn test_disabled_polling_waits_for_refresh() {
    let ok = healthy_target().await;
    let slow = slow_target().await;
    let targets = vec![format!("{}/up", ok.uri()), format!("{}/", slow.uri())];
    let (config, _dir) = test_config(targets.clone(), 0);
    let server = spawn_hawk(config).await;

    assert_eq!(get_json(&server.url("/up")).await, Value::Null);
    assert_eq!(get_json(&server.url("/history")).await, Value::Array(vec![]));

    let resp = Client::new()
        .post(server.url("/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let refreshed: Value = resp.json().await.unwrap();

    let services = refreshed["Services"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    let ok_entry = services.iter().find(|s| s["URL"] == targets[0]).unwrap();
    assert_eq!(ok_entry["Alive"], true);
    assert!(ok_entry["Msec"].as_f64().unwrap() > 0.0);
    assert!(!ok_entry["Name"].as_str().unwrap().starts_with("http://"));
    let slow_entry = services.iter().find(|s| s["URL"] == targets[1]).unwrap();
    assert_eq!(slow_entry["Alive"], false);
    assert_eq!(slow_entry["Msec"], 0.0);

    assert_eq!(get_json(&server.url("/up")).await, refreshed);
    let history = get_json(&server.url("/history")).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    server.stop().await.unwrap();
}

/// 履歴は新しい順で、limitで件数を絞れる
#[tokio::test]
async fn test_history_order_and_limit() {
    let ok = healthy_target().await;
    let (config, _dir) = test_config(vec![format!("{}/up", ok.uri())], 0);
    let server = spawn_hawk(config).await;
    let client = Client::new();

    let mut stamps = Vec::new();
    for _ in 0..3 {
        let snapshot: Value = client
            .post(server.url("/refresh"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        stamps.push(snapshot["Timestamp"].as_str().unwrap().to_string());
    }

    let history = get_json(&server.url("/history?limit=2")).await;
    let got: Vec<_> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["Timestamp"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(got, vec![stamps[2].clone(), stamps[1].clone()]);

    // 0 は 1 件に丸める
    let history = get_json(&server.url("/history?limit=0")).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    let resp = client
        .get(server.url("/history?limit=lots"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.stop().await.unwrap();
}

/// 起動直後に1ラウンド実行される
#[tokio::test]
async fn test_startup_round_is_persisted() {
    let ok = healthy_target().await;
    let (config, _dir) = test_config(vec![format!("{}/up", ok.uri())], 300);
    let server = spawn_hawk(config).await;

    let latest = crate::support::http::wait_for_latest(&server, std::time::Duration::from_secs(5)).await;
    assert_eq!(latest["Services"][0]["Alive"], true);
    assert!(latest["Timestamp"].as_str().unwrap().ends_with('Z'));

    server.stop().await.unwrap();
}

/// 再起動後も保存済みのスナップショットを返す
#[tokio::test]
async fn test_snapshots_survive_restart() {
    let ok = healthy_target().await;
    let dir = tempfile::tempdir().unwrap();
    let targets = vec![format!("{}/up", ok.uri())];

    let server = spawn_hawk(crate::support::hawk::config_in(&dir, targets.clone(), 0)).await;
    let saved: Value = Client::new()
        .post(server.url("/refresh"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    server.stop().await.unwrap();

    let server = spawn_hawk(crate::support::hawk::config_in(&dir, targets, 0)).await;
    assert_eq!(get_json(&server.url("/up")).await, saved);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_healthz() {
    let ok = healthy_target().await;
    let (config, _dir) = test_config(vec![format!("{}/up", ok.uri())], 0);
    let server = spawn_hawk(config).await;

    let body = reqwest::get(server.url("/healthz"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");

    server.stop().await.unwrap();
}
