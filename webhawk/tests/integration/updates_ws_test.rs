//! Integration Test: リアルタイム配信
//!
//! `/ws` に接続したクライアントが、以降に保存されたスナップショットを
//! `updateEvent` として受け取ることを検証する。

use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::support::hawk::{healthy_target, test_config};
use crate::support::http::spawn_hawk;

type WsRead = futures::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
>;

async fn next_json(read: &mut WsRead) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), read.next())
        .await
        .expect("Timeout waiting for message")
        .expect("No message received")
        .expect("Message error");
    match msg {
        Message::Text(text) => serde_json::from_str(&text).expect("Invalid JSON"),
        other => panic!("Expected text message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_subscriber_receives_new_snapshots() {
    let ok = healthy_target().await;
    let (config, _dir) = test_config(vec![format!("{}/up", ok.uri())], 0);
    let server = spawn_hawk(config).await;

    let (ws_stream, _) = connect_async(server.ws_url())
        .await
        .expect("Failed to connect to WebSocket");
    let (write, mut read) = ws_stream.split();

    let welcome = next_json(&mut read).await;
    assert_eq!(welcome["type"], "connected");
    assert_eq!(welcome["channel"], "updates");

    let refreshed: Value = Client::new()
        .post(server.url("/refresh"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let event = next_json(&mut read).await;
    assert_eq!(event["type"], "updateEvent");
    assert_eq!(event["data"], refreshed);

    drop(write);
    drop(read);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_every_subscriber_gets_each_update_in_order() {
    let ok = healthy_target().await;
    let (config, _dir) = test_config(vec![format!("{}/up", ok.uri())], 0);
    let server = spawn_hawk(config).await;

    let mut readers = Vec::new();
    let mut writers = Vec::new();
    for _ in 0..3 {
        let (ws_stream, _) = connect_async(server.ws_url()).await.unwrap();
        let (write, mut read) = ws_stream.split();
        assert_eq!(next_json(&mut read).await["type"], "connected");
        writers.push(write);
        readers.push(read);
    }

    let client = Client::new();
    let mut stamps = Vec::new();
    for _ in 0..2 {
        let snapshot: Value = client
            .post(server.url("/refresh"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        stamps.push(snapshot["Timestamp"].clone());
    }

    for read in readers.iter_mut() {
        assert_eq!(next_json(read).await["data"]["Timestamp"], stamps[0]);
        assert_eq!(next_json(read).await["data"]["Timestamp"], stamps[1]);
    }

    drop(writers);
    drop(readers);
    server.stop().await.unwrap();
}

/// 接続前のスナップショットは再送されない
#[tokio::test]
async fn test_late_subscriber_gets_no_replay() {
    let ok = healthy_target().await;
    let (config, _dir) = test_config(vec![format!("{}/up", ok.uri())], 0);
    let server = spawn_hawk(config).await;
    let client = Client::new();

    client.post(server.url("/refresh")).send().await.unwrap();
    // 中継タスクが配信し終えるのを待つ
    tokio::time::sleep(Duration::from_millis(200)).await;

    let (ws_stream, _) = connect_async(server.ws_url()).await.unwrap();
    let (write, mut read) = ws_stream.split();
    assert_eq!(next_json(&mut read).await["type"], "connected");

    let nothing = tokio::time::timeout(Duration::from_millis(300), read.next()).await;
    assert!(nothing.is_err(), "unexpected replayed message");

    drop(write);
    drop(read);
    server.stop().await.unwrap();
}
