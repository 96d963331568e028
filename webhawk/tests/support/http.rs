use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::{net::TcpListener, task::JoinHandle};
use webhawk::common::error::HawkResult;
use webhawk::config::HawkConfig;
use webhawk::shutdown::ShutdownController;

/// 実ポートで起動したWeb Hawkサーバー
pub struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownController,
    handle: JoinHandle<HawkResult<()>>,
}

#[allow(dead_code)]
impl TestServer {
    /// サーバーがバインドしているアドレスを返す
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://addr{path}`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// `ws://addr/ws`
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// サーバーを停止し、終了結果を返す
    pub async fn stop(self) -> HawkResult<()> {
        self.shutdown.request_shutdown();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
    }
}

/// 設定どおりにWeb Hawkを起動する（ポートは自動割り当て）
pub async fn spawn_hawk(config: HawkConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownController::default();
    let handle = tokio::spawn(webhawk::server::serve(
        config,
        listener,
        shutdown.clone(),
    ));

    wait_until_ready(addr).await;
    TestServer {
        addr,
        shutdown,
        handle,
    }
}

async fn wait_until_ready(addr: SocketAddr) {
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("http://{addr}/healthz")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server on {addr} did not become ready");
}

/// GETしてJSONを返す
#[allow(dead_code)]
pub async fn get_json(url: &str) -> Value {
    let resp = reqwest::get(url).await.unwrap();
    assert!(resp.status().is_success(), "GET {url} -> {}", resp.status());
    resp.json().await.unwrap()
}

/// `/up` が空でなくなるまで待つ
#[allow(dead_code)]
pub async fn wait_for_latest(server: &TestServer, timeout: Duration) -> Value {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let latest = get_json(&server.url("/up")).await;
        if !latest.is_null() {
            return latest;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "no snapshot within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
