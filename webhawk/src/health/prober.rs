//! ターゲットプローバー
//!
//! 設定された全ターゲットへ並列にHEADリクエストを送り、結果を1か所に集めて
//! `Snapshot` を組み立てる。
//!
//! - 2xx → `alive=true`、リクエスト開始から応答までの経過時間を記録
//! - 2xx以外・通信エラー・タイムアウト → `alive=false, latency=0`
//!
//! 個々の失敗はデータとして記録し、ラウンドを中断しない。
//! 結果の順序は完了順であり、入力順とは対応しない。

use crate::common::error::{AggregateError, ConfigError, HawkError, HawkResult};
use crate::common::types::{ServiceCheckResult, Snapshot};
use crate::health::aggregator::RoundAggregator;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// チェック1件のデフォルトタイムアウト（ミリ秒）
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 1000;

/// URLからフレンドリー名を導出する
///
/// 設定順にクリーナー文字列をすべて取り除く。クリーナーが無ければURLそのもの。
pub fn derive_name(url: &str, cleaners: &[String]) -> String {
    cleaners
        .iter()
        .filter(|c| !c.is_empty())
        .fold(url.to_string(), |name, cleaner| name.replace(cleaner.as_str(), ""))
}

/// ターゲット文字列を検証
///
/// 絶対URLかつ `http` / `https` のみ受け付ける。
pub fn validate_target(raw: &str) -> Result<(), ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::InvalidTarget {
            target: raw.to_string(),
            reason: "empty entry".to_string(),
        });
    }
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidTarget {
        target: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidTarget {
            target: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// 監視対象1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    /// チェックするURL（設定値そのまま）
    pub url: String,
    /// フレンドリー名
    pub name: String,
}

/// ターゲットプローバー
#[derive(Clone)]
pub struct Prober {
    client: Client,
    targets: Arc<[ProbeTarget]>,
    timeout: Duration,
}

impl Prober {
    /// 新しいプローバーを作成
    ///
    /// ターゲット一覧が空、または解析できないエントリを含む場合はエラー。
    pub fn new(targets: &[String], cleaners: &[String], timeout: Duration) -> HawkResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HawkError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, targets, cleaners, timeout)?)
    }

    /// 既存のHTTPクライアントでプローバーを作成
    pub fn with_client(
        client: Client,
        targets: &[String],
        cleaners: &[String],
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if targets.is_empty() {
            return Err(ConfigError::EmptyTargetList);
        }
        let targets = targets
            .iter()
            .map(|url| {
                validate_target(url)?;
                Ok(ProbeTarget {
                    url: url.clone(),
                    name: derive_name(url, cleaners),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            client,
            targets: targets.into(),
            timeout,
        })
    }

    /// 監視対象一覧（設定順）
    pub fn targets(&self) -> &[ProbeTarget] {
        &self.targets
    }

    /// チェック1件のタイムアウト
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 1ラウンド実行
    ///
    /// ターゲットごとにタスクを起動し、ターゲット数で容量を確保したチャネルに
    /// 結果を流す。ちょうどN件を回収してからスナップショットを返す。
    pub async fn probe_round(&self) -> Result<Snapshot, AggregateError> {
        let expected = self.targets.len();
        let (tx, mut rx) = mpsc::channel::<(usize, ServiceCheckResult)>(expected);

        for (index, target) in self.targets.iter().enumerate() {
            let tx = tx.clone();
            let client = self.client.clone();
            let target = target.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                let result = check_target(&client, &target, timeout).await;
                // 受信側は全件受け取るまで閉じない
                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        let mut aggregator = RoundAggregator::new(expected);
        let mut reported = vec![false; expected];
        while let Some((index, result)) = rx.recv().await {
            reported[index] = true;
            aggregator.push(result)?;
        }

        // 結果を送らずに終了したタスク（panic等）は失敗として補完する
        for (index, seen) in reported.into_iter().enumerate() {
            if !seen {
                let target = &self.targets[index];
                warn!(url = %target.url, "Check task ended without a result");
                aggregator.push(ServiceCheckResult::down(
                    target.name.clone(),
                    target.url.clone(),
                ))?;
            }
        }

        aggregator.finish()
    }
}

/// ターゲット1件をチェック
async fn check_target(client: &Client, target: &ProbeTarget, timeout: Duration) -> ServiceCheckResult {
    let start = Instant::now();
    // クライアント側タイムアウトに加え、名前解決等も含めて上限を掛ける
    let outcome = tokio::time::timeout(timeout, client.head(&target.url).send()).await;

    match outcome {
        Ok(Ok(response)) if response.status().is_success() => {
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            debug!(url = %target.url, latency_ms, "Check succeeded");
            ServiceCheckResult::alive(target.name.clone(), target.url.clone(), latency_ms)
        }
        Ok(Ok(response)) => {
            warn!(url = %target.url, status = %response.status(), "Check failed");
            ServiceCheckResult::down(target.name.clone(), target.url.clone())
        }
        Ok(Err(e)) => {
            warn!(url = %target.url, error = %e, "Check failed");
            ServiceCheckResult::down(target.name.clone(), target.url.clone())
        }
        Err(_) => {
            warn!(url = %target.url, timeout_ms = timeout.as_millis() as u64, "Check timed out");
            ServiceCheckResult::down(target.name.clone(), target.url.clone())
        }
    }
}
