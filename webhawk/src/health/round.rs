//! 監視ラウンド
//!
//! プローブ → 集約 → ストアへの追記、までを1ラウンドとして実行する。
//! スケジューラと `/refresh` の両方から呼ばれる。

use crate::common::error::HawkResult;
use crate::common::types::Snapshot;
use crate::db::traits::SharedSnapshotStore;
use crate::health::prober::Prober;
use async_trait::async_trait;
use tracing::{error, info};

/// ラウンドを実行できるもの
///
/// スケジューラはこのtraitだけに依存する。
#[async_trait]
pub trait RoundExecutor: Send + Sync + 'static {
    /// 1ラウンド実行し、永続化したスナップショットを返す
    async fn execute_round(&self) -> HawkResult<Snapshot>;
}

/// プローバーとストアを束ねたラウンド実行器
#[derive(Clone)]
pub struct RoundRunner {
    prober: Prober,
    store: SharedSnapshotStore,
}

impl RoundRunner {
    /// 新しい実行器を作成
    pub fn new(prober: Prober, store: SharedSnapshotStore) -> Self {
        Self { prober, store }
    }

    /// プローバー
    pub fn prober(&self) -> &Prober {
        &self.prober
    }

    /// 1ラウンド実行
    ///
    /// 追記に失敗した場合はログに残してエラーを返す。再試行はしない。
    pub async fn run_round(&self) -> HawkResult<Snapshot> {
        let snapshot = self.prober.probe_round().await?;

        if let Err(e) = self.store.append(&snapshot).await {
            error!(
                timestamp = %snapshot.timestamp_rfc3339(),
                error = %e,
                "Failed to persist snapshot; round data lost"
            );
            return Err(e.into());
        }

        let alive = snapshot.alive_count();
        info!(
            timestamp = %snapshot.timestamp_rfc3339(),
            alive,
            down = snapshot.services.len() - alive,
            "Probe round completed"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl RoundExecutor for RoundRunner {
    async fn execute_round(&self) -> HawkResult<Snapshot> {
        self.run_round().await
    }
}
