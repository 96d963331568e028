//! 監視結果の参照API
//!
//! - `GET /up`: 最新スナップショット（未取得なら `null`）
//! - `GET /history`: 新しい順のスナップショット一覧
//! - `POST /refresh`: 1ラウンドをその場で実行
//! - `GET /healthz`: プロセスの生存確認

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::error::AppError;
use crate::common::types::Snapshot;
use crate::config::MAX_HISTORY_LIMIT;
use crate::AppState;

/// `/history` のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// 取得件数（1〜10000に丸める）
    pub limit: Option<u32>,
}

impl HistoryQuery {
    /// 実際に使う件数
    pub fn effective_limit(&self, default_limit: u32) -> u32 {
        match self.limit {
            Some(limit) => limit.clamp(1, MAX_HISTORY_LIMIT),
            None => default_limit,
        }
    }
}

/// GET /up
pub async fn latest(State(state): State<AppState>) -> Result<Json<Option<Snapshot>>, AppError> {
    Ok(Json(state.store.latest().await?))
}

/// GET /history
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Snapshot>>, AppError> {
    let limit = query.effective_limit(state.history_limit);
    Ok(Json(state.store.history(limit).await?))
}

/// POST /refresh
///
/// 自動ポーリング無効時のオンデマンド実行口。結果は通常のラウンドと同様に
/// 永続化され、購読者へも配信される。
pub async fn refresh(State(state): State<AppState>) -> Result<Json<Snapshot>, AppError> {
    Ok(Json(state.rounds.run_round().await?))
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}
