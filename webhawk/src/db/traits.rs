//! Repository traitパターン定義
//!
//! スナップショットの永続化と変更フィードを抽象化する。
//! クエリ層・スケジューラ・ブロードキャスト中継はこのtraitだけに依存する。

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

use crate::common::error::{ChangeFeedError, StoreError};
use crate::common::types::Snapshot;

/// 1日あたりの秒数
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// ポーリング間隔から履歴の標準取得件数を求める（1日分、切り捨て）
///
/// 間隔0（自動ポーリング無効）は呼び出し側で既定間隔に置き換えること。
pub fn history_limit_for_interval(poll_interval_secs: u64) -> u32 {
    let interval = poll_interval_secs.max(1);
    u32::try_from(SECONDS_PER_DAY / interval).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// スナップショット永続化のRepository trait
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// スナップショットを1件永続化
    ///
    /// 成功後、変更フィードへ同じ順序で流す。
    /// 永続化済みの最新より古い時刻は `StoreError::OutOfOrder` で拒否する
    /// （重なったラウンドが書き込みロックに後着した場合も同様）。
    async fn append(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
    /// 最新のスナップショットを取得（空なら `None`）
    async fn latest(&self) -> Result<Option<Snapshot>, StoreError>;
    /// 新しい順に最大 `limit` 件取得
    async fn history(&self, limit: u32) -> Result<Vec<Snapshot>, StoreError>;
    /// 購読時点以降に追加されたスナップショットのフィード
    fn changes(&self) -> ChangeFeed;
}

/// Arc でラップされたストア
pub type SharedSnapshotStore = Arc<dyn SnapshotStore>;

// ---------------------------------------------------------------------------
// ChangeFeed
// ---------------------------------------------------------------------------

/// 変更フィード
///
/// 追加順に新しいスナップショットを返す。過去分の再送はしない。
/// 読み手が遅れても書き込み側は待たず、古いものから読み飛ばされる。
pub struct ChangeFeed {
    receiver: broadcast::Receiver<Snapshot>,
    skipped: u64,
}

impl ChangeFeed {
    /// broadcast受信側からフィードを作成
    pub fn new(receiver: broadcast::Receiver<Snapshot>) -> Self {
        Self {
            receiver,
            skipped: 0,
        }
    }

    /// 次のスナップショットを待つ
    ///
    /// ストア側が破棄された場合は `ChangeFeedError::Closed`。
    pub async fn next(&mut self) -> Result<Snapshot, ChangeFeedError> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Ok(snapshot),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.skipped += n;
                    warn!(skipped = n, "Change feed consumer lagged; oldest snapshots dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(ChangeFeedError::Closed),
            }
        }
    }

    /// 遅延により読み飛ばした累計件数
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
