//! 変更フィード中継
//!
//! ストアの変更フィードを読み続け、ブロードキャスターへ流すバックグラウンドタスク。
//! フィードが閉じた場合はエラーで終了する（ライブ更新経路の喪失は致命的）。

use super::SharedBroadcaster;
use crate::common::error::ChangeFeedError;
use crate::db::traits::{ChangeFeed, SharedSnapshotStore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 中継タスクを起動
///
/// フィードの購読はこの呼び出しの時点で行うため、以降の追加を取りこぼさない。
pub fn spawn_change_relay(
    store: SharedSnapshotStore,
    broadcaster: SharedBroadcaster,
) -> JoinHandle<Result<(), ChangeFeedError>> {
    let feed = store.changes();
    // ストア本体を保持しない（フィードの寿命はストア側が決める）
    drop(store);
    tokio::spawn(relay_loop(feed, broadcaster))
}

async fn relay_loop(
    mut feed: ChangeFeed,
    broadcaster: SharedBroadcaster,
) -> Result<(), ChangeFeedError> {
    info!("Change feed relay started");
    loop {
        match feed.next().await {
            Ok(snapshot) => {
                let timestamp = snapshot.timestamp_rfc3339();
                let delivered = broadcaster.publish(snapshot);
                debug!(%timestamp, delivered, "Snapshot broadcast");
            }
            Err(e) => {
                error!(error = %e, skipped = feed.skipped(), "Change feed relay stopped");
                return Err(e);
            }
        }
    }
}
