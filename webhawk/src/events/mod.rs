//! 更新ブロードキャスター
//!
//! 永続化済みのスナップショットを、接続中の全購読者へリアルタイムに配信する。
//! 購読者は単一の論理チャネル（"updates"）に参加する。
//!
//! 配信はベストエフォート。参加前のイベントは再送しない。
//! 切断済みの購読者への配信は黙って捨てる。

pub mod relay;

use crate::common::types::Snapshot;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// ブロードキャストのチャネル容量
const UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// 論理チャネル名
pub const UPDATES_CHANNEL: &str = "updates";

/// 購読者に送信されるイベント
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum UpdateEvent {
    /// 新しいスナップショット
    #[serde(rename = "updateEvent")]
    Update(Snapshot),
}

/// チャネルへの参加（接続1本分）
///
/// 接続の寿命の間だけ保持し、切断時に `Broadcaster::leave` へ返す。
pub struct Subscription {
    id: Uuid,
    receiver: broadcast::Receiver<UpdateEvent>,
}

impl Subscription {
    /// 購読ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 次のイベントを待つ
    pub async fn recv(&mut self) -> Result<UpdateEvent, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}

/// 更新ブロードキャスター
///
/// 参加・離脱は送信と独立しており、送信が遅い購読者を待つことはない。
#[derive(Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<UpdateEvent>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    /// 新しいブロードキャスターを作成
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// "updates" チャネルに参加
    pub fn join(&self) -> Subscription {
        let subscription = Subscription {
            id: Uuid::new_v4(),
            receiver: self.sender.subscribe(),
        };
        debug!(
            subscription_id = %subscription.id,
            channel = UPDATES_CHANNEL,
            subscribers = self.subscriber_count(),
            "Subscriber joined"
        );
        subscription
    }

    /// チャネルから離脱
    pub fn leave(&self, subscription: Subscription) {
        let id = subscription.id;
        drop(subscription);
        debug!(
            subscription_id = %id,
            channel = UPDATES_CHANNEL,
            subscribers = self.subscriber_count(),
            "Subscriber left"
        );
    }

    /// 現在参加中の全購読者へ配信
    ///
    /// 購読者がいない場合でもエラーにはならない。配信先の数を返す。
    pub fn publish(&self, snapshot: Snapshot) -> usize {
        // 購読者がいない場合は送信に失敗するが、無視する
        self.sender.send(UpdateEvent::Update(snapshot)).unwrap_or(0)
    }

    /// 現在の購読者数を取得
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Arc でラップされたブロードキャスター
pub type SharedBroadcaster = Arc<Broadcaster>;

/// 共有可能なブロードキャスターを作成
pub fn create_shared_broadcaster() -> SharedBroadcaster {
    Arc::new(Broadcaster::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::ServiceCheckResult;
    use chrono::{TimeZone, Utc};
    use tokio::sync::broadcast::error::TryRecvError;

    fn snapshot(secs: u32) -> Snapshot {
        Snapshot::new(
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, secs).unwrap(),
            vec![ServiceCheckResult::alive(
                "a.test".to_string(),
                "http://a.test".to_string(),
                4.0,
            )],
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_every_joined_subscriber() {
        let broadcaster = Broadcaster::new();
        let mut first = broadcaster.join();
        let mut second = broadcaster.join();

        assert_eq!(broadcaster.publish(snapshot(1)), 2);

        assert_eq!(first.recv().await.unwrap(), UpdateEvent::Update(snapshot(1)));
        assert_eq!(second.recv().await.unwrap(), UpdateEvent::Update(snapshot(1)));
    }

    #[tokio::test]
    async fn test_late_joiner_gets_nothing_retroactively() {
        let broadcaster = Broadcaster::new();
        let _early = broadcaster.join();
        broadcaster.publish(snapshot(1));

        let mut late = broadcaster.join();
        assert!(matches!(late.receiver.try_recv(), Err(TryRecvError::Empty)));

        broadcaster.publish(snapshot(2));
        assert_eq!(late.recv().await.unwrap(), UpdateEvent::Update(snapshot(2)));
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let broadcaster = Broadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(broadcaster.publish(snapshot(1)), 0);
    }

    #[test]
    fn test_leave_removes_subscriber() {
        let broadcaster = Broadcaster::new();
        let a = broadcaster.join();
        let b = broadcaster.join();
        assert_ne!(a.id(), b.id());
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.leave(a);
        assert_eq!(broadcaster.subscriber_count(), 1);
        assert_eq!(broadcaster.publish(snapshot(3)), 1);

        broadcaster.leave(b);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_update_event_wire_format() {
        let json = serde_json::to_value(UpdateEvent::Update(snapshot(5))).unwrap();
        assert_eq!(json["type"], "updateEvent");
        assert_eq!(json["data"]["Timestamp"], "2026-02-01T00:00:05.000Z");
        assert_eq!(json["data"]["Services"][0]["Name"], "a.test");
    }

    #[tokio::test]
    async fn test_concurrent_join_leave_while_publishing() {
        let broadcaster = create_shared_broadcaster();
        let publisher = {
            let broadcaster = broadcaster.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    broadcaster.publish(snapshot(i % 60));
                    tokio::task::yield_now().await;
                }
            })
        };
        let mut joiners = Vec::new();
        for _ in 0..10 {
            let broadcaster = broadcaster.clone();
            joiners.push(tokio::spawn(async move {
                let sub = broadcaster.join();
                tokio::task::yield_now().await;
                broadcaster.leave(sub);
            }));
        }
        publisher.await.unwrap();
        for j in joiners {
            j.await.unwrap();
        }
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
