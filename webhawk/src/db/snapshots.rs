//! スナップショットのストレージ層
//!
//! SQLiteベースの追記専用ストア。1スナップショットは `snapshots` の1行と
//! `service_results` のN行として1トランザクションで書き込む。
//!
//! 書き込みはライターロックで直列化し、タイムスタンプの単調性を保証する。
//! 変更フィードへの送信もロック内で行うため、フィード順は追記順と一致する。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::traits::{ChangeFeed, SnapshotStore};
use crate::common::error::StoreError;
use crate::common::types::{format_timestamp, parse_timestamp, ServiceCheckResult, Snapshot};

/// 変更フィードのチャネル容量
const FEED_CHANNEL_CAPACITY: usize = 256;

/// SQLiteスナップショットストア
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
    /// 永続化済みの最新タイムスタンプ（ライターロックを兼ねる）
    writer: Mutex<Option<DateTime<Utc>>>,
    feed: broadcast::Sender<Snapshot>,
}

impl SqliteSnapshotStore {
    /// 新しいストアを作成
    ///
    /// 単調性チェックのため、既存の最新タイムスタンプを読み込む。
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        let latest: Option<String> = sqlx::query_scalar("SELECT MAX(timestamp) FROM snapshots")
            .fetch_one(&pool)
            .await?;
        let latest = latest
            .map(|raw| parse_timestamp(&raw).map_err(|e| StoreError::Corrupt(e.to_string())))
            .transpose()?;
        let (feed, _) = broadcast::channel(FEED_CHANNEL_CAPACITY);

        Ok(Self {
            pool,
            writer: Mutex::new(latest),
            feed,
        })
    }

    /// 接続プール
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_recent(&self, limit: u32) -> Result<Vec<Snapshot>, StoreError> {
        let rows = sqlx::query_as::<_, SnapshotResultRow>(
            r#"
            SELECT s.id AS snapshot_id, s.timestamp AS timestamp,
                   r.position AS position, r.name AS name, r.url AS url,
                   r.alive AS alive, r.latency_ms AS latency_ms
            FROM (
                SELECT id, timestamp FROM snapshots
                ORDER BY timestamp DESC, id DESC
                LIMIT ?
            ) s
            LEFT JOIN service_results r ON r.snapshot_id = s.id
            ORDER BY s.timestamp DESC, s.id DESC, r.position ASC
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        group_rows(rows)
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn append(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut latest = self.writer.lock().await;
        if let Some(prev) = *latest {
            if snapshot.timestamp < prev {
                return Err(StoreError::OutOfOrder {
                    timestamp: snapshot.timestamp_rfc3339(),
                    latest: format_timestamp(&prev),
                });
            }
        }

        let mut tx = self.pool.begin().await?;
        let snapshot_id = sqlx::query("INSERT INTO snapshots (timestamp) VALUES (?)")
            .bind(snapshot.timestamp_rfc3339())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        for (position, service) in snapshot.services.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO service_results (snapshot_id, position, name, url, alive, latency_ms)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(snapshot_id)
            .bind(position as i64)
            .bind(&service.name)
            .bind(&service.url)
            .bind(service.alive)
            .bind(service.latency_ms)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        *latest = Some(snapshot.timestamp);
        // 購読者がいない場合の送信失敗は無視する
        let receivers = self.feed.send(snapshot.clone()).unwrap_or(0);
        debug!(
            snapshot_id,
            timestamp = %snapshot.timestamp_rfc3339(),
            receivers,
            "Snapshot appended"
        );
        Ok(())
    }

    async fn latest(&self) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.fetch_recent(1).await?.into_iter().next())
    }

    async fn history(&self, limit: u32) -> Result<Vec<Snapshot>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.fetch_recent(limit).await
    }

    fn changes(&self) -> ChangeFeed {
        ChangeFeed::new(self.feed.subscribe())
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotResultRow {
    snapshot_id: i64,
    timestamp: String,
    position: Option<i64>,
    name: Option<String>,
    url: Option<String>,
    alive: Option<bool>,
    latency_ms: Option<f64>,
}

/// JOIN結果をスナップショット単位にまとめる（行は並び順のまま）
fn group_rows(rows: Vec<SnapshotResultRow>) -> Result<Vec<Snapshot>, StoreError> {
    let mut snapshots: Vec<Snapshot> = Vec::new();
    let mut current_id: Option<i64> = None;

    for row in rows {
        if current_id != Some(row.snapshot_id) {
            let timestamp = parse_timestamp(&row.timestamp)
                .map_err(|e| StoreError::Corrupt(format!("snapshot {}: {}", row.snapshot_id, e)))?;
            snapshots.push(Snapshot::new(timestamp, Vec::new()));
            current_id = Some(row.snapshot_id);
        }
        // LEFT JOINで結果の無いスナップショット
        if row.position.is_none() {
            continue;
        }
        let service = match (row.name, row.url, row.alive, row.latency_ms) {
            (Some(name), Some(url), Some(alive), Some(latency_ms)) => ServiceCheckResult {
                name,
                url,
                alive,
                latency_ms,
            },
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "snapshot {}: incomplete service row",
                    row.snapshot_id
                )))
            }
        };
        if let Some(last) = snapshots.last_mut() {
            last.services.push(service);
        }
    }

    Ok(snapshots)
}
