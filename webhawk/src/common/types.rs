//! 監視結果の型定義
//!
//! 1ラウンド分の死活監視結果（`Snapshot`）と、ターゲット単位の結果
//! （`ServiceCheckResult`）を定義する。
//!
//! JSONの形は既存ダッシュボードとの互換のため固定している:
//!
//! ```json
//! {
//!   "Timestamp": "2026-01-01T00:00:00.000Z",
//!   "Services": [
//!     { "Name": "example.com", "Alive": true, "URL": "http://example.com", "Msec": 12.5 }
//!   ]
//! }
//! ```

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// ターゲット1件・1ラウンド分のチェック結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCheckResult {
    /// URLから導出したフレンドリー名
    #[serde(rename = "Name")]
    pub name: String,
    /// 実際にチェックしたURL
    #[serde(rename = "URL")]
    pub url: String,
    /// タイムアウト内に2xxが返った場合のみtrue
    #[serde(rename = "Alive")]
    pub alive: bool,
    /// 成功時の所要時間（ミリ秒）。失敗時は0
    #[serde(rename = "Msec")]
    pub latency_ms: f64,
}

impl ServiceCheckResult {
    /// 成功結果を作成
    pub fn alive(name: String, url: String, latency_ms: f64) -> Self {
        Self {
            name,
            url,
            alive: true,
            latency_ms,
        }
    }

    /// 失敗結果を作成（レイテンシは常に0）
    pub fn down(name: String, url: String) -> Self {
        Self {
            name,
            url,
            alive: false,
            latency_ms: 0.0,
        }
    }
}

/// 1ラウンド分のスナップショット
///
/// `timestamp` はラウンド完了時刻で、ソートキー兼ラウンドの識別子。
/// `services` の順序は結果の到着順であり、設定順とは対応しない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// ラウンド完了時刻（UTC、ミリ秒精度）
    #[serde(rename = "Timestamp", with = "rfc3339_millis")]
    pub timestamp: DateTime<Utc>,
    /// 到着順のチェック結果
    #[serde(rename = "Services")]
    pub services: Vec<ServiceCheckResult>,
}

impl Snapshot {
    /// スナップショットを作成
    ///
    /// 永続化後の値と一致させるため、時刻はミリ秒に切り詰める。
    pub fn new(timestamp: DateTime<Utc>, services: Vec<ServiceCheckResult>) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(3),
            services,
        }
    }

    /// RFC 3339 表現のタイムスタンプ
    pub fn timestamp_rfc3339(&self) -> String {
        format_timestamp(&self.timestamp)
    }

    /// 稼働中のサービス数
    pub fn alive_count(&self) -> usize {
        self.services.iter().filter(|s| s.alive).count()
    }
}

/// タイムスタンプを保存・送信用の固定形式に変換
///
/// 形式が固定なので文字列比較がそのまま時刻順になる。
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// RFC 3339 文字列をUTC時刻に変換
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

mod rfc3339_millis {
    use super::*;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
