//! Web Hawk
//!
//! 設定されたHTTPエンドポイントを定期的に死活・レイテンシ監視し、
//! ラウンドごとのスナップショットを保存してリアルタイムに配信するサーバー

#![warn(missing_docs)]

/// 共通型定義・エラー型
pub mod common;

/// REST API / WebSocketハンドラー
pub mod api;

/// CLIインターフェース
pub mod cli;

/// 設定管理（CLI・環境変数）
pub mod config;

/// データベースアクセス
pub mod db;

/// 更新ブロードキャスト
pub mod events;

/// 死活監視エンジン（プローブ・集約・スケジューリング）
pub mod health;

/// ロギング初期化ユーティリティ
pub mod logging;

/// サーバー組み立て・起動
pub mod server;

/// Graceful shutdown 制御
pub mod shutdown;

use crate::db::traits::SharedSnapshotStore;
use crate::events::SharedBroadcaster;
use crate::health::RoundRunner;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// スナップショットストア
    pub store: SharedSnapshotStore,
    /// 更新ブロードキャスター
    pub broadcaster: SharedBroadcaster,
    /// オンデマンド実行用のラウンド実行器
    pub rounds: RoundRunner,
    /// `/history` の既定件数
    pub history_limit: u32,
    /// CORSで許可するオリジン（`None` で無効）
    pub cors_origin: Option<String>,
}
