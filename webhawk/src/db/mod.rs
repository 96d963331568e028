//! データベースアクセス層
//!
//! SQLiteベースのスナップショット永続化

/// データベース初期化とマイグレーション
pub mod migrations;

/// SQLiteスナップショットストア
pub mod snapshots;

/// Repository trait定義
pub mod traits;
