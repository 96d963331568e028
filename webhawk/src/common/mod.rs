//! 共通型定義

/// エラー型
pub mod error;

/// 監視結果の型
pub mod types;
