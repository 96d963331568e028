//! 統合テスト用サポートユーティリティ

pub mod hawk;
pub mod http;
