//! ロギング初期化
//!
//! 人が読む形式のコンソール出力を常に有効にし、`WEBHAWK_LOG_DIR` が設定されて
//! いればJSON形式の日次ローテーションファイル（`webhawk.log`）にも書き出す。

use crate::common::error::{HawkError, HawkResult};
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 既定のフィルタ
pub const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

/// ログファイル名
pub const LOG_FILE_NAME: &str = "webhawk.log";

/// コンソール出力先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    /// 標準出力（serve）
    Stdout,
    /// 標準エラー（check: 標準出力はJSON結果に使う）
    Stderr,
}

/// フィルタ文字列を決定する
///
/// `WEBHAWK_LOG_LEVEL` → `RUST_LOG` → 既定値 の順。
pub fn filter_directives() -> String {
    std::env::var("WEBHAWK_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// グローバルsubscriberを初期化
pub fn init(console: ConsoleTarget) -> HawkResult<()> {
    let env_filter = EnvFilter::try_new(filter_directives())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_writer = match console {
        ConsoleTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
        ConsoleTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let console_layer = fmt::layer().with_writer(console_writer);

    // JSON形式、日次ローテーション
    let file_layer = std::env::var("WEBHAWK_LOG_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(|dir| {
            fmt::layer()
                .with_writer(rolling::daily(dir, LOG_FILE_NAME))
                .with_ansi(false)
                .json()
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| HawkError::Internal(format!("Failed to initialize logging: {e}")))
}
