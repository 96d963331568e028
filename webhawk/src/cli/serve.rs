//! serve サブコマンド
//!
//! 監視サーバーを起動します。未指定の値は環境変数から解決されます。

use crate::config::ConfigOverrides;
use clap::Args;

/// serve サブコマンドの引数
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Bind address
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Comma separated list of target URLs
    #[arg(long)]
    pub urls: Option<String>,

    /// Allowed CORS origin (empty disables CORS headers)
    #[arg(long)]
    pub cors: Option<String>,

    /// Database URL
    #[arg(long)]
    pub database_url: Option<String>,

    /// Poll interval in seconds (0 disables automatic rounds)
    #[arg(long)]
    pub poll_time: Option<u64>,

    /// Comma separated substrings stripped from URLs to build names
    #[arg(long)]
    pub url_cleaners: Option<String>,

    /// Per-check timeout in milliseconds
    #[arg(long)]
    pub check_timeout_ms: Option<u64>,

    /// Run a single round at startup and do not repeat
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Skip a tick while the previous round is still running
    #[arg(long, default_value_t = false)]
    pub skip_overlapping_rounds: bool,
}

impl From<&ServeArgs> for ConfigOverrides {
    fn from(args: &ServeArgs) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            urls: args.urls.clone(),
            cors: args.cors.clone(),
            database_url: args.database_url.clone(),
            poll_time: args.poll_time,
            url_cleaners: args.url_cleaners.clone(),
            check_timeout_ms: args.check_timeout_ms,
            once: args.once,
            skip_overlapping_rounds: args.skip_overlapping_rounds,
        }
    }
}
