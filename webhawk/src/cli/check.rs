//! check subcommand
//!
//! Runs one probe round without persistence and prints the snapshot.

use crate::common::error::{HawkError, HawkResult};
use crate::common::types::Snapshot;
use crate::config::{ConfigOverrides, HawkConfig};
use crate::health::Prober;
use clap::Args;

/// Arguments for the check subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Comma separated list of target URLs
    #[arg(long)]
    pub urls: Option<String>,

    /// Comma separated substrings stripped from URLs to build names
    #[arg(long)]
    pub url_cleaners: Option<String>,

    /// Per-check timeout in milliseconds
    #[arg(long)]
    pub check_timeout_ms: Option<u64>,
}

impl From<&CheckArgs> for ConfigOverrides {
    fn from(args: &CheckArgs) -> Self {
        Self {
            urls: args.urls.clone(),
            url_cleaners: args.url_cleaners.clone(),
            check_timeout_ms: args.check_timeout_ms,
            // 単発実行なのでポーリング設定は評価しない
            poll_time: Some(0),
            ..Default::default()
        }
    }
}

/// Run a single round against the configured targets.
pub async fn run_check(args: &CheckArgs) -> HawkResult<Snapshot> {
    let config = HawkConfig::resolve(&ConfigOverrides::from(args))?;
    let prober = Prober::new(&config.targets, &config.url_cleaners, config.check_timeout)?;
    Ok(prober.probe_round().await?)
}

/// Execute the check command
///
/// Down targets are reported in the output, not as a failure.
pub async fn execute(args: &CheckArgs) -> HawkResult<()> {
    let snapshot = run_check(args).await?;
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| HawkError::Internal(format!("Failed to encode snapshot: {e}")))?;
    println!("{json}");
    Ok(())
}
