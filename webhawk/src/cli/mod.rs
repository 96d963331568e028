//! CLI module for webhawk
//!
//! Provides the command-line interface for the monitoring service.

pub mod check;
pub mod serve;

use clap::{Parser, Subcommand};

/// Web Hawk - HTTP liveness and latency monitor with live updates
#[derive(Parser, Debug)]
#[command(name = "webhawk")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES (legacy name in parentheses):
    WEBHAWK_HOST              Bind address (default: 0.0.0.0)
    WEBHAWK_PORT              Listen port (PORT, default: 8080)
    WEBHAWK_URLS              Comma separated targets (URLS)
    WEBHAWK_CORS              Allowed CORS origin, empty disables (CORS)
    WEBHAWK_DATABASE_URL      Database URL (DATABASE_URL)
    WEBHAWK_POLL_TIME         Poll interval seconds, 0 disables (POLL_TIME, default: 300)
    WEBHAWK_URL_CLEANERS      Substrings stripped from names (URL_CLEANERS)
    WEBHAWK_CHECK_TIMEOUT_MS  Per-check timeout (default: 1000)
    WEBHAWK_POLL_ONCE         Run one round at startup only
    WEBHAWK_SKIP_OVERLAPPING_ROUNDS  Skip ticks while a round is running
    WEBHAWK_LOG_LEVEL         Log filter (RUST_LOG, default: info,sqlx=warn)
    WEBHAWK_LOG_DIR           Also write JSON logs to a daily file here
"#)]
pub struct Cli {
    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the monitoring server
    Serve(serve::ServeArgs),
    /// Run one probe round and print the snapshot as JSON
    Check(check::CheckArgs),
}
