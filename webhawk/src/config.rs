//! Configuration management via CLI flags and environment variables
//!
//! Resolution order per setting: CLI flag > `WEBHAWK_*` variable >
//! legacy variable name (logged as deprecated) > default.

use crate::common::error::ConfigError;
use crate::db::traits::history_limit_for_interval;
use crate::health::prober::{validate_target, DEFAULT_CHECK_TIMEOUT_MS};
use crate::health::scheduler::{OverlapPolicy, ScheduleMode};
use axum::http::HeaderValue;
use std::str::FromStr;
use std::time::Duration;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;
/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default target list
pub const DEFAULT_URLS: &str = "http://localhost:7070/up, http://www.clianz.com/";
/// Default poll interval in seconds
pub const DEFAULT_POLL_TIME_SECS: u64 = 300;
/// Default URL cleaners
pub const DEFAULT_URL_CLEANERS: &str = "http://, https://, www.";

/// `/history?limit=` upper bound
pub const MAX_HISTORY_LIMIT: u32 = 10_000;

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use webhawk::config::get_env_with_fallback;
///
/// let port = get_env_with_fallback("WEBHAWK_PORT", "PORT");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Unlike a silent default, a value that is set but does not parse is an error.
pub fn get_env_with_fallback_parse<T: FromStr>(
    new_name: &'static str,
    old_name: &str,
) -> Result<Option<T>, ConfigError> {
    get_env_with_fallback(new_name, old_name)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: new_name,
                value: raw.clone(),
            })
        })
        .transpose()
}

/// 旧名を持たない変数の型付き読み取り
fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => {
            let parsed = value.trim().parse();
            parsed
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue { name, value })
        }
        Err(_) => Ok(None),
    }
}

fn env_flag(name: &'static str) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            match normalized.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "" | "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue { name, value }),
            }
        }
        Err(_) => Ok(false),
    }
}

/// Split a comma separated list
///
/// All whitespace is removed before splitting, so `"a, b"` and `"a,b"` are the same.
pub fn split_list(raw: &str) -> Vec<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Vec::new();
    }
    compact.split(',').map(str::to_string).collect()
}

fn default_database_url() -> String {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    format!("sqlite:{}/.webhawk/hawk.db", home)
}

/// Values given on the command line (unset fields fall back to the environment)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--host`
    pub host: Option<String>,
    /// `--port`
    pub port: Option<u16>,
    /// `--urls`
    pub urls: Option<String>,
    /// `--cors`
    pub cors: Option<String>,
    /// `--database-url`
    pub database_url: Option<String>,
    /// `--poll-time`
    pub poll_time: Option<u64>,
    /// `--url-cleaners`
    pub url_cleaners: Option<String>,
    /// `--check-timeout-ms`
    pub check_timeout_ms: Option<u64>,
    /// `--once`
    pub once: bool,
    /// `--skip-overlapping-rounds`
    pub skip_overlapping_rounds: bool,
}

/// Resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HawkConfig {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Targets in configured order
    pub targets: Vec<String>,
    /// CORS origin; `None` disables CORS headers
    pub cors_origin: Option<String>,
    /// SQLite database URL
    pub database_url: String,
    /// Poll interval in seconds (0 disables automatic rounds)
    pub poll_interval_secs: u64,
    /// Substrings removed from URLs to build friendly names, in order
    pub url_cleaners: Vec<String>,
    /// Per-check timeout
    pub check_timeout: Duration,
    /// Run a single round at startup only
    pub once: bool,
    /// What to do with a tick while a round is still running
    pub overlap: OverlapPolicy,
}

impl HawkConfig {
    /// Merge CLI overrides with the environment and validate the result.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let host = match &overrides.host {
            Some(host) => host.clone(),
            None => std::env::var("WEBHAWK_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        };
        let port = match overrides.port {
            Some(port) => port,
            None => get_env_with_fallback_parse("WEBHAWK_PORT", "PORT")?.unwrap_or(DEFAULT_PORT),
        };
        let urls = match &overrides.urls {
            Some(urls) => urls.clone(),
            None => get_env_with_fallback_or("WEBHAWK_URLS", "URLS", DEFAULT_URLS),
        };
        let cors = match &overrides.cors {
            Some(cors) => cors.clone(),
            None => get_env_with_fallback_or("WEBHAWK_CORS", "CORS", ""),
        };
        let database_url = match &overrides.database_url {
            Some(url) => url.clone(),
            None => get_env_with_fallback("WEBHAWK_DATABASE_URL", "DATABASE_URL")
                .unwrap_or_else(default_database_url),
        };
        let poll_interval_secs = match overrides.poll_time {
            Some(secs) => secs,
            None => get_env_with_fallback_parse("WEBHAWK_POLL_TIME", "POLL_TIME")?
                .unwrap_or(DEFAULT_POLL_TIME_SECS),
        };
        let cleaners = match &overrides.url_cleaners {
            Some(cleaners) => cleaners.clone(),
            None => get_env_with_fallback_or(
                "WEBHAWK_URL_CLEANERS",
                "URL_CLEANERS",
                DEFAULT_URL_CLEANERS,
            ),
        };
        let check_timeout_ms = match overrides.check_timeout_ms {
            Some(ms) => ms,
            None => env_parse("WEBHAWK_CHECK_TIMEOUT_MS")?.unwrap_or(DEFAULT_CHECK_TIMEOUT_MS),
        };
        let once = overrides.once || env_flag("WEBHAWK_POLL_ONCE")?;
        let skip = overrides.skip_overlapping_rounds || env_flag("WEBHAWK_SKIP_OVERLAPPING_ROUNDS")?;

        let cors = cors.trim();
        let config = Self {
            host,
            port,
            targets: split_list(&urls),
            cors_origin: (!cors.is_empty()).then(|| cors.to_string()),
            database_url,
            poll_interval_secs,
            url_cleaners: split_list(&cleaners)
                .into_iter()
                .filter(|c| !c.is_empty())
                .collect(),
            check_timeout: Duration::from_millis(check_timeout_ms),
            once,
            overlap: if skip {
                OverlapPolicy::Skip
            } else {
                OverlapPolicy::Allow
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that must never reach the first round.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule_mode()?;
        if self.targets.is_empty() {
            return Err(ConfigError::EmptyTargetList);
        }
        for target in &self.targets {
            validate_target(target)?;
        }
        if let Some(origin) = &self.cors_origin {
            if HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::InvalidValue {
                    name: "WEBHAWK_CORS",
                    value: origin.clone(),
                });
            }
        }
        if self.check_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "WEBHAWK_CHECK_TIMEOUT_MS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Scheduler mode derived from the poll interval and `once`.
    pub fn schedule_mode(&self) -> Result<ScheduleMode, ConfigError> {
        ScheduleMode::from_poll_secs(self.poll_interval_secs, self.once)
    }

    /// Default `/history` size: one day of rounds.
    ///
    /// When polling is disabled the default interval is used instead.
    pub fn history_limit(&self) -> u32 {
        let interval = match self.poll_interval_secs {
            0 => DEFAULT_POLL_TIME_SECS,
            secs => secs,
        };
        history_limit_for_interval(interval)
    }

    /// `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
