//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! 個々のターゲットのチェック失敗はエラーではなくデータ
//! （`ServiceCheckResult::alive == false`）として扱うため、ここには現れない。

use axum::http::StatusCode;
use thiserror::Error;

/// Configuration error (fatal before the first round)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Poll interval between 1 and 4 seconds
    #[error("Service poll time invalid: {0}s. Must be 0 (disabled) or 5 seconds or more")]
    InvalidPollInterval(u64),

    /// No target configured
    #[error("Target list is empty")]
    EmptyTargetList,

    /// Target that is not an absolute http(s) URL
    #[error("Invalid target {target:?}: {reason}")]
    InvalidTarget {
        /// Raw entry as configured
        target: String,
        /// Why it was rejected
        reason: String,
    },

    /// Value that could not be parsed
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Setting name
        name: &'static str,
        /// Raw value
        value: String,
    },
}

/// Snapshot store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Database file could not be prepared
    #[error("Failed to prepare database path: {0}")]
    Io(#[from] std::io::Error),

    /// Append older than the newest persisted snapshot
    ///
    /// Overlapping rounds stamp their timestamp before taking the writer lock,
    /// so a round finishing a millisecond earlier can still reach the store
    /// second. That round is rejected here and its results are not stored.
    #[error("Snapshot {timestamp} is older than the latest persisted snapshot {latest}")]
    OutOfOrder {
        /// Rejected snapshot timestamp
        timestamp: String,
        /// Newest persisted timestamp
        latest: String,
    },

    /// Stored row could not be decoded
    #[error("Corrupt snapshot row: {0}")]
    Corrupt(String),
}

/// Change feed error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChangeFeedError {
    /// The store side of the feed is gone
    #[error("Change feed closed")]
    Closed,
}

/// Round assembly error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// Fewer results than targets
    #[error("Round incomplete: expected {expected} results, got {received}")]
    Incomplete {
        /// Target count
        expected: usize,
        /// Results collected
        received: usize,
    },

    /// More results than targets
    #[error("Round overflow: expected {expected} results")]
    Overflow {
        /// Target count
        expected: usize,
    },
}

/// Web Hawk error type
#[derive(Debug, Error)]
pub enum HawkError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Change feed error
    #[error(transparent)]
    ChangeFeed(#[from] ChangeFeedError),

    /// Round assembly error
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HawkError {
    /// Returns a safe error message for external clients.
    ///
    /// Full details (database paths, SQL errors) only go to the server log.
    pub fn external_message(&self) -> &'static str {
        match self {
            Self::Config(_) => "Invalid configuration",
            Self::Store(StoreError::OutOfOrder { .. }) => "Snapshot rejected",
            Self::Store(_) => "Database error",
            Self::ChangeFeed(_) => "Live update feed unavailable",
            Self::Aggregate(_) => "Incomplete probe round",
            Self::Internal(_) => "Internal server error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::OutOfOrder { .. }) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ChangeFeed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Aggregate(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias
pub type HawkResult<T> = Result<T, HawkError>;
