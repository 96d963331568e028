//! ラウンドスケジューラ
//!
//! 設定に応じて3つのモードのいずれかで動作する:
//!
//! - `Disabled`: 自動実行しない（`/refresh` によるオンデマンドのみ）
//! - `Once`: 起動直後に1回だけ実行
//! - `Every`: 起動直後に1回実行し、以後は固定間隔で繰り返す
//!
//! 各ラウンドは独立したタスクで実行するため、ラウンドが間隔より長引いても
//! 次のティックは発火し、ラウンドが重なり得る（既定動作）。
//! `OverlapPolicy::Skip` を指定した場合のみ、実行中のラウンドがあるティックを読み飛ばす。

use crate::common::error::ConfigError;
use crate::health::round::RoundExecutor;
use crate::shutdown::ShutdownController;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// 有効なポーリング間隔の最小値（秒）
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;

/// スケジュールモード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// 自動実行しない
    Disabled,
    /// 起動時に1回だけ
    Once,
    /// 起動時 + 固定間隔
    Every(Duration),
}

impl ScheduleMode {
    /// ポーリング間隔（秒）と単発フラグからモードを決定
    ///
    /// 間隔1〜4秒は設定エラー。単発フラグは間隔より優先する。
    pub fn from_poll_secs(poll_secs: u64, once: bool) -> Result<Self, ConfigError> {
        if (1..MIN_POLL_INTERVAL_SECS).contains(&poll_secs) {
            return Err(ConfigError::InvalidPollInterval(poll_secs));
        }
        Ok(match (once, poll_secs) {
            (true, _) => Self::Once,
            (false, 0) => Self::Disabled,
            (false, secs) => Self::Every(Duration::from_secs(secs)),
        })
    }
}

/// ラウンド重複時の扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// 重複を許す
    #[default]
    Allow,
    /// 実行中のラウンドがあればそのティックを読み飛ばす
    Skip,
}

/// ラウンドスケジューラ
pub struct RoundScheduler<E: RoundExecutor> {
    executor: Arc<E>,
    mode: ScheduleMode,
    overlap: OverlapPolicy,
    shutdown: ShutdownController,
    in_flight: Arc<AtomicUsize>,
}

impl<E: RoundExecutor> RoundScheduler<E> {
    /// 新しいスケジューラを作成
    pub fn new(
        executor: Arc<E>,
        mode: ScheduleMode,
        overlap: OverlapPolicy,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            executor,
            mode,
            overlap,
            shutdown,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// スケジューラが起動した実行中ラウンド数
    pub fn rounds_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// スケジューラを起動
    ///
    /// `Disabled` の場合はタスクを起動せず `None` を返す。
    pub fn start(self) -> Option<JoinHandle<()>> {
        match self.mode {
            ScheduleMode::Disabled => {
                info!("Automatic polling disabled; rounds run on demand only");
                None
            }
            ScheduleMode::Once => Some(tokio::spawn(async move {
                info!("Running a single probe round");
                self.spawn_round().await.ok();
            })),
            ScheduleMode::Every(period) => Some(tokio::spawn(self.poll_loop(period))),
        }
    }

    /// 定期実行ループ
    async fn poll_loop(self, period: Duration) {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = period.as_secs(),
            overlap = ?self.overlap,
            "Round scheduler started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.wait() => {
                    info!("Round scheduler stopped");
                    break;
                }
                // 最初のティックは即時に発火する
                _ = timer.tick() => {
                    if self.overlap == OverlapPolicy::Skip && self.rounds_in_flight() > 0 {
                        info!(in_flight = self.rounds_in_flight(), "Previous round still running; tick skipped");
                        continue;
                    }
                    // 完了は待たない
                    drop(self.spawn_round());
                }
            }
        }
    }

    /// ラウンドを独立したタスクで起動
    fn spawn_round(&self) -> JoinHandle<()> {
        let executor = self.executor.clone();
        let guard = InFlightGuard::enter(self.in_flight.clone());
        tokio::spawn(async move {
            // パニック時も解放される
            let _guard = guard;
            match executor.execute_round().await {
                Ok(snapshot) => {
                    debug!(timestamp = %snapshot.timestamp_rfc3339(), "Scheduled round finished")
                }
                // 失敗してもタイマーは止めない
                Err(e) => error!(error = %e, "Scheduled round failed"),
            }
        })
    }
}

/// 実行中ラウンド数のカウンタを保持する間だけ加算する
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
