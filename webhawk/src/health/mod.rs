//! 死活監視エンジン
//!
//! 全ターゲットへの並列プローブ、ラウンド集約、定期実行を担う。

pub mod aggregator;
pub mod prober;
pub mod round;
pub mod scheduler;

pub use prober::Prober;
pub use round::{RoundExecutor, RoundRunner};
pub use scheduler::{OverlapPolicy, RoundScheduler, ScheduleMode};
