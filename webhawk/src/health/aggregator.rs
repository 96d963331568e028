//! ラウンド集約
//!
//! 1ラウンド分の結果をちょうどN件受け取り、1つの `Snapshot` を組み立てる。
//! N件目を受け取った時刻がスナップショットのタイムスタンプになる。
//! チェックの実行やストアへの書き込みは行わない。

use crate::common::error::AggregateError;
use crate::common::types::{ServiceCheckResult, Snapshot};
use chrono::{DateTime, Utc};

/// ラウンド集約器
#[derive(Debug)]
pub struct RoundAggregator {
    expected: usize,
    services: Vec<ServiceCheckResult>,
    completed_at: Option<DateTime<Utc>>,
}

impl RoundAggregator {
    /// N件（ターゲット数）を期待する集約器を作成
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            services: Vec::with_capacity(expected),
            completed_at: None,
        }
    }

    /// 期待件数
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// 受信済み件数
    pub fn received(&self) -> usize {
        self.services.len()
    }

    /// N件揃ったか
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// 結果を1件追加
    ///
    /// N件目の追加でラウンドが完了し `true` を返す。N件を超える追加はエラー。
    pub fn push(&mut self, result: ServiceCheckResult) -> Result<bool, AggregateError> {
        if self.services.len() >= self.expected {
            return Err(AggregateError::Overflow {
                expected: self.expected,
            });
        }
        self.services.push(result);
        if self.services.len() == self.expected {
            self.completed_at = Some(Utc::now());
        }
        Ok(self.is_complete())
    }

    /// スナップショットを組み立てる
    ///
    /// 件数不足の場合は部分的なスナップショットを返さずエラーにする。
    pub fn finish(self) -> Result<Snapshot, AggregateError> {
        match self.completed_at {
            Some(completed_at) => Ok(Snapshot::new(completed_at, self.services)),
            None => Err(AggregateError::Incomplete {
                expected: self.expected,
                received: self.services.len(),
            }),
        }
    }
}
