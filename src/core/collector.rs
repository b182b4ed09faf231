use crate::domain::model::{Outcome, OutcomeKind, RunSummary};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 所有 worker 共用的 Outcome 收集器。
///
/// 計數放在 mutex 內，處理筆數用原子計數；兩者都只在回報結果時短暫鎖定。
#[derive(Debug)]
pub struct OutcomeCollector {
    summary: Mutex<RunSummary>,
    failures: Mutex<Vec<Outcome>>,
    processed: AtomicUsize,
}

impl OutcomeCollector {
    pub fn new(migration: &str) -> Self {
        Self {
            summary: Mutex::new(RunSummary::new(migration)),
            failures: Mutex::new(Vec::new()),
            processed: AtomicUsize::new(0),
        }
    }

    pub fn record(&self, outcome: Outcome) {
        log_outcome(&outcome);

        self.summary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(outcome.kind);

        if outcome.kind.is_failure() {
            self.failures
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(outcome);
        }

        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.summary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .count(kind)
    }

    /// 結束收集，回傳彙總與失敗清單
    pub fn finish(self) -> (RunSummary, Vec<Outcome>) {
        let mut summary = self
            .summary
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        summary.processed = self.processed.into_inner();
        let failures = self
            .failures
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (summary, failures)
    }
}

fn log_outcome(outcome: &Outcome) {
    let key = outcome.key.as_deref().unwrap_or("-");
    let detail = outcome.detail.as_deref().unwrap_or("");
    match outcome.kind {
        OutcomeKind::Migrated => {
            tracing::debug!(identity = %outcome.identity, key, "✅ migrated");
        }
        OutcomeKind::SkippedExisting => {
            tracing::debug!(identity = %outcome.identity, key, "⏭️ already migrated, skipped");
        }
        OutcomeKind::DecodeError => {
            tracing::warn!(identity = %outcome.identity, error = detail, "❌ could not decode document");
        }
        OutcomeKind::TransformError => {
            tracing::warn!(identity = %outcome.identity, error = detail, "❌ document failed validation");
        }
        OutcomeKind::WriteError => {
            tracing::error!(identity = %outcome.identity, key, error = detail, "❌ write failed");
        }
    }
}
