use crate::core::collector::OutcomeCollector;
use crate::domain::model::{CanonicalRecord, Outcome, RawRecord, RunState, RunSummary};
use crate::domain::ports::{ConfigProvider, Destination, Migration, RecordSource};
use crate::utils::monitor::SystemMonitor;
use mongodb::bson;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// 同時進行中的單筆 pipeline 上限
    pub concurrency: usize,
    /// 整個執行的期限，從游標交給協調器時開始計算
    pub timeout: Option<Duration>,
    /// 連續多少筆來源錯誤視為連線中斷
    pub max_consecutive_source_errors: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 16,
            timeout: None,
            max_consecutive_source_errors: 10,
        }
    }
}

impl RunOptions {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            concurrency: config.concurrency().max(1),
            timeout: config.run_timeout(),
            max_consecutive_source_errors: config.max_consecutive_source_errors().max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    /// 失敗的記錄，供人工重放
    pub failures: Vec<Outcome>,
}

/// 驅動 Source Reader → Transformer → Idempotency Filter → Destination Writer。
///
/// 來源在協調器的 task 中依序讀取；每筆記錄先取得 worker permit 才會被讀出，
/// 因此進行中的 pipeline 數量永遠不超過 `concurrency`。
pub struct RunCoordinator<M, D> {
    migration: Arc<M>,
    destination: Arc<D>,
    options: RunOptions,
    state: Mutex<RunState>,
    monitor: SystemMonitor,
}

impl<M, D> RunCoordinator<M, D>
where
    M: Migration,
    D: Destination<M::Canonical>,
{
    pub fn new(migration: M, destination: Arc<D>, options: RunOptions) -> Self {
        Self {
            migration: Arc::new(migration),
            destination,
            options,
            state: Mutex::new(RunState::Idle),
            monitor: SystemMonitor::default(),
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transition(&self, next: RunState) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tracing::debug!("{}: {} -> {}", self.migration.name(), *state, next);
        *state = next;
        drop(state);
        self.monitor.log_phase(&format!("{} {}", self.migration.name(), next));
    }

    pub async fn run<S: RecordSource>(&self, mut source: S) -> RunReport {
        let name = self.migration.name();
        let started = Instant::now();
        let deadline = self
            .options
            .timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);

        self.transition(RunState::Running);
        tracing::info!(
            "🚀 {}: migration started (concurrency: {})",
            name,
            self.options.concurrency
        );

        let collector = OutcomeCollector::new(name);
        let permits = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks: JoinSet<Outcome> = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, String> = HashMap::new();

        let mut position = 0usize;
        let mut consecutive_source_errors = 0usize;
        let mut deadline_hit = false;
        let mut source_aborted = false;

        loop {
            if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                deadline_hit = true;
                break;
            }

            let Some(permit) = within(deadline, permits.clone().acquire_owned()).await else {
                deadline_hit = true;
                break;
            };
            let Ok(permit) = permit else {
                break;
            };

            let Some(next) = within(deadline, source.next_record()).await else {
                deadline_hit = true;
                break;
            };
            let Some(item) = next else {
                break;
            };
            position += 1;

            match item {
                Ok(raw) => {
                    consecutive_source_errors = 0;
                    let identity = raw.identity.clone();
                    let handle = tasks.spawn(process_record(
                        self.migration.clone(),
                        self.destination.clone(),
                        raw,
                        permit,
                    ));
                    in_flight.insert(handle.id(), identity);
                }
                Err(e) => {
                    drop(permit);
                    consecutive_source_errors += 1;
                    collector.record(Outcome::decode_error(format!("#{}", position), e));
                    if consecutive_source_errors >= self.options.max_consecutive_source_errors {
                        tracing::error!(
                            "🛑 {}: {} consecutive source errors, no further records admitted",
                            name,
                            consecutive_source_errors
                        );
                        source_aborted = true;
                        break;
                    }
                }
            }

            while let Some(joined) = tasks.try_join_next_with_id() {
                settle(joined, &mut in_flight, &collector);
            }
        }

        // 游標在等待 in-flight pipeline 之前就釋放
        drop(source);

        if deadline_hit {
            tracing::warn!(
                "⏰ {}: run deadline reached after {} records, draining in-flight work",
                name,
                position
            );
        }

        self.transition(RunState::Draining);
        while let Some(joined) = tasks.join_next_with_id().await {
            settle(joined, &mut in_flight, &collector);
        }
        self.transition(RunState::Done);

        let (mut summary, failures) = collector.finish();
        summary.elapsed = started.elapsed();
        summary.deadline_hit = deadline_hit;
        summary.source_aborted = source_aborted;

        tracing::info!(
            "📊 {}: {} migrated, {} skipped, {} decode errors, {} transform errors, {} write errors",
            name,
            summary.migrated,
            summary.skipped_existing,
            summary.decode_errors,
            summary.transform_errors,
            summary.write_errors
        );

        RunReport { summary, failures }
    }
}

async fn within<F: Future>(deadline: Option<tokio::time::Instant>, future: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future).await.ok(),
        None => Some(future.await),
    }
}

fn settle(
    joined: Result<(tokio::task::Id, Outcome), JoinError>,
    in_flight: &mut HashMap<tokio::task::Id, String>,
    collector: &OutcomeCollector,
) {
    match joined {
        Ok((id, outcome)) => {
            in_flight.remove(&id);
            collector.record(outcome);
        }
        Err(e) => {
            let identity = in_flight
                .remove(&e.id())
                .unwrap_or_else(|| "<unknown>".to_string());
            collector.record(Outcome::write_error(
                identity,
                None,
                format!("pipeline aborted: {}", e),
            ));
        }
    }
}

/// 單筆記錄的完整 pipeline；任何錯誤都轉成 Outcome，不會往外傳遞
async fn process_record<M, D>(
    migration: Arc<M>,
    destination: Arc<D>,
    raw: RawRecord,
    _permit: OwnedSemaphorePermit,
) -> Outcome
where
    M: Migration,
    D: Destination<M::Canonical>,
{
    let RawRecord { identity, document } = raw;

    let legacy: M::Legacy = match bson::from_document(document) {
        Ok(legacy) => legacy,
        Err(e) => return Outcome::decode_error(identity, e),
    };

    let canonical = match migration.transform(legacy) {
        Ok(canonical) => canonical,
        Err(e) => return Outcome::transform_error(identity, e),
    };

    let key = canonical.natural_key();
    match destination.exists(&key).await {
        Ok(true) => return Outcome::skipped(identity, &key),
        Ok(false) => {}
        Err(e) => {
            return Outcome::write_error(identity, Some(&key), format!("existence check failed: {}", e))
        }
    }

    match destination.write(&canonical).await {
        Ok(()) => Outcome::migrated(identity, &key),
        Err(e) => Outcome::write_error(identity, Some(&key), e),
    }
}
