use async_trait::async_trait;
use doc_migrate::adapters::{MemoryDestination, MemorySource};
use doc_migrate::app::migrations::{Bot, BotMigration};
use doc_migrate::core::{Destination, NaturalKey, OutcomeKind, RawRecord, RecordSource, RunState};
use doc_migrate::{MigrateError, Result, RunCoordinator, RunOptions};
use mongodb::bson::{doc, Document};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn bot(i: usize) -> Document {
    let votes = i as i64;
    doc! {
        "botID": i.to_string(),
        "username": format!("bot{}", i),
        "discrim": "0001",
        "votes": [votes],
    }
}

fn bots(n: usize) -> Vec<Document> {
    (1..=n).map(bot).collect()
}

fn options(concurrency: usize) -> RunOptions {
    RunOptions {
        concurrency,
        ..RunOptions::default()
    }
}

/// 拒絕特定 id 的寫入，其餘交給記憶體目的地
struct RejectingDestination {
    inner: MemoryDestination<Bot>,
    reject: &'static str,
}

#[async_trait]
impl Destination<Bot> for RejectingDestination {
    async fn exists(&self, key: &NaturalKey) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn write(&self, record: &Bot) -> Result<()> {
        if record.id == self.reject {
            return Err(MigrateError::WriteRejected {
                key: record.id.clone(),
                message: "constraint violation".to_string(),
            });
        }
        self.inner.write(record).await
    }
}

/// 記錄同時寫入中的最大數量
#[derive(Default)]
struct GaugeDestination {
    current: AtomicUsize,
    peak: AtomicUsize,
    written: AtomicUsize,
}

#[async_trait]
impl Destination<Bot> for GaugeDestination {
    async fn exists(&self, _key: &NaturalKey) -> Result<bool> {
        Ok(false)
    }

    async fn write(&self, _record: &Bot) -> Result<()> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.written.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct PanickingDestination {
    inner: MemoryDestination<Bot>,
    panic_on: &'static str,
}

#[async_trait]
impl Destination<Bot> for PanickingDestination {
    async fn exists(&self, key: &NaturalKey) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn write(&self, record: &Bot) -> Result<()> {
        if record.id == self.panic_on {
            panic!("destination driver crashed");
        }
        self.inner.write(record).await
    }
}

/// 每筆記錄之間都有延遲的來源
struct SlowSource {
    inner: MemorySource,
    delay: Duration,
}

#[async_trait]
impl RecordSource for SlowSource {
    async fn next_record(&mut self) -> Option<Result<RawRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.next_record().await
    }
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let mut documents = bots(10);
    // 第 5 筆型別錯誤，第 8 筆被目的地拒絕
    documents[4].insert("username", 12345);
    let destination = Arc::new(RejectingDestination {
        inner: MemoryDestination::new(),
        reject: "8",
    });

    let coordinator = RunCoordinator::new(BotMigration, destination.clone(), options(4));
    let report = coordinator.run(MemorySource::new(documents)).await;
    let summary = &report.summary;

    assert_eq!(summary.migrated, 8);
    assert_eq!(summary.decode_errors, 1);
    assert_eq!(summary.write_errors, 1);
    assert_eq!(summary.transform_errors, 0);
    assert_eq!(summary.processed, 10);
    assert_eq!(summary.total_outcomes(), 10);
    assert_eq!(summary.exit_code(false), 0);
    assert_eq!(summary.exit_code(true), 1);

    assert_eq!(destination.inner.len().await, 8);
    assert!(destination.inner.get(&NaturalKey::new("id", "5")).await.is_none());
    assert!(destination.inner.get(&NaturalKey::new("id", "8")).await.is_none());

    let mut failed: Vec<_> = report
        .failures
        .iter()
        .map(|outcome| (outcome.kind, outcome.identity.clone()))
        .collect();
    failed.sort_by(|a, b| a.1.cmp(&b.1));
    assert_eq!(
        failed,
        vec![
            (OutcomeKind::DecodeError, "#5".to_string()),
            (OutcomeKind::WriteError, "#8".to_string()),
        ]
    );
    assert_eq!(coordinator.state(), RunState::Done);
}

#[tokio::test]
async fn test_second_run_skips_everything() {
    let destination = Arc::new(MemoryDestination::<Bot>::new());

    let first = RunCoordinator::new(BotMigration, destination.clone(), options(8))
        .run(MemorySource::new(bots(10)))
        .await;
    assert_eq!(first.summary.migrated, 10);

    let second = RunCoordinator::new(BotMigration, destination.clone(), options(8))
        .run(MemorySource::new(bots(10)))
        .await;
    assert_eq!(second.summary.migrated, 0);
    assert_eq!(second.summary.skipped_existing, 10);
    assert!(second.failures.is_empty());
    assert_eq!(destination.len().await, 10);
}

#[tokio::test]
async fn test_in_flight_never_exceeds_concurrency() {
    let destination = Arc::new(GaugeDestination::default());

    let report = RunCoordinator::new(BotMigration, destination.clone(), options(4))
        .run(MemorySource::new(bots(200)))
        .await;

    assert_eq!(report.summary.migrated, 200);
    assert_eq!(destination.written.load(Ordering::SeqCst), 200);
    let peak = destination.peak.load(Ordering::SeqCst);
    assert!((1..=4).contains(&peak), "peak in-flight writes was {}", peak);
}

#[tokio::test]
async fn test_every_record_produces_one_outcome() {
    let mut documents = bots(6);
    documents[1].remove("botID");
    documents[2].insert("discrim", "");
    documents.push(bot(1));

    let report = RunCoordinator::new(BotMigration, Arc::new(MemoryDestination::<Bot>::new()), options(1))
        .run(MemorySource::from_results(
            documents
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err("corrupt BSON".to_string())))
                .collect(),
        ))
        .await;
    let summary = &report.summary;

    assert_eq!(summary.processed, 8);
    assert_eq!(summary.total_outcomes(), 8);
    assert_eq!(summary.transform_errors, 2);
    assert_eq!(summary.decode_errors, 1);
    // 重複的 id 1 在循序執行時由冪等檢查跳過
    assert_eq!(summary.skipped_existing, 1);
    assert_eq!(summary.migrated, 4);
    assert_eq!(report.failures.len(), summary.failures());
}

#[tokio::test]
async fn test_panicking_pipeline_is_counted() {
    let destination = Arc::new(PanickingDestination {
        inner: MemoryDestination::new(),
        panic_on: "3",
    });

    let report = RunCoordinator::new(BotMigration, destination.clone(), options(2))
        .run(MemorySource::new(bots(5)))
        .await;

    assert_eq!(report.summary.migrated, 4);
    assert_eq!(report.summary.write_errors, 1);
    assert_eq!(report.summary.total_outcomes(), 5);
    assert_eq!(report.failures[0].identity, "#3");
}

#[tokio::test]
async fn test_deadline_stops_admitting_records() {
    let source = SlowSource {
        inner: MemorySource::new(bots(100)),
        delay: Duration::from_millis(20),
    };
    let options = RunOptions {
        concurrency: 4,
        timeout: Some(Duration::from_millis(150)),
        ..RunOptions::default()
    };

    let report = RunCoordinator::new(BotMigration, Arc::new(MemoryDestination::<Bot>::new()), options)
        .run(source)
        .await;
    let summary = &report.summary;

    assert!(summary.deadline_hit);
    assert!(!summary.source_aborted);
    assert!(summary.processed > 0);
    assert!(summary.processed < 100);
    assert_eq!(summary.total_outcomes(), summary.processed);
    assert_eq!(summary.migrated, summary.processed);
}

#[tokio::test]
async fn test_consecutive_source_errors_abort_run() {
    let items = (0..12).map(|i| Err(format!("cursor failure {}", i))).collect();
    let options = RunOptions {
        concurrency: 4,
        timeout: None,
        max_consecutive_source_errors: 3,
    };

    let report = RunCoordinator::new(BotMigration, Arc::new(MemoryDestination::<Bot>::new()), options)
        .run(MemorySource::from_results(items))
        .await;

    assert!(report.summary.source_aborted);
    assert_eq!(report.summary.decode_errors, 3);
    assert_eq!(report.summary.processed, 3);
}

#[tokio::test]
async fn test_interleaved_source_errors_do_not_abort() {
    let items = vec![
        Err("blip".to_string()),
        Err("blip".to_string()),
        Ok(bot(1)),
        Err("blip".to_string()),
        Err("blip".to_string()),
        Ok(bot(2)),
    ];
    let options = RunOptions {
        concurrency: 2,
        timeout: None,
        max_consecutive_source_errors: 3,
    };

    let report = RunCoordinator::new(BotMigration, Arc::new(MemoryDestination::<Bot>::new()), options)
        .run(MemorySource::from_results(items))
        .await;

    assert!(!report.summary.source_aborted);
    assert_eq!(report.summary.migrated, 2);
    assert_eq!(report.summary.decode_errors, 4);
}

#[tokio::test]
async fn test_empty_source_finishes_cleanly() {
    let coordinator = RunCoordinator::new(BotMigration, Arc::new(MemoryDestination::<Bot>::new()), options(4));
    assert_eq!(coordinator.state(), RunState::Idle);

    let report = coordinator.run(MemorySource::new(Vec::new())).await;
    assert_eq!(report.summary.processed, 0);
    assert!(!report.summary.has_failures());
    assert_eq!(coordinator.state(), RunState::Done);
    assert!(report
        .summary
        .summary_line()
        .starts_with("Conversion done. Processed 0 documents in "));
}
