//! CLI 服務名稱到遷移執行的對應。
//!
//! 連線在這裡建立後注入協調器；協調器本身不知道連線字串。

use crate::adapters::memory::MemoryDestination;
use crate::adapters::mongo::{MongoSource, MongoStore};
use crate::adapters::mysql::{MySqlEntity, MySqlStore};
use crate::app::migrations::{BlogMigration, Bot, BotMigration, PartnerMigration, PostMigration, UserMigration};
use crate::config::toml_config::MigrationConfig;
use crate::core::coordinator::{RunCoordinator, RunOptions, RunReport};
use crate::domain::ports::{Destination, Migration};
use crate::utils::error::{MigrateError, Result};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 命令列可選的服務；`social` 依序執行四個社群遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Service {
    #[default]
    Bots,
    Posts,
    Users,
    Partners,
    Blogs,
    Social,
}

/// 單一遷移；每個都是獨立的協調器執行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
    Bots,
    Posts,
    Users,
    Partners,
    Blogs,
}

impl MigrationKind {
    pub fn is_relational(self) -> bool {
        !matches!(self, MigrationKind::Bots)
    }
}

impl Service {
    pub fn steps(self) -> Vec<MigrationKind> {
        match self {
            Service::Bots => vec![MigrationKind::Bots],
            Service::Posts => vec![MigrationKind::Posts],
            Service::Users => vec![MigrationKind::Users],
            Service::Partners => vec![MigrationKind::Partners],
            Service::Blogs => vec![MigrationKind::Blogs],
            Service::Social => vec![
                MigrationKind::Posts,
                MigrationKind::Users,
                MigrationKind::Partners,
                MigrationKind::Blogs,
            ],
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Bots => "bots",
            Service::Posts => "posts",
            Service::Users => "users",
            Service::Partners => "partners",
            Service::Blogs => "blogs",
            Service::Social => "social",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceOptions {
    /// 寫入記憶體目的地，不連線到目的端
    pub dry_run: bool,
    pub monitor: bool,
}

/// 服務中途失敗；已完成的遷移報告仍然保留，讓呼叫端可以印出
#[derive(Debug)]
pub struct ServiceFailure {
    pub completed: Vec<RunReport>,
    pub error: MigrateError,
}

impl From<MigrateError> for ServiceFailure {
    fn from(error: MigrateError) -> Self {
        Self {
            completed: Vec::new(),
            error,
        }
    }
}

struct Stores {
    source: MongoStore,
    documents: Option<MongoStore>,
    relational: Option<MySqlStore>,
}

impl Stores {
    async fn connect(steps: &[MigrationKind], config: &MigrationConfig, options: &ServiceOptions) -> Result<Self> {
        let timeout = config.connect_timeout();
        let source = MongoStore::connect("source", &config.source.uri, timeout).await?;

        let mut documents = None;
        let mut relational = None;
        if !options.dry_run {
            if steps.contains(&MigrationKind::Bots) {
                let uri = config.destination_mongodb_uri();
                documents = Some(if uri == config.source.uri {
                    source.clone()
                } else {
                    MongoStore::connect("destination", uri, timeout).await?
                });
            }
            if steps.iter().any(|step| step.is_relational()) {
                let max_connections = u32::try_from(config.run.concurrency).unwrap_or(u32::MAX);
                relational = Some(MySqlStore::connect(config.require_mysql_uri()?, timeout, max_connections).await?);
            }
        }

        Ok(Self {
            source,
            documents,
            relational,
        })
    }
}

/// 依序執行服務包含的所有遷移，回傳每個遷移的報告
pub async fn run_service(
    service: Service,
    config: &MigrationConfig,
    options: &ServiceOptions,
) -> std::result::Result<Vec<RunReport>, ServiceFailure> {
    let steps = service.steps();
    tracing::info!("📋 Service '{}' runs {} migration(s)", service, steps.len());
    if options.dry_run {
        tracing::info!("🧪 Dry run: records are written to memory only");
    }

    let stores = Stores::connect(&steps, config, options).await?;

    let monitor = options.monitor;
    let shared = &stores;
    let result = run_steps(steps, move |step| run_step(step, config, shared, monitor)).await;

    close(&stores).await;
    result
}

/// 任何一步失敗即停止後續步驟，已完成的報告隨錯誤一起回傳
async fn run_steps<F, Fut>(
    steps: Vec<MigrationKind>,
    mut run: F,
) -> std::result::Result<Vec<RunReport>, ServiceFailure>
where
    F: FnMut(MigrationKind) -> Fut,
    Fut: Future<Output = Result<RunReport>>,
{
    let mut completed = Vec::with_capacity(steps.len());
    for step in steps {
        match run(step).await {
            Ok(report) => completed.push(report),
            Err(error) => {
                tracing::error!("🛑 {:?} could not run; {} migration(s) completed before it", step, completed.len());
                return Err(ServiceFailure { completed, error });
            }
        }
    }
    Ok(completed)
}

async fn close(stores: &Stores) {
    if let Some(store) = &stores.relational {
        store.close().await;
    }
}

async fn run_step(step: MigrationKind, config: &MigrationConfig, stores: &Stores, monitor: bool) -> Result<RunReport> {
    let social = &config.social;
    match step {
        MigrationKind::Bots => {
            let bots = &config.bots;
            let source = stores.source.open_source(&bots.database, &bots.source_collection).await?;
            Ok(match &stores.documents {
                Some(store) => {
                    let destination = store.destination::<Bot>(&bots.database, &bots.target_collection);
                    execute(BotMigration, source, Arc::new(destination), config, monitor).await
                }
                None => execute(BotMigration, source, Arc::new(MemoryDestination::new()), config, monitor).await,
            })
        }
        MigrationKind::Posts => run_relational(PostMigration, &social.posts_collection, config, stores, monitor).await,
        MigrationKind::Users => run_relational(UserMigration, &social.users_collection, config, stores, monitor).await,
        MigrationKind::Partners => {
            run_relational(PartnerMigration, &social.partners_collection, config, stores, monitor).await
        }
        MigrationKind::Blogs => run_relational(BlogMigration, &social.blogs_collection, config, stores, monitor).await,
    }
}

async fn run_relational<M>(
    migration: M,
    collection: &str,
    config: &MigrationConfig,
    stores: &Stores,
    monitor: bool,
) -> Result<RunReport>
where
    M: Migration,
    M::Canonical: MySqlEntity + Clone,
{
    let source = stores.source.open_source(&config.social.database, collection).await?;
    Ok(match &stores.relational {
        Some(store) => {
            let destination = store.destination::<M::Canonical>();
            execute(migration, source, Arc::new(destination), config, monitor).await
        }
        None => execute(migration, source, Arc::new(MemoryDestination::new()), config, monitor).await,
    })
}

async fn execute<M, D>(
    migration: M,
    source: MongoSource,
    destination: Arc<D>,
    config: &MigrationConfig,
    monitor: bool,
) -> RunReport
where
    M: Migration,
    D: Destination<M::Canonical>,
{
    RunCoordinator::new(migration, destination, RunOptions::from_config(config))
        .with_monitoring(monitor)
        .run(source)
        .await
}
