use crate::app::services::{Service, ServiceOptions};
use crate::config::toml_config::MigrationConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "doc-migrate")]
#[command(about = "Migrate legacy MongoDB collections into their canonical stores")]
pub struct CliConfig {
    /// 要執行的服務；未指定時為 bots
    #[arg(value_enum)]
    pub service: Option<Service>,

    #[arg(long, help = "TOML config file (defaults to ./migrate.toml when present)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Maximum number of records in flight")]
    pub concurrency: Option<usize>,

    #[arg(long, help = "Stop admitting records after this many seconds")]
    pub timeout_seconds: Option<u64>,

    #[arg(long, help = "Exit non-zero when any record fails")]
    pub strict: bool,

    #[arg(long, help = "Transform without writing to the destination")]
    pub dry_run: bool,

    #[arg(long, help = "Print each run summary as JSON")]
    pub summary_json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Log process memory and CPU at each run phase")]
    pub monitor: bool,
}

impl CliConfig {
    pub fn service(&self) -> Service {
        self.service.unwrap_or_default()
    }

    /// 命令列參數優先於配置檔
    pub fn apply_overrides(&self, config: &mut MigrationConfig) {
        if let Some(concurrency) = self.concurrency {
            config.run.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout_seconds {
            config.run.timeout_seconds = Some(timeout);
        }
        if self.strict {
            config.run.strict = true;
        }
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            dry_run: self.dry_run,
            monitor: self.monitor,
        }
    }
}
