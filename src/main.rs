use anyhow::Context;
use clap::Parser;
use doc_migrate::core::ConfigProvider;
use doc_migrate::utils::error::{ErrorSeverity, MigrateError};
use doc_migrate::utils::{logger, validation::Validate};
use doc_migrate::{run_service, CliConfig, MigrationConfig, RunReport, ServiceFailure};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // .env 只補上尚未設定的環境變數
    dotenvy::dotenv().ok();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting doc-migrate");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let (reports, strict) = match execute(&cli).await {
        Ok(result) => result,
        Err(ServiceFailure { completed, error }) => {
            // 中途失敗前已完成的遷移照常回報
            print_reports(&completed, cli.summary_json).context("failed to print run summaries")?;
            let code = report_failure(&error);
            if code != 0 {
                std::process::exit(code);
            }
            return Ok(());
        }
    };

    print_reports(&reports, cli.summary_json).context("failed to print run summaries")?;

    let code = reports
        .iter()
        .map(|report| report.summary.exit_code(strict))
        .max()
        .unwrap_or(0);
    if code != 0 {
        tracing::warn!("⚠️ Strict mode: at least one record failed");
        std::process::exit(code);
    }
    Ok(())
}

async fn execute(cli: &CliConfig) -> Result<(Vec<RunReport>, bool), ServiceFailure> {
    let mut config = MigrationConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let reports = run_service(cli.service(), &config, &cli.service_options()).await?;
    Ok((reports, config.strict()))
}

fn print_reports(reports: &[RunReport], as_json: bool) -> anyhow::Result<()> {
    for report in reports {
        println!("{}", report.summary.summary_line());
        if as_json {
            println!("{}", serde_json::to_string(&report.summary)?);
        }
        if report.summary.deadline_hit {
            println!("⏰ {}: run deadline reached, remaining records were not read", report.summary.migration);
        }
        if report.summary.source_aborted {
            println!("🛑 {}: source failed repeatedly, run was cut short", report.summary.migration);
        }
    }
    Ok(())
}

fn report_failure(e: &MigrateError) -> i32 {
    tracing::error!(
        "❌ Migration failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    if e.is_retryable() {
        tracing::info!("🔁 Re-running is safe: records that were already written will be skipped");
    }

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
