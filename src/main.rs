use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;

use ops_review::analyzers::default_analyzers;
use ops_review::cli::Args;
use ops_review::config::AppConfig;
use ops_review::infrastructure::logging::setup_logging;
use ops_review::instance::api::{HttpInstanceApi, InstanceApi};
use ops_review::instance::InstanceContext;
use ops_review::models::AnalyzerStatus;
use ops_review::orchestrator::Orchestrator;
use ops_review::report::{FileReportAssembler, ReportFormat};
use ops_review::storage::backends::BackendType;
use ops_review::storage::ResultStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    apply_cli_overrides(&mut config, &args)?;
    config.validate()?;
    setup_logging(&config.logging)?;

    let instance = InstanceContext::from_arn(
        &config.instance.instance_arn,
        config.instance.log_group.clone(),
    )?;
    let api: Arc<dyn InstanceApi> = Arc::new(HttpInstanceApi::new(
        &config.instance.api_base_url,
        &instance.instance_id,
    ));
    let store = Arc::new(ResultStore::from_settings(&config.storage).await?);
    let orchestrator = Orchestrator::new(
        store,
        default_analyzers(api),
        instance,
        config.orchestrator.clone(),
    );
    let assembler = FileReportAssembler::from_settings(&config.report);

    let days_back = args.days_back.unwrap_or(config.general.default_days_back);
    println!("🔍 Starting operational review (window: last {days_back} days)...");

    let (outcome, artifact) = orchestrator.run_review(days_back, &assembler).await?;

    println!(
        "✅ Review {} resolved: {} succeeded, {} failed",
        artifact.review_id,
        outcome.run.succeeded_count(),
        outcome.run.failed_count()
    );
    for (component, status) in outcome.run.statuses() {
        if *status != AnalyzerStatus::Succeeded {
            println!("  ⚠️  {}: {}", component.title(), status);
        }
    }
    println!("📄 Report written to: {}", artifact.location.display());

    Ok(())
}

fn apply_cli_overrides(config: &mut AppConfig, args: &Args) -> Result<()> {
    if let Some(level) = args.log_level() {
        config.logging.level = level.to_string();
    }
    if let Some(output) = &args.output {
        config.report.output_dir = output.clone();
    }
    if let Some(format) = &args.format {
        config.report.format = match format.as_str() {
            "markdown" | "md" => ReportFormat::Markdown,
            "json" => ReportFormat::Json,
            other => bail!("unsupported report format: {other} (expected markdown or json)"),
        };
    }
    if let Some(backend) = &args.backend {
        config.storage.backend = match backend.as_str() {
            "object-store" => BackendType::ObjectStore,
            "key-value-table" => BackendType::KeyValueTable,
            other => bail!(
                "unsupported storage backend: {other} (expected object-store or key-value-table)"
            ),
        };
    }
    Ok(())
}
