use std::sync::Arc;

use anyhow::Context;
use importer_core::{format_failure_report, format_rejected_report, parse_args, BatchConfig};
use importer_engine::{default_pipeline, BatchRunner, EngineConfig, ExecutionMode};
use importer_logging::{importer_info, importer_warn, LogSettings};

use super::effects::ProgressReporter;

const USAGE: &str = "usage: html2docx-import [--parallel[=true|false]] [--concurrency=N] \
[--retries=N] [--retry-delay=MS] [--transformer-dir=PATH] url|outputPath|transformerPath ...";

pub fn run_app() -> anyhow::Result<()> {
    importer_logging::initialize(&LogSettings::from_env());

    let config = parse_args(std::env::args().skip(1));
    if config.jobs.is_empty() {
        importer_warn!("No jobs given");
        print_rejected(&config);
        eprintln!("{USAGE}");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(run_batch(config))
}

fn engine_config(config: &BatchConfig) -> EngineConfig {
    EngineConfig {
        transformer_base_dir: config.transformer_dir.clone(),
        ..EngineConfig::with_retry(config.retry)
    }
}

fn print_rejected(config: &BatchConfig) {
    if let Some(text) = format_rejected_report(&config.rejected) {
        eprintln!("{text}");
    }
}

async fn run_batch(config: BatchConfig) -> anyhow::Result<()> {
    let reporter = Arc::new(ProgressReporter::new(&config));
    let pipeline = default_pipeline(&engine_config(&config), reporter.clone())
        .context("failed to set up the HTTP client")?;
    let mode = ExecutionMode::from_config(&config);

    importer_info!(
        "Importing {} job(s), mode={:?}, retries={}, delay={:?}",
        config.jobs.len(),
        mode,
        config.retry.max_retries,
        config.retry.delay
    );
    let report = BatchRunner::new(Arc::new(pipeline))
        .run(&config.jobs, mode)
        .await;
    reporter.finish();

    print_rejected(&config);
    if let Some(text) = format_failure_report(&report.failures) {
        eprintln!("{text}");
    }
    Ok(())
}
