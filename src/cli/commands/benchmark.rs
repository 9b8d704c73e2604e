//! Benchmark command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cli::{BenchmarkArgs, StrategyArg};
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use genbench_backend::BackendClient;
use genbench_core::SessionId;
use genbench_exporters::{ConsoleExporter, CsvExporter, Exporter, JsonExporter, PrometheusExporter};
use genbench_metrics::SchedulerMetricsAggregator;
use genbench_scheduler::{
    AsyncConstant, AsyncPoisson, Concurrent, FileRequestSource, RequestSource, SchedulerConfig,
    SchedulingStrategy, Synchronous, SyntheticPromptSource, Throughput,
};

use super::write_output;

fn build_strategy(args: &BenchmarkArgs) -> Box<dyn SchedulingStrategy> {
    match args.strategy {
        StrategyArg::Synchronous => Box::new(Synchronous),
        StrategyArg::Concurrent => Box::new(Concurrent { streams: args.concurrency.unwrap_or(1) }),
        StrategyArg::Throughput => Box::new(Throughput),
        StrategyArg::Constant => Box::new(AsyncConstant::new(args.rate.unwrap_or(1.0))),
        StrategyArg::Poisson => Box::new(AsyncPoisson::new(args.rate.unwrap_or(1.0))),
    }
}

fn export(format: &str, output: &Option<std::path::PathBuf>, metrics: &genbench_metrics::AggregatedMetrics) -> Result<()> {
    let rendered = match format {
        "json" => JsonExporter::pretty().export(metrics)?,
        "csv" => CsvExporter::new().export(metrics)?,
        "prometheus" => PrometheusExporter::new().export(metrics)?,
        "console" => ConsoleExporter::new().export(metrics)?,
        other => anyhow::bail!("unknown output format: {other} (expected json, csv, prometheus, or console)"),
    };
    write_output(&rendered, output).context("failed to write benchmark output")
}

/// Run the benchmark command
pub async fn run(args: BenchmarkArgs, mut settings: Settings, json_output: bool, quiet: bool) -> Result<()> {
    info!("Starting benchmark command");

    settings.target = args.target.clone();
    settings.model = args.model.clone();
    if args.api_key.is_some() {
        settings.api_key = args.api_key.clone();
    }
    settings.scheduler.request_timeout = Some(Duration::from_secs(args.timeout));
    if let Some(max_concurrency) = args.concurrency {
        settings.scheduler.max_concurrency = Some(max_concurrency);
    }
    settings.validate().context("configuration validation failed")?;

    let client = Arc::new(BackendClient::new(settings.to_backend_config()));
    let strategy = build_strategy(&args);
    let strategy_name = strategy.name().to_string();

    if !quiet && !json_output {
        println!(
            "{} Benchmarking {} with model {} using the {} strategy",
            "=>".bright_cyan().bold(),
            args.target.bright_yellow(),
            args.model.bright_green(),
            strategy_name.bright_white().bold()
        );
        println!();
    }

    let source: Box<dyn RequestSource> = if let Some(path) = &args.dataset_file {
        Box::new(FileRequestSource::load(path, args.model.clone()).context("failed to load dataset file")?)
    } else {
        let prompt = args.prompt.clone().unwrap_or_else(|| "lorem ipsum dolor sit amet".to_string());
        let word_count = prompt.split_whitespace().count();
        Box::new(SyntheticPromptSource::new(word_count.max(1), args.model.clone()))
    };

    let scheduler_config = SchedulerConfig {
        max_number: args.max_number,
        max_duration: args.max_duration.map(Duration::from_secs),
        request_timeout: settings.scheduler.request_timeout,
        max_processes: settings.scheduler.max_worker_processes,
        ..Default::default()
    };

    let orchestrator = Orchestrator::new(
        client,
        OrchestratorConfig {
            scheduler: scheduler_config,
            show_progress: args.progress && !quiet && !json_output,
        },
    );

    let session_id = SessionId::new();
    let aggregator = SchedulerMetricsAggregator::new(session_id, strategy_name);
    let (run_info, aggregated) = orchestrator.run(source.iter(), strategy, aggregator).await;

    let metrics = aggregated.context("failed to aggregate benchmark metrics")?;

    if !quiet && !json_output {
        println!(
            "{} {} requests completed ({} partial)",
            "✓".bright_green().bold(),
            run_info.completed,
            if run_info.partial { "yes" } else { "no" }
        );
    }

    let format = if json_output { "json" } else { args.output_format.as_str() };
    export(format, &args.output, &metrics)?;

    Ok(())
}
