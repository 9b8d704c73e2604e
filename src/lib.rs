//! genbench - a generative-inference load generator and benchmarker.
//!
//! This crate exposes the same machinery the CLI uses as a library:
//! build a `BackendClient` against an OpenAI-compatible target, pick a
//! `SchedulingStrategy` (or a whole `Profile` of them), and hand it to a
//! builder here to get back aggregated metrics without touching argument
//! parsing or terminal output.

pub mod config;
pub mod orchestrator;

use genbench_backend::BackendClient;
use genbench_core::SessionId;
use genbench_metrics::{AggregatedMetrics, MetricsError, SchedulerMetricsAggregator};
use genbench_scheduler::{
    Benchmarker, BenchmarkReport, Profile, Request, RunInfo, Scheduler, SchedulerConfig,
    SchedulingStrategy, Synchronous,
};
use orchestrator::{Orchestrator, OrchestratorConfig};
use std::sync::Arc;

/// Runs one `SchedulingStrategy` against a target and reports aggregated
/// metrics. The single-strategy counterpart to `ProfileBuilder` below.
pub struct BenchmarkBuilder {
    client: Arc<BackendClient>,
    strategy: Box<dyn SchedulingStrategy>,
    strategy_name: String,
    scheduler_config: SchedulerConfig,
    show_progress: bool,
}

impl BenchmarkBuilder {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self {
            client,
            strategy: Box::new(Synchronous),
            strategy_name: Synchronous.name().to_string(),
            scheduler_config: SchedulerConfig::default(),
            show_progress: false,
        }
    }

    pub fn strategy(mut self, strategy: Box<dyn SchedulingStrategy>) -> Self {
        self.strategy_name = strategy.name().to_string();
        self.strategy = strategy;
        self
    }

    pub fn scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler_config = config;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Runs `requests` to completion and returns the run's final counters
    /// alongside its aggregated metrics.
    pub async fn run(
        self,
        requests: impl Iterator<Item = Request> + Send + 'static,
    ) -> (RunInfo, Result<AggregatedMetrics, MetricsError>) {
        let session_id = SessionId::new();
        let orchestrator = Orchestrator::new(
            self.client,
            OrchestratorConfig {
                scheduler: self.scheduler_config,
                show_progress: self.show_progress,
            },
        );
        let aggregator = SchedulerMetricsAggregator::new(session_id, self.strategy_name.clone());
        orchestrator.run(requests, self.strategy, aggregator).await
    }
}

/// Runs a whole `Profile` (e.g. `SweepProfile`) leg by leg through a
/// `Benchmarker`, returning one aggregated report per strategy.
pub struct ProfileBuilder {
    client: Arc<BackendClient>,
    scheduler_config: SchedulerConfig,
}

impl ProfileBuilder {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client, scheduler_config: SchedulerConfig::default() }
    }

    pub fn scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler_config = config;
        self
    }

    /// Drains `profile`, calling `new_requests` to build a fresh request
    /// source for each leg. The leg's strategy name isn't known until the
    /// scheduler names it mid-run, so each aggregator starts untagged and
    /// is relabeled from `BenchmarkReport::strategy_name` afterward.
    pub async fn run(
        self,
        profile: Box<dyn Profile>,
        session_id: SessionId,
        new_requests: impl FnMut() -> Box<dyn Iterator<Item = Request> + Send>,
    ) -> Vec<BenchmarkReport<Result<AggregatedMetrics, MetricsError>>> {
        let benchmarker = Benchmarker::new(Scheduler::new(self.client));
        let mut reports = benchmarker
            .run(profile, self.scheduler_config, new_requests, || {
                SchedulerMetricsAggregator::new(session_id, String::new())
            })
            .await;

        for report in &mut reports {
            if let Ok(metrics) = &mut report.output {
                metrics.strategy_name = report.strategy_name.clone();
            }
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genbench_backend::BackendConfig;
    use genbench_scheduler::Request;
    use std::time::Duration;

    fn unreachable_client() -> Arc<BackendClient> {
        Arc::new(BackendClient::new(BackendConfig {
            target: "http://127.0.0.1:1".into(),
            connect_timeout: Duration::from_millis(100),
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn benchmark_builder_runs_synchronous_to_completion() {
        let builder = BenchmarkBuilder::new(unreachable_client()).scheduler_config(
            SchedulerConfig { cpus: 1, max_processes: 1, ..Default::default() },
        );

        let requests = (0..2).map(|i| Request::new(format!("p{i}")));
        let (run_info, aggregated) = builder.run(requests).await;

        assert_eq!(run_info.created, 2);
        assert_eq!(run_info.completed, 2);
        // Every request fails against the unreachable target, so
        // aggregation still succeeds but reports zero successes.
        let metrics = aggregated.unwrap();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.successful_requests, 0);
    }
}
