//! Progress-reporting wrapper around `genbench_scheduler::Scheduler`.
//!
//! The teacher's orchestrator owned its own concurrency control
//! (`Semaphore` + `governor` + `FuturesUnordered`); all of that is now the
//! scheduler crate's job. What's left here is exactly what's still
//! ambient: rendering an `indicatif` progress bar off the scheduler's
//! typed event stream and folding it into an `Aggregator`.

use futures::StreamExt;
use genbench_backend::BackendClient;
use genbench_scheduler::{
    Aggregator, Request, RunInfo, Scheduler, SchedulerConfig, SchedulerEvent, SchedulingStrategy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub scheduler: SchedulerConfig,
    pub show_progress: bool,
}

pub struct Orchestrator {
    scheduler: Scheduler,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(client: Arc<BackendClient>, config: OrchestratorConfig) -> Self {
        Self { scheduler: Scheduler::new(client), config }
    }

    /// Drains one strategy's run through the scheduler, rendering a
    /// progress bar (if enabled) and folding every event into
    /// `aggregator`. Returns the run's final counters and whatever the
    /// aggregator compiled.
    pub async fn run<A: Aggregator>(
        &self,
        requests_source: impl Iterator<Item = Request> + Send + 'static,
        strategy: Box<dyn SchedulingStrategy>,
        mut aggregator: A,
    ) -> (RunInfo, A::Output) {
        let mut stream =
            Box::pin(self.scheduler.run(requests_source, strategy, self.config.scheduler.clone()));

        let bar = self.config.show_progress.then(Self::build_progress_bar);
        let mut final_run_info: Option<RunInfo> = None;

        while let Some(event) = stream.next().await {
            if let Some(bar) = &bar {
                Self::update_progress(bar, &event);
            }
            aggregator.add_result(&event);
            if let SchedulerEvent::RunComplete { ref run_info, .. } = event {
                final_run_info = Some(run_info.clone());
            }
        }

        if let Some(bar) = bar {
            bar.finish_with_message("run complete");
        }

        let run_info =
            final_run_info.expect("scheduler always emits RunComplete before its stream ends");
        (run_info, aggregator.compile())
    }

    fn build_progress_bar() -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    fn update_progress(bar: &ProgressBar, event: &SchedulerEvent) {
        let run_info = event.run_info();
        let target = run_info
            .end_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        bar.set_message(format!(
            "{}/{} completed, {} in flight, {} queued",
            run_info.completed, target, run_info.processing, run_info.queued
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genbench_backend::BackendConfig;
    use genbench_scheduler::{Request, SingleProfile, Synchronous};

    struct CountingAggregator {
        completed: usize,
    }

    impl Aggregator for CountingAggregator {
        type Output = usize;

        fn add_result(&mut self, event: &SchedulerEvent) {
            if matches!(event, SchedulerEvent::RequestComplete { .. }) {
                self.completed += 1;
            }
        }

        fn compile(self) -> usize {
            self.completed
        }
    }

    #[tokio::test]
    async fn orchestrator_run_reports_final_counters() {
        let client = Arc::new(BackendClient::new(BackendConfig {
            target: "http://127.0.0.1:1".into(),
            connect_timeout: Duration::from_millis(100),
            ..Default::default()
        }));
        let orchestrator = Orchestrator::new(
            client,
            OrchestratorConfig {
                scheduler: SchedulerConfig { cpus: 2, max_processes: 2, ..Default::default() },
                show_progress: false,
            },
        );

        let requests = (0..3).map(|i| Request::new(format!("p{i}")));
        let (run_info, completed) = orchestrator
            .run(requests, Box::new(Synchronous), CountingAggregator { completed: 0 })
            .await;

        assert_eq!(run_info.created, 3);
        assert_eq!(completed, 3);
    }

    #[test]
    fn single_profile_is_not_needed_for_single_strategy_runs() {
        // The orchestrator drives one strategy directly; `SingleProfile`
        // remains useful only when driving it through `Benchmarker`.
        let _ = SingleProfile::new(Box::new(Synchronous));
    }
}
