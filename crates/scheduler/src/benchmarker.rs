//! The Benchmarker (C6): iterates a `Profile`'s strategies one at a time,
//! runs each through the `Scheduler`, folds its event stream into an
//! `Aggregator`, and feeds the observed throughput back into the profile
//! so adaptive profiles (`SweepProfile`) can pick their next rate.
//! Grounded on the original `Benchmarker`/`BenchmarkAggregator` split,
//! which keeps metrics accumulation out of the scheduler's hot loop.

use crate::request::{RunInfo, SchedulerEvent};
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::strategy::Profile;
use crate::Request;
use futures::StreamExt;

/// Accumulates `SchedulerEvent`s from one strategy's run into a final
/// report. Implemented by the metrics crate's `BenchmarkSummary`
/// aggregator; kept generic here so the scheduler crate has no
/// dependency on the metrics crate's histogram types.
pub trait Aggregator: Send {
    type Output;

    fn add_result(&mut self, event: &SchedulerEvent);
    fn compile(self) -> Self::Output;
}

/// One strategy leg's outcome: its name, the scheduler's run-level
/// counters, and whatever the aggregator compiled from its events.
pub struct BenchmarkReport<T> {
    pub strategy_name: String,
    pub run_info: RunInfo,
    pub output: T,
}

pub struct Benchmarker {
    scheduler: Scheduler,
}

impl Benchmarker {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// Drains `profile` to completion, calling `new_requests` to build a
    /// fresh request source and `new_aggregator` to build a fresh
    /// aggregator for each leg.
    pub async fn run<A>(
        &self,
        mut profile: Box<dyn Profile>,
        config: SchedulerConfig,
        mut new_requests: impl FnMut() -> Box<dyn Iterator<Item = Request> + Send>,
        mut new_aggregator: impl FnMut() -> A,
    ) -> Vec<BenchmarkReport<A::Output>>
    where
        A: Aggregator,
    {
        let mut reports = Vec::new();

        while let Some(strategy) = profile.next() {
            let strategy_name = strategy.name().to_string();
            let mut aggregator = new_aggregator();
            let mut stream = Box::pin(self.scheduler.run(new_requests(), strategy, config.clone()));
            let mut final_run_info: Option<RunInfo> = None;

            while let Some(event) = stream.next().await {
                aggregator.add_result(&event);
                if let SchedulerEvent::RunComplete { ref run_info, .. } = event {
                    final_run_info = Some(run_info.clone());
                }
            }

            let run_info = final_run_info.expect("scheduler always emits RunComplete before its stream ends");
            let elapsed = run_info
                .end_time
                .unwrap_or(run_info.start_time)
                .duration_since(run_info.start_time)
                .as_secs_f64();
            let observed_rate = if elapsed > 0.0 { run_info.completed as f64 / elapsed } else { 0.0 };
            let observed_concurrency = run_info.processes as f64;

            profile.completed_strategy(observed_rate, observed_concurrency);

            reports.push(BenchmarkReport { strategy_name, run_info, output: aggregator.compile() });
        }

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::SingleProfile;
    use crate::strategy::Synchronous;
    use genbench_backend::{BackendClient, BackendConfig};
    use std::sync::Arc;
    use std::time::Duration;

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
    async fn single_profile_produces_exactly_one_report() {
        let client = Arc::new(BackendClient::new(BackendConfig {
            target: "http://127.0.0.1:1".into(),
            connect_timeout: Duration::from_millis(100),
            ..Default::default()
        }));
        let benchmarker = Benchmarker::new(Scheduler::new(client));
        let config = SchedulerConfig { cpus: 2, max_processes: 2, ..Default::default() };

        let reports = benchmarker
            .run(
                Box::new(SingleProfile::new(Box::new(Synchronous))),
                config,
                || Box::new((0..3).map(|i| Request::new(format!("p{i}")))),
                || CountingAggregator { completed: 0 },
            )
            .await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].output, 3);
        assert_eq!(reports[0].run_info.completed, 3);
    }
}
