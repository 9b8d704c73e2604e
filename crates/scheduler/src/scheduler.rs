//! The Scheduler (C5): owns the producer/consumer loop that ties a
//! `SchedulingStrategy` to a pool of `WorkerProcess` tasks and emits a
//! typed event stream a `Benchmarker` (or any other caller) can consume.
//! Grounded closely on `Scheduler.run()`'s async generator in the
//! original Python implementation: startup builds the request/time
//! iterators and worker pool, then a single loop alternates between
//! topping up the requests queue and draining worker events until the
//! request source is exhausted and every created request has completed.

use crate::request::{Request, RequestEnvelope, RequestInfo, RunInfo, SchedulerEvent, TargetStart};
use crate::strategy::SchedulingStrategy;
use crate::worker::Worker;
use crate::worker_process::{WorkerProcess, WorkerProcessEvent};
use futures::Stream;
use genbench_backend::BackendClient;
use genbench_core::{Clock, RequestId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Run-scoped limits and pool sizing knobs. Per-request knobs (model,
/// token hints) live on `Request` itself.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// `None` = no count cap.
    pub max_number: Option<u64>,
    /// `None` = no duration cap.
    pub max_duration: Option<Duration>,
    /// Per-request wall-clock budget from dispatch. `None` = no deadline.
    pub request_timeout: Option<Duration>,
    pub cpus: usize,
    pub max_processes: usize,
    /// The cooperative yield between producer/consumer loop iterations;
    /// `default_async_loop_sleep` in the original design.
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_number: None,
            max_duration: None,
            request_timeout: None,
            cpus: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            max_processes: 16,
            poll_interval: Duration::from_micros(500),
        }
    }
}

pub struct Scheduler {
    client: Arc<BackendClient>,
}

impl Scheduler {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    /// Runs `strategy` against `requests_source` until the source is
    /// exhausted or a configured cap is hit, yielding one `SchedulerEvent`
    /// per state transition: `created -> queued -> scheduled -> processing
    /// -> completed`.
    pub fn run(
        &self,
        requests_source: impl Iterator<Item = Request> + Send + 'static,
        strategy: Box<dyn SchedulingStrategy>,
        config: SchedulerConfig,
    ) -> impl Stream<Item = SchedulerEvent> {
        let client = self.client.clone();

        async_stream::stream! {
            let clock = Clock::new();
            let processes = strategy.processes_limit(config.cpus, config.max_processes).max(1);
            let total_cap = strategy.processing_requests_limit();
            let per_process_cap = match total_cap {
                Some(n) => ((n as f64) / processes as f64).ceil() as usize,
                None => 10_000,
            }
            .max(1);
            let queue_capacity = strategy.queued_requests_limit(processes).max(processes);
            let mode = strategy.processing_mode();

            let (req_tx, req_rx) = async_channel::bounded::<RequestEnvelope>(queue_capacity);
            let (evt_tx, mut evt_rx) = tokio::sync::mpsc::unbounded_channel::<WorkerProcessEvent>();

            let mut handles = Vec::with_capacity(processes);
            for id in 0..processes {
                let worker = Worker::new(client.clone());
                let process = WorkerProcess::new(id, mode, per_process_cap, worker);
                handles.push(tokio::spawn(process.run(req_rx.clone(), evt_tx.clone())));
            }
            drop(req_rx);
            drop(evt_tx);

            let start_time = clock.now();
            let end_time = config.max_duration.map(|d| start_time.checked_add(d));
            let mut run_info = RunInfo {
                start_time,
                end_time,
                end_number: config.max_number,
                processes,
                strategy_name: strategy.name().to_string(),
                created: 0,
                queued: 0,
                scheduled: 0,
                processing: 0,
                completed: 0,
                partial: false,
            };

            yield SchedulerEvent::RunStart { run_info: run_info.clone() };

            let mut times = strategy.request_times(&clock);
            let mut requests_source = requests_source;
            let mut exhausted = false;
            let mut in_flight: HashMap<RequestId, (Request, RequestInfo)> = HashMap::new();

            loop {
                let within_number_cap = run_info.end_number.map_or(true, |n| run_info.created < n);
                let within_time_cap = match run_info.end_time {
                    Some(end) => clock.now() < end,
                    None => true,
                };

                if !exhausted && within_number_cap && within_time_cap {
                    match requests_source.next() {
                        Some(request) => {
                            let target = times.next().unwrap_or(TargetStart::Now);
                            let now = clock.now();
                            let deadline = config.request_timeout.map(|timeout| match target {
                                TargetStart::Now => now.checked_add(timeout),
                                TargetStart::At(t) => t.checked_add(timeout),
                            });

                            let envelope = RequestEnvelope {
                                request: request.clone(),
                                target_start_time: target,
                                deadline,
                                queued_time: now,
                            };

                            if req_tx.send(envelope).await.is_ok() {
                                run_info.created += 1;
                                run_info.queued += 1;
                                let info = RequestInfo {
                                    targeted_start_time: Some(target),
                                    queued_time: Some(now),
                                    ..Default::default()
                                };
                                in_flight.insert(request.id, (request.clone(), info));
                            }
                        }
                        None => exhausted = true,
                    }
                }

                while let Ok(event) = evt_rx.try_recv() {
                    match event {
                        WorkerProcessEvent::Scheduled { request_id, worker_id, scheduled_time } => {
                            if let Some((request, info)) = in_flight.get_mut(&request_id) {
                                info.scheduled_time = Some(scheduled_time);
                                info.worker_id = Some(worker_id);
                                run_info.queued = run_info.queued.saturating_sub(1);
                                run_info.scheduled += 1;
                                yield SchedulerEvent::RequestScheduled {
                                    request: request.clone(),
                                    request_info: info.clone(),
                                    run_info: run_info.clone(),
                                };
                            }
                        }
                        WorkerProcessEvent::Started { request_id, worker_id, worker_start_time } => {
                            if let Some((request, info)) = in_flight.get_mut(&request_id) {
                                info.worker_start = Some(worker_start_time);
                                info.worker_id = Some(worker_id);
                                run_info.scheduled = run_info.scheduled.saturating_sub(1);
                                run_info.processing += 1;
                                yield SchedulerEvent::RequestStart {
                                    request: request.clone(),
                                    request_info: info.clone(),
                                    run_info: run_info.clone(),
                                };
                            }
                        }
                        WorkerProcessEvent::Completed { request_info, response } => {
                            if let Some((request, ..)) = in_flight.remove(&response.request_id) {
                                run_info.processing = run_info.processing.saturating_sub(1);
                                run_info.completed += 1;
                                yield SchedulerEvent::RequestComplete {
                                    request,
                                    response,
                                    request_info,
                                    run_info: run_info.clone(),
                                };
                            }
                        }
                    }
                }

                if exhausted && run_info.completed >= run_info.created {
                    break;
                }
                if !within_time_cap && run_info.completed >= run_info.created {
                    run_info.partial = run_info.created < run_info.end_number.unwrap_or(run_info.created);
                    break;
                }

                tokio::time::sleep(config.poll_interval).await;
            }

            drop(req_tx);
            for handle in handles {
                let _ = handle.await;
            }

            if run_info.end_time.is_none() {
                run_info.end_time = Some(clock.now());
            }

            yield SchedulerEvent::RunComplete { run_info, error: None };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Synchronous;
    use genbench_backend::BackendConfig;

    fn unreachable_client() -> Arc<BackendClient> {
        Arc::new(BackendClient::new(BackendConfig {
            target: "http://127.0.0.1:1".into(),
            connect_timeout: Duration::from_millis(100),
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn run_completes_every_created_request_exactly_once() {
        use futures::StreamExt;

        let scheduler = Scheduler::new(unreachable_client());
        let requests = (0..5).map(|i| Request::new(format!("prompt {i}")));
        let config = SchedulerConfig { cpus: 2, max_processes: 2, ..Default::default() };

        let mut stream = Box::pin(scheduler.run(requests, Box::new(Synchronous), config));
        let mut completed = 0;
        let mut run_complete_seen = false;

        while let Some(event) = stream.next().await {
            match event {
                SchedulerEvent::RequestComplete { .. } => completed += 1,
                SchedulerEvent::RunComplete { run_info, .. } => {
                    assert_eq!(run_info.created, 5);
                    assert_eq!(run_info.completed, 5);
                    assert!(run_info.counters_balanced());
                    run_complete_seen = true;
                }
                _ => {}
            }
        }

        assert_eq!(completed, 5);
        assert!(run_complete_seen);
    }

    #[tokio::test]
    async fn request_scheduled_precedes_request_start_with_distinct_states() {
        use futures::StreamExt;

        let scheduler = Scheduler::new(unreachable_client());
        let requests = std::iter::once(Request::new("prompt"));
        let config = SchedulerConfig { cpus: 1, max_processes: 1, ..Default::default() };

        let mut stream = Box::pin(scheduler.run(requests, Box::new(Synchronous), config));
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }

        let scheduled_index = events
            .iter()
            .position(|e| matches!(e, SchedulerEvent::RequestScheduled { .. }))
            .expect("a RequestScheduled event must be emitted");
        let start_index = events
            .iter()
            .position(|e| matches!(e, SchedulerEvent::RequestStart { .. }))
            .expect("a RequestStart event must be emitted");

        assert!(scheduled_index < start_index, "request_scheduled must precede request_start");

        match &events[scheduled_index] {
            SchedulerEvent::RequestScheduled { run_info, .. } => {
                assert_eq!(run_info.scheduled, 1);
                assert_eq!(run_info.queued, 0);
                assert_eq!(run_info.processing, 0);
            }
            _ => unreachable!(),
        }
        match &events[start_index] {
            SchedulerEvent::RequestStart { run_info, .. } => {
                assert_eq!(run_info.scheduled, 0);
                assert_eq!(run_info.processing, 1);
            }
            _ => unreachable!(),
        }
    }
}
