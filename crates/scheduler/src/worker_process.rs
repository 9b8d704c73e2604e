//! The Worker Process (C4): a long-lived tokio task that pulls envelopes
//! off the shared requests queue, gates in-flight concurrency with a
//! semaphore, drives each through `Worker::resolve`, and reports back on
//! the responses queue. Realized as a task rather than an OS process
//! (REDESIGN FLAG 1) — `async-channel`'s cloneable receiver gives the
//! same multi-consumer fan-out the original multiprocessing design used
//! a `Manager` queue for.

use crate::request::{ProcessingMode, RequestEnvelope, RequestInfo, ResponseSummary};
use crate::worker::Worker;
use genbench_core::{Clock, RequestId, Timestamp};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One report a worker process sends back upstream. Split into three
/// variants so the scheduler can track the full `queued -> scheduled ->
/// processing -> completed` lifecycle instead of only learning about a
/// request once the whole call has finished: `Scheduled` fires the
/// instant an envelope leaves the channel, before its pre-dispatch sleep;
/// `Started` fires once that sleep elapses and the call is about to be
/// issued; `Completed` fires once the call returns.
pub enum WorkerProcessEvent {
    Scheduled { request_id: RequestId, worker_id: usize, scheduled_time: Timestamp },
    Started { request_id: RequestId, worker_id: usize, worker_start_time: Timestamp },
    Completed { request_info: RequestInfo, response: ResponseSummary },
}

pub struct WorkerProcess {
    pub id: usize,
    pub mode: ProcessingMode,
    /// Caps this process's own in-flight count; for `Sync` mode this is
    /// always 1. The scheduler divides the strategy's total in-flight cap
    /// evenly across processes before constructing each one.
    pub in_flight_cap: usize,
    pub worker: Worker,
    pub clock: Clock,
}

impl WorkerProcess {
    pub fn new(id: usize, mode: ProcessingMode, in_flight_cap: usize, worker: Worker) -> Self {
        Self { id, mode, in_flight_cap, worker, clock: Clock::new() }
    }

    /// Runs until `requests` closes, forwarding `WorkerProcessEvent`s onto
    /// `events`. Never returns early on a single backend failure — only a
    /// panic inside a spawned resolve task surfaces as a logged error;
    /// the run itself keeps going.
    pub async fn run(
        self,
        requests: async_channel::Receiver<RequestEnvelope>,
        events: tokio::sync::mpsc::UnboundedSender<WorkerProcessEvent>,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.in_flight_cap.max(1)));
        let mut in_flight = tokio::task::JoinSet::new();

        loop {
            tokio::select! {
                biased;

                envelope = requests.recv() => {
                    let Ok(envelope) = envelope else { break };
                    let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
                    let worker = self.worker.clone();
                    let clock = self.clock.clone();
                    let events = events.clone();
                    let worker_id = self.id;
                    let request_id = envelope.request.id;

                    let scheduled_time = clock.now();
                    let _ = events.send(WorkerProcessEvent::Scheduled { request_id, worker_id, scheduled_time });

                    let task = async move {
                        let _permit = permit;

                        let now = clock.now();
                        let sleep_for = envelope.target_start_time.sleep_duration(now);
                        if sleep_for > std::time::Duration::ZERO {
                            tokio::time::sleep(sleep_for).await;
                        }

                        let worker_start_time = clock.now();
                        let _ = events.send(WorkerProcessEvent::Started { request_id, worker_id, worker_start_time });

                        let mut info = RequestInfo {
                            targeted_start_time: Some(envelope.target_start_time),
                            queued_time: Some(envelope.queued_time),
                            scheduled_time: Some(scheduled_time),
                            worker_start: Some(worker_start_time),
                            worker_id: Some(worker_id),
                            ..Default::default()
                        };

                        let response = worker.resolve(&envelope.request, envelope.deadline).await;
                        info.worker_end = Some(clock.now());

                        let _ = events.send(WorkerProcessEvent::Completed { request_info: info, response });
                    };

                    match self.mode {
                        ProcessingMode::Sync => task.await,
                        ProcessingMode::Async => { in_flight.spawn(task); }
                    }
                }

                Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = result {
                        tracing::error!(worker_id = self.id, error = %e, "worker task panicked");
                    }
                }
            }
        }

        while let Some(result) = in_flight.join_next().await {
            if let Err(e) = result {
                tracing::error!(worker_id = self.id, error = %e, "worker task panicked during drain");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Request, TargetStart};
    use genbench_backend::{BackendClient, BackendConfig};

    fn unreachable_worker() -> Worker {
        Worker::new(Arc::new(BackendClient::new(BackendConfig {
            target: "http://127.0.0.1:1".into(),
            connect_timeout: std::time::Duration::from_millis(100),
            ..Default::default()
        })))
    }

    #[tokio::test]
    async fn sync_process_drains_in_submission_order() {
        let (req_tx, req_rx) = async_channel::unbounded();
        let (evt_tx, mut evt_rx) = tokio::sync::mpsc::unbounded_channel();

        for _ in 0..3 {
            req_tx
                .send(RequestEnvelope {
                    request: Request::new("hi"),
                    target_start_time: TargetStart::Now,
                    deadline: None,
                    queued_time: Clock::new().now(),
                })
                .await
                .unwrap();
        }
        req_tx.close();

        let process = WorkerProcess::new(0, ProcessingMode::Sync, 1, unreachable_worker());
        process.run(req_rx, evt_tx).await;

        let mut completed = 0;
        let mut scheduled = 0;
        let mut started = 0;
        while let Some(event) = evt_rx.recv().await {
            match event {
                WorkerProcessEvent::Scheduled { .. } => scheduled += 1,
                WorkerProcessEvent::Started { .. } => started += 1,
                WorkerProcessEvent::Completed { .. } => completed += 1,
            }
        }
        assert_eq!(scheduled, 3);
        assert_eq!(started, 3);
        assert_eq!(completed, 3);
    }
}
