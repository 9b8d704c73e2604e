//! The data model shared by every scheduler component: requests, their
//! queue envelopes, per-request timing ledgers, run-level counters, and
//! the typed event stream the scheduler emits.

use genbench_backend::BackendError;
use genbench_core::{RequestId, Timestamp};
use std::time::Duration;

/// A prompt to be sent to the backend, opaque to the scheduler itself.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: RequestId,
    pub prompt: String,
    pub model: String,
    pub prompt_tokens_hint: Option<u64>,
    pub output_tokens_hint: Option<u64>,
}

impl Request {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            prompt: prompt.into(),
            model: "default".to_string(),
            prompt_tokens_hint: None,
            output_tokens_hint: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// The wall-clock instant a strategy wants a request dispatched at.
/// `Now` means dispatch as soon as a worker is free, with no pre-dispatch
/// sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStart {
    Now,
    At(Timestamp),
}

impl TargetStart {
    /// How long a worker should sleep before dispatching, given the
    /// current time. Never negative; `Now` and any already-past target
    /// both collapse to zero.
    pub fn sleep_duration(&self, now: Timestamp) -> Duration {
        match self {
            TargetStart::Now => Duration::ZERO,
            TargetStart::At(target) => {
                if *target <= now {
                    Duration::ZERO
                } else {
                    target.duration_since(now)
                }
            }
        }
    }

    pub fn is_past(&self, now: Timestamp) -> bool {
        matches!(self, TargetStart::At(t) if *t <= now) || matches!(self, TargetStart::Now)
    }
}

/// An entry on the requests queue: a request plus its scheduling metadata.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub request: Request,
    pub target_start_time: TargetStart,
    /// `None` means no duration cap (`+∞`).
    pub deadline: Option<Timestamp>,
    pub queued_time: Timestamp,
}

/// Per-request timing ledger. Each field is written exactly once, in the
/// order listed, and never reassigned once set.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub targeted_start_time: Option<TargetStart>,
    pub queued_time: Option<Timestamp>,
    pub scheduled_time: Option<Timestamp>,
    pub worker_start: Option<Timestamp>,
    pub worker_end: Option<Timestamp>,
    pub worker_id: Option<usize>,
}

/// The outcome of one `Worker::resolve` call.
#[derive(Debug, Clone)]
pub struct ResponseSummary {
    pub value: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub first_iter_time: Option<Timestamp>,
    pub last_iter_time: Option<Timestamp>,
    pub iter_count: u64,
    pub request_prompt_tokens: Option<u64>,
    pub request_output_tokens: Option<u64>,
    pub response_prompt_tokens: Option<u64>,
    pub response_output_tokens: Option<u64>,
    pub request_id: RequestId,
    pub error: Option<BackendError>,
}

impl ResponseSummary {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Processing mode a strategy declares for its worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    Sync,
    Async,
}

/// Run-scoped bookkeeping. Counter invariant, enforced by the state
/// machine in `scheduler.rs`:
/// `created == queued + scheduled + processing + completed`.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub start_time: Timestamp,
    /// `None` = no duration cap.
    pub end_time: Option<Timestamp>,
    /// `None` = no count cap.
    pub end_number: Option<u64>,
    pub processes: usize,
    pub strategy_name: String,

    pub created: u64,
    pub queued: u64,
    pub scheduled: u64,
    pub processing: u64,
    pub completed: u64,

    /// Set when the run terminated early due to a `WorkerCrash`.
    pub partial: bool,
}

impl RunInfo {
    pub fn counters_balanced(&self) -> bool {
        self.created == self.queued + self.scheduled + self.processing + self.completed
    }
}

/// A typed event out of the Scheduler's stream, one per request-lifecycle
/// transition plus the run-level start/complete bookends.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    RunStart {
        run_info: RunInfo,
    },
    RequestScheduled {
        request: Request,
        request_info: RequestInfo,
        run_info: RunInfo,
    },
    RequestStart {
        request: Request,
        request_info: RequestInfo,
        run_info: RunInfo,
    },
    RequestComplete {
        request: Request,
        response: ResponseSummary,
        request_info: RequestInfo,
        run_info: RunInfo,
    },
    RunComplete {
        run_info: RunInfo,
        error: Option<String>,
    },
}

impl SchedulerEvent {
    pub fn run_info(&self) -> &RunInfo {
        match self {
            SchedulerEvent::RunStart { run_info }
            | SchedulerEvent::RequestScheduled { run_info, .. }
            | SchedulerEvent::RequestStart { run_info, .. }
            | SchedulerEvent::RequestComplete { run_info, .. }
            | SchedulerEvent::RunComplete { run_info, .. } => run_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genbench_core::Clock;
    use proptest::prelude::*;

    #[test]
    fn now_target_has_zero_sleep() {
        let clock = Clock::new();
        let now = clock.now();
        assert_eq!(TargetStart::Now.sleep_duration(now), Duration::ZERO);
    }

    #[test]
    fn past_target_has_zero_sleep_not_negative() {
        let clock = Clock::new();
        let earlier = clock.now();
        std::thread::sleep(Duration::from_millis(1));
        let now = clock.now();
        assert_eq!(TargetStart::At(earlier).sleep_duration(now), Duration::ZERO);
    }

    #[test]
    fn future_target_sleeps_the_remaining_gap() {
        let clock = Clock::new();
        let now = clock.now();
        let target = now.checked_add(Duration::from_millis(50));
        let sleep = TargetStart::At(target).sleep_duration(now);
        assert!(sleep >= Duration::from_millis(45) && sleep <= Duration::from_millis(55));
    }

    #[test]
    fn run_info_counters_balanced_invariant() {
        let clock = Clock::new();
        let info = RunInfo {
            start_time: clock.now(),
            end_time: None,
            end_number: Some(10),
            processes: 2,
            strategy_name: "synchronous".into(),
            created: 10,
            queued: 2,
            scheduled: 1,
            processing: 3,
            completed: 4,
            partial: false,
        };
        assert!(info.counters_balanced());
    }

    fn run_info_with(created: u64, queued: u64, scheduled: u64, processing: u64, completed: u64) -> RunInfo {
        RunInfo {
            start_time: Clock::new().now(),
            end_time: None,
            end_number: None,
            processes: 1,
            strategy_name: "synchronous".into(),
            created,
            queued,
            scheduled,
            processing,
            completed,
            partial: false,
        }
    }

    proptest! {
        #[test]
        fn counters_balanced_holds_whenever_created_is_the_bucket_sum(
            queued in 0u64..100,
            scheduled in 0u64..100,
            processing in 0u64..100,
            completed in 0u64..100,
        ) {
            let created = queued + scheduled + processing + completed;
            prop_assert!(run_info_with(created, queued, scheduled, processing, completed).counters_balanced());
        }

        #[test]
        fn counters_balanced_fails_whenever_created_drifts_from_the_bucket_sum(
            queued in 0u64..100,
            scheduled in 0u64..100,
            processing in 0u64..100,
            completed in 0u64..100,
            drift in 1u64..50,
        ) {
            let created = queued + scheduled + processing + completed + drift;
            prop_assert!(!run_info_with(created, queued, scheduled, processing, completed).counters_balanced());
        }
    }
}
