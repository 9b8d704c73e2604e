//! Scheduler-level errors. Per-request backend failures are carried
//! inside `ResponseSummary::error` and never abort a run; these variants
//! are for failures of the run itself.

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("worker process {worker_id} crashed: {reason}")]
    WorkerCrash { worker_id: usize, reason: String },

    #[error("request source exhausted before the strategy finished warming up")]
    RequestSourceExhausted,

    #[error("invalid strategy configuration: {0}")]
    InvalidStrategy(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
