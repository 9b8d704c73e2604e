//! The scheduling core of genbench: a strategy decides when each request
//! should fire, a pool of worker tasks drives it against the backend, and
//! the scheduler ties the two together into a typed event stream that the
//! benchmarker aggregates.

pub mod benchmarker;
pub mod error;
pub mod request;
pub mod scheduler;
pub mod source;
pub mod strategy;
pub mod worker;
pub mod worker_process;

pub use benchmarker::{Aggregator, BenchmarkReport, Benchmarker};
pub use error::{Result, SchedulerError};
pub use request::{
    ProcessingMode, Request, RequestEnvelope, RequestInfo, ResponseSummary, RunInfo,
    SchedulerEvent, TargetStart,
};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use source::{FileRequestSource, RequestSource, SyntheticPromptSource};
pub use strategy::{
    AsyncConstant, AsyncPoisson, Concurrent, Profile, SchedulingStrategy, SingleProfile,
    SweepProfile, Synchronous, Throughput,
};
pub use worker::Worker;
