//! Scheduling Strategy (C1): produces the lazy sequence of absolute
//! target dispatch timestamps and declares the shape of the worker pool
//! that will execute them.

use crate::request::{ProcessingMode, TargetStart};
use genbench_core::Clock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};
use std::time::Duration;

/// Rule choosing when to dispatch each request and how parallel the pool
/// processing it is.
pub trait SchedulingStrategy: Send + Sync {
    /// A lazy, possibly-infinite, monotonically non-decreasing sequence
    /// of absolute target dispatch times, anchored at `clock.now()`.
    fn request_times(&self, clock: &Clock) -> Box<dyn Iterator<Item = TargetStart> + Send>;

    fn processing_mode(&self) -> ProcessingMode;

    /// Number of worker processes (tasks) to start.
    fn processes_limit(&self, cpus: usize, config_max: usize) -> usize;

    /// Total in-flight cap across the whole pool. `None` means unbounded
    /// (the Throughput strategy).
    fn processing_requests_limit(&self) -> Option<usize>;

    /// Requests-queue capacity. Default is in-flight cap + process count,
    /// one slot of headroom per worker.
    fn queued_requests_limit(&self, processes: usize) -> usize {
        self.processing_requests_limit().unwrap_or(processes) + processes
    }

    fn name(&self) -> &'static str;
}

/// One request in flight at a time, one process.
pub struct Synchronous;

impl SchedulingStrategy for Synchronous {
    fn request_times(&self, _clock: &Clock) -> Box<dyn Iterator<Item = TargetStart> + Send> {
        Box::new(std::iter::repeat(TargetStart::Now))
    }

    fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::Sync
    }

    fn processes_limit(&self, _cpus: usize, _config_max: usize) -> usize {
        1
    }

    fn processing_requests_limit(&self) -> Option<usize> {
        Some(1)
    }

    fn name(&self) -> &'static str {
        "synchronous"
    }
}

/// Fixed number of sequential worker streams, each with one in-flight
/// request at a time.
pub struct Concurrent {
    pub streams: usize,
}

impl SchedulingStrategy for Concurrent {
    fn request_times(&self, _clock: &Clock) -> Box<dyn Iterator<Item = TargetStart> + Send> {
        Box::new(std::iter::repeat(TargetStart::Now))
    }

    fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::Sync
    }

    fn processes_limit(&self, _cpus: usize, _config_max: usize) -> usize {
        self.streams.max(1)
    }

    fn processing_requests_limit(&self) -> Option<usize> {
        Some(self.streams.max(1))
    }

    fn name(&self) -> &'static str {
        "concurrent"
    }
}

/// Unbounded rate, auto-sized process count, no in-flight cap.
pub struct Throughput;

impl SchedulingStrategy for Throughput {
    fn request_times(&self, _clock: &Clock) -> Box<dyn Iterator<Item = TargetStart> + Send> {
        Box::new(std::iter::repeat(TargetStart::Now))
    }

    fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::Async
    }

    fn processes_limit(&self, cpus: usize, config_max: usize) -> usize {
        cpus.saturating_sub(1).max(1).min(config_max.max(1))
    }

    fn processing_requests_limit(&self) -> Option<usize> {
        None
    }

    fn name(&self) -> &'static str {
        "throughput"
    }
}

/// Constant-interval dispatch: `t0, t0+1/r, t0+2/r, …`, with the first
/// `initial_burst` entries all equal to `t0`.
pub struct AsyncConstant {
    pub rate: f64,
    pub initial_burst: usize,
    pub in_flight_cap: Option<usize>,
}

impl AsyncConstant {
    pub fn new(rate: f64) -> Self {
        Self { rate, initial_burst: 0, in_flight_cap: None }
    }
}

impl SchedulingStrategy for AsyncConstant {
    fn request_times(&self, clock: &Clock) -> Box<dyn Iterator<Item = TargetStart> + Send> {
        let t0 = clock.now();
        let interval = Duration::from_secs_f64(1.0 / self.rate.max(f64::MIN_POSITIVE));
        let burst = self.initial_burst;
        Box::new((0u64..).map(move |n| {
            if (n as usize) < burst {
                TargetStart::At(t0)
            } else {
                let elapsed_slots = n - burst as u64;
                TargetStart::At(t0.checked_add(interval * (elapsed_slots + 1) as u32))
            }
        }))
    }

    fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::Async
    }

    fn processes_limit(&self, cpus: usize, config_max: usize) -> usize {
        cpus.saturating_sub(1).max(1).min(config_max.max(1))
    }

    fn processing_requests_limit(&self) -> Option<usize> {
        self.in_flight_cap
    }

    fn name(&self) -> &'static str {
        "async_constant"
    }
}

/// Poisson-process dispatch: inter-arrival times drawn from `Exp(rate)`.
pub struct AsyncPoisson {
    pub rate: f64,
    pub in_flight_cap: Option<usize>,
}

impl AsyncPoisson {
    pub fn new(rate: f64) -> Self {
        Self { rate, in_flight_cap: None }
    }
}

impl SchedulingStrategy for AsyncPoisson {
    fn request_times(&self, clock: &Clock) -> Box<dyn Iterator<Item = TargetStart> + Send> {
        let t0 = clock.now();
        let exp = Exp::new(self.rate).expect("rate must be positive");
        let mut rng = StdRng::from_entropy();
        let mut cumulative = Duration::ZERO;
        Box::new(std::iter::from_fn(move || {
            let delta_secs: f64 = exp.sample(&mut rng);
            cumulative += Duration::from_secs_f64(delta_secs);
            Some(TargetStart::At(t0.checked_add(cumulative)))
        }))
    }

    fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::Async
    }

    fn processes_limit(&self, cpus: usize, config_max: usize) -> usize {
        cpus.saturating_sub(1).max(1).min(config_max.max(1))
    }

    fn processing_requests_limit(&self) -> Option<usize> {
        self.in_flight_cap
    }

    fn name(&self) -> &'static str {
        "async_poisson"
    }
}

/// An ordered, adaptive composition of strategies executed as one run.
/// `Sweep` is the only strategy whose next member depends on feedback
/// from the strategy before it.
pub trait Profile: Send {
    fn next(&mut self) -> Option<Box<dyn SchedulingStrategy>>;

    /// Called after a strategy's run completes so adaptive profiles
    /// (Sweep) can pick their next rate from the observed behavior.
    fn completed_strategy(&mut self, observed_rate: f64, observed_concurrency: f64);
}

/// A single fixed strategy run as a one-element profile.
pub struct SingleProfile {
    strategy: Option<Box<dyn SchedulingStrategy>>,
}

impl SingleProfile {
    pub fn new(strategy: Box<dyn SchedulingStrategy>) -> Self {
        Self { strategy: Some(strategy) }
    }
}

impl Profile for SingleProfile {
    fn next(&mut self) -> Option<Box<dyn SchedulingStrategy>> {
        self.strategy.take()
    }

    fn completed_strategy(&mut self, _observed_rate: f64, _observed_concurrency: f64) {}
}

/// Synchronous, then Throughput, then `size - 2` AsyncConstant strategies
/// whose rates interpolate between the Synchronous-observed rate and the
/// Throughput-observed rate.
pub struct SweepProfile {
    size: usize,
    emitted: usize,
    sync_rate: Option<f64>,
    throughput_rate: Option<f64>,
}

impl SweepProfile {
    pub fn new(size: usize) -> Self {
        assert!(size >= 2, "a sweep needs at least a synchronous and a throughput leg");
        Self { size, emitted: 0, sync_rate: None, throughput_rate: None }
    }

    fn interpolated_rate(&self, step: usize, steps: usize) -> f64 {
        let (lo, hi) = (
            self.sync_rate.unwrap_or(1.0),
            self.throughput_rate.unwrap_or(lo_default(self.sync_rate)),
        );
        let t = step as f64 / steps as f64;
        lo + (hi - lo) * t
    }
}

fn lo_default(sync_rate: Option<f64>) -> f64 {
    sync_rate.unwrap_or(1.0) * 10.0
}

impl Profile for SweepProfile {
    fn next(&mut self) -> Option<Box<dyn SchedulingStrategy>> {
        if self.emitted >= self.size {
            return None;
        }
        let strategy: Box<dyn SchedulingStrategy> = match self.emitted {
            0 => Box::new(Synchronous),
            1 => Box::new(Throughput),
            step => {
                let intermediate_steps = self.size - 2;
                let rate = self.interpolated_rate(step - 1, intermediate_steps + 1);
                Box::new(AsyncConstant::new(rate))
            }
        };
        self.emitted += 1;
        Some(strategy)
    }

    fn completed_strategy(&mut self, observed_rate: f64, _observed_concurrency: f64) {
        match self.emitted {
            1 => self.sync_rate = Some(observed_rate),
            2 => self.throughput_rate = Some(observed_rate),
            _ => {}
        }
    }
}
