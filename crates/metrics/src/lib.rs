//! Metrics collection and aggregation for genbench benchmark runs.
//!
//! Provides a thread-safe [`MetricsCollector`] backed by HDR Histogram for
//! accurate percentile calculations, and a [`SchedulerMetricsAggregator`]
//! that plugs directly into `genbench_scheduler::Benchmarker` as an
//! `Aggregator`, turning a strategy leg's `SchedulerEvent` stream into an
//! [`AggregatedMetrics`] report.
//!
//! # Example
//!
//! ```no_run
//! use genbench_metrics::{MetricsCollector, MetricsAggregator, CollectorConfig, RequestMetrics};
//! use genbench_core::{SessionId, RequestId};
//! use chrono::Utc;
//! use std::time::Duration;
//!
//! let session_id = SessionId::new();
//! let config = CollectorConfig::new()
//!     .with_max_value_seconds(60)
//!     .with_significant_digits(3);
//!
//! let collector = MetricsCollector::new(session_id, config).unwrap();
//!
//! let metrics = RequestMetrics {
//!     request_id: RequestId::new(),
//!     session_id,
//!     model: Some("gpt-4".to_string()),
//!     timestamp: Utc::now(),
//!     ttft: Duration::from_millis(150),
//!     total_latency: Duration::from_millis(2000),
//!     inter_token_latencies: vec![Duration::from_millis(10), Duration::from_millis(15)],
//!     input_tokens: 100,
//!     output_tokens: 50,
//!     tokens_per_second: 25.0,
//!     success: true,
//!     error: None,
//! };
//!
//! collector.record(metrics).unwrap();
//!
//! let aggregated = MetricsAggregator::aggregate(&collector, "synchronous").unwrap();
//! println!("TTFT p50: {:?}", aggregated.ttft_distribution.p50);
//! println!("Success rate: {:.2}%", aggregated.success_rate());
//! ```
//!
//! # Thread safety
//!
//! `MetricsCollector` wraps its state in `Arc<Mutex<_>>` and clones cheaply
//! across worker tasks.

pub mod aggregator;
pub mod collector;
pub mod types;

pub use aggregator::{MetricsAggregator, SchedulerMetricsAggregator};
pub use collector::{CollectorConfig, MetricsCollector, MetricsError};
pub use types::{AggregatedMetrics, LatencyDistribution, RequestMetrics, ThroughputStats};

pub use genbench_core::{RequestId, SessionId};
