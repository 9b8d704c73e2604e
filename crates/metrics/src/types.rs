//! Metrics data structures for genbench.
//!
//! Provides type-safe representations of per-request and aggregated
//! latency/throughput metrics: TTFT, inter-token latency, total latency,
//! and token throughput, all backed by HDR Histogram percentiles.

use chrono::{DateTime, Utc};
use genbench_core::{RequestId, SessionId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metrics for a single request, derived from a `SchedulerEvent::RequestComplete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMetrics {
    pub request_id: RequestId,
    pub session_id: SessionId,

    /// Model name, when the request source provided one.
    pub model: Option<String>,

    /// Wall-clock time the request completed, for report timestamps.
    pub timestamp: DateTime<Utc>,

    /// Time to first token.
    #[serde(with = "duration_nanos")]
    pub ttft: Duration,

    /// Total request latency (dispatch to completion).
    #[serde(with = "duration_nanos")]
    pub total_latency: Duration,

    /// Inter-token latencies (one per token after the first).
    #[serde(with = "duration_vec_nanos")]
    pub inter_token_latencies: Vec<Duration>,

    pub input_tokens: u64,
    pub output_tokens: u64,
    pub tokens_per_second: f64,

    pub success: bool,
    pub error: Option<String>,
}

impl RequestMetrics {
    pub fn mean_inter_token_latency(&self) -> Option<Duration> {
        if self.inter_token_latencies.is_empty() {
            return None;
        }
        let total_nanos: u128 = self.inter_token_latencies.iter().map(|d| d.as_nanos()).sum();
        let mean_nanos = total_nanos / self.inter_token_latencies.len() as u128;
        Some(Duration::from_nanos(mean_nanos as u64))
    }

    pub fn median_inter_token_latency(&self) -> Option<Duration> {
        if self.inter_token_latencies.is_empty() {
            return None;
        }
        let mut sorted = self.inter_token_latencies.clone();
        sorted.sort();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            let sum = sorted[mid - 1].as_nanos() + sorted[mid].as_nanos();
            Some(Duration::from_nanos((sum / 2) as u64))
        } else {
            Some(sorted[mid])
        }
    }

    pub fn min_inter_token_latency(&self) -> Option<Duration> {
        self.inter_token_latencies.iter().min().copied()
    }

    pub fn max_inter_token_latency(&self) -> Option<Duration> {
        self.inter_token_latencies.iter().max().copied()
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Aggregated metrics across a strategy leg's requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub session_id: SessionId,
    pub strategy_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,

    pub ttft_distribution: LatencyDistribution,
    pub inter_token_distribution: LatencyDistribution,
    pub total_latency_distribution: LatencyDistribution,
    pub throughput: ThroughputStats,

    pub total_input_tokens: u64,
    pub total_output_tokens: u64,

    /// Requests per model.
    pub model_breakdown: Vec<(String, u64)>,
}

impl AggregatedMetrics {
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        (self.successful_requests as f64 / self.total_requests as f64) * 100.0
    }

    pub fn duration(&self) -> Duration {
        let diff = self.end_time - self.start_time;
        Duration::from_millis(diff.num_milliseconds().max(0) as u64)
    }

    pub fn avg_tokens_per_request(&self) -> f64 {
        if self.successful_requests == 0 {
            return 0.0;
        }
        let total = self.total_input_tokens + self.total_output_tokens;
        total as f64 / self.successful_requests as f64
    }
}

/// Percentile statistics calculated with HDR Histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyDistribution {
    #[serde(with = "duration_nanos")]
    pub min: Duration,
    #[serde(with = "duration_nanos")]
    pub max: Duration,
    #[serde(with = "duration_nanos")]
    pub mean: Duration,
    #[serde(with = "duration_nanos")]
    pub std_dev: Duration,
    #[serde(with = "duration_nanos")]
    pub p50: Duration,
    #[serde(with = "duration_nanos")]
    pub p90: Duration,
    #[serde(with = "duration_nanos")]
    pub p95: Duration,
    #[serde(with = "duration_nanos")]
    pub p99: Duration,
    #[serde(with = "duration_nanos")]
    pub p99_9: Duration,
    pub sample_count: u64,
}

impl LatencyDistribution {
    pub fn empty() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
            mean: Duration::ZERO,
            std_dev: Duration::ZERO,
            p50: Duration::ZERO,
            p90: Duration::ZERO,
            p95: Duration::ZERO,
            p99: Duration::ZERO,
            p99_9: Duration::ZERO,
            sample_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    pub fn range(&self) -> Duration {
        self.max.saturating_sub(self.min)
    }
}

/// Token throughput statistics across a strategy leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputStats {
    pub mean_tokens_per_second: f64,
    pub min_tokens_per_second: f64,
    pub max_tokens_per_second: f64,
    pub std_dev_tokens_per_second: f64,
    pub p50_tokens_per_second: f64,
    pub p95_tokens_per_second: f64,
    pub p99_tokens_per_second: f64,
}

impl ThroughputStats {
    pub fn empty() -> Self {
        Self {
            mean_tokens_per_second: 0.0,
            min_tokens_per_second: 0.0,
            max_tokens_per_second: 0.0,
            std_dev_tokens_per_second: 0.0,
            p50_tokens_per_second: 0.0,
            p95_tokens_per_second: 0.0,
            p99_tokens_per_second: 0.0,
        }
    }
}

mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_nanos() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}

mod duration_vec_nanos {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &Vec<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos: Vec<u64> = durations.iter().map(|d| d.as_nanos() as u64).collect();
        nanos.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = Vec::<u64>::deserialize(deserializer)?;
        Ok(nanos.into_iter().map(Duration::from_nanos).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_metrics() -> RequestMetrics {
        RequestMetrics {
            request_id: RequestId::new(),
            session_id: SessionId::new(),
            model: Some("gpt-4".to_string()),
            timestamp: Utc::now(),
            ttft: Duration::from_millis(100),
            total_latency: Duration::from_millis(1000),
            inter_token_latencies: vec![
                Duration::from_millis(10),
                Duration::from_millis(15),
                Duration::from_millis(12),
            ],
            input_tokens: 100,
            output_tokens: 50,
            tokens_per_second: 50.0,
            success: true,
            error: None,
        }
    }

    #[test]
    fn request_metrics_serialization_roundtrips() {
        let metrics = sample_metrics();
        let json = serde_json::to_string(&metrics).unwrap();
        let deserialized: RequestMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(metrics.request_id, deserialized.request_id);
        assert_eq!(metrics.ttft, deserialized.ttft);
    }

    #[test]
    fn mean_inter_token_latency_averages_the_samples() {
        let metrics = sample_metrics();
        assert_eq!(metrics.mean_inter_token_latency().unwrap(), Duration::from_millis(12));
    }

    #[test]
    fn median_inter_token_latency_with_even_count_averages_the_middle_pair() {
        let mut metrics = sample_metrics();
        metrics.inter_token_latencies = vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(30),
            Duration::from_millis(40),
        ];
        assert_eq!(metrics.median_inter_token_latency().unwrap(), Duration::from_millis(25));
    }

    #[test]
    fn total_tokens_sums_input_and_output() {
        let metrics = sample_metrics();
        assert_eq!(metrics.total_tokens(), 150);
    }

    #[test]
    fn latency_distribution_empty_has_zero_range() {
        let dist = LatencyDistribution::empty();
        assert!(dist.is_empty());
        assert_eq!(dist.range(), Duration::ZERO);
    }

    fn sample_aggregated(total: u64, successful: u64, input_tokens: u64, output_tokens: u64) -> AggregatedMetrics {
        AggregatedMetrics {
            session_id: SessionId::new(),
            strategy_name: "synchronous".to_string(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            total_requests: total,
            successful_requests: successful,
            failed_requests: total.saturating_sub(successful),
            ttft_distribution: LatencyDistribution::empty(),
            inter_token_distribution: LatencyDistribution::empty(),
            total_latency_distribution: LatencyDistribution::empty(),
            throughput: ThroughputStats::empty(),
            total_input_tokens: input_tokens,
            total_output_tokens: output_tokens,
            model_breakdown: Vec::new(),
        }
    }

    proptest! {
        #[test]
        fn success_rate_always_falls_within_zero_and_one_hundred(
            total in 0u64..10_000,
            successful in 0u64..10_000,
        ) {
            let successful = successful.min(total);
            let metrics = sample_aggregated(total, successful, 0, 0);
            let rate = metrics.success_rate();
            prop_assert!(rate >= 0.0 && rate <= 100.0);
            if total == 0 {
                prop_assert_eq!(rate, 0.0);
            }
        }

        #[test]
        fn avg_tokens_per_request_never_exceeds_total_tokens(
            successful in 1u64..1_000,
            input_tokens in 0u64..100_000,
            output_tokens in 0u64..100_000,
        ) {
            let metrics = sample_aggregated(successful, successful, input_tokens, output_tokens);
            let avg = metrics.avg_tokens_per_request();
            let total_tokens = (input_tokens + output_tokens) as f64;
            prop_assert!(avg >= 0.0 && avg <= total_tokens);
        }
    }
}
