//! Statistical aggregation of collected metrics into percentile
//! distributions, and the `genbench_scheduler::Aggregator` adapter that
//! feeds a scheduler run's events straight into a collector.

use crate::collector::{CollectorConfig, MetricsCollector, MetricsError};
use crate::types::{AggregatedMetrics, LatencyDistribution, RequestMetrics, ThroughputStats};
use chrono::Utc;
use genbench_core::SessionId;
use genbench_scheduler::{ResponseSummary, SchedulerEvent};
use hdrhistogram::Histogram;
use std::time::Duration;
use tracing::debug;

pub struct MetricsAggregator;

impl MetricsAggregator {
    pub fn aggregate(collector: &MetricsCollector, strategy_name: &str) -> Result<AggregatedMetrics, MetricsError> {
        let snapshot = collector.get_state_snapshot()?;

        if snapshot.request_metrics.is_empty() {
            return Err(MetricsError::NoMetrics);
        }

        debug!(
            total_requests = snapshot.request_metrics.len(),
            successful = snapshot.successful_requests,
            failed = snapshot.failed_requests,
            "aggregating metrics"
        );

        let start_time = snapshot.request_metrics.iter().map(|m| m.timestamp).min().unwrap();
        let end_time = snapshot.request_metrics.iter().map(|m| m.timestamp).max().unwrap();

        let ttft_distribution = Self::calculate_latency_distribution(&snapshot.global_histograms.ttft)?;
        let inter_token_distribution = Self::calculate_latency_distribution(&snapshot.global_histograms.inter_token)?;
        let total_latency_distribution = Self::calculate_latency_distribution(&snapshot.global_histograms.total_latency)?;
        let throughput = Self::calculate_throughput_stats(&snapshot.global_histograms.throughput)?;

        let model_breakdown: Vec<(String, u64)> = snapshot.model_counts.into_iter().collect();

        Ok(AggregatedMetrics {
            session_id: snapshot.session_id,
            strategy_name: strategy_name.to_string(),
            start_time,
            end_time,
            total_requests: snapshot.request_metrics.len() as u64,
            successful_requests: snapshot.successful_requests,
            failed_requests: snapshot.failed_requests,
            ttft_distribution,
            inter_token_distribution,
            total_latency_distribution,
            throughput,
            total_input_tokens: snapshot.total_input_tokens,
            total_output_tokens: snapshot.total_output_tokens,
            model_breakdown,
        })
    }

    fn calculate_latency_distribution(histogram: &Histogram<u64>) -> Result<LatencyDistribution, MetricsError> {
        if histogram.is_empty() {
            return Ok(LatencyDistribution::empty());
        }

        Ok(LatencyDistribution {
            min: Duration::from_nanos(histogram.min()),
            max: Duration::from_nanos(histogram.max()),
            mean: Duration::from_nanos(histogram.mean() as u64),
            std_dev: Duration::from_nanos(histogram.stdev() as u64),
            p50: Duration::from_nanos(histogram.value_at_quantile(0.50)),
            p90: Duration::from_nanos(histogram.value_at_quantile(0.90)),
            p95: Duration::from_nanos(histogram.value_at_quantile(0.95)),
            p99: Duration::from_nanos(histogram.value_at_quantile(0.99)),
            p99_9: Duration::from_nanos(histogram.value_at_quantile(0.999)),
            sample_count: histogram.len(),
        })
    }

    /// Throughput histogram stores values as tokens/sec * 1000 for precision.
    fn calculate_throughput_stats(histogram: &Histogram<u64>) -> Result<ThroughputStats, MetricsError> {
        if histogram.is_empty() {
            return Ok(ThroughputStats::empty());
        }

        Ok(ThroughputStats {
            mean_tokens_per_second: histogram.mean() / 1000.0,
            min_tokens_per_second: histogram.min() as f64 / 1000.0,
            max_tokens_per_second: histogram.max() as f64 / 1000.0,
            std_dev_tokens_per_second: histogram.stdev() / 1000.0,
            p50_tokens_per_second: histogram.value_at_quantile(0.50) as f64 / 1000.0,
            p95_tokens_per_second: histogram.value_at_quantile(0.95) as f64 / 1000.0,
            p99_tokens_per_second: histogram.value_at_quantile(0.99) as f64 / 1000.0,
        })
    }
}

/// Converts one `ResponseSummary` into a `RequestMetrics` row. TTFT is
/// `first_iter_time - start_time`; inter-token latencies are the gaps
/// between the response's iter events, reconstructed from the averaged
/// spacing between first and last iter since the summary doesn't retain
/// every individual timestamp.
fn response_to_metrics(summary: &ResponseSummary, model: Option<String>) -> RequestMetrics {
    let total_latency = summary.end_time.duration_since(summary.start_time);
    let ttft = summary
        .first_iter_time
        .map(|t| t.duration_since(summary.start_time))
        .unwrap_or(Duration::ZERO);

    let inter_token_latencies = match (summary.first_iter_time, summary.last_iter_time, summary.iter_count) {
        (Some(first), Some(last), count) if count > 1 => {
            let span = last.duration_since(first);
            let gap = span / (count as u32 - 1).max(1);
            vec![gap; (count - 1) as usize]
        }
        _ => Vec::new(),
    };

    let output_tokens = summary.response_output_tokens.unwrap_or(summary.iter_count);
    let tokens_per_second = if total_latency.as_secs_f64() > 0.0 {
        output_tokens as f64 / total_latency.as_secs_f64()
    } else {
        0.0
    };

    RequestMetrics {
        request_id: summary.request_id,
        session_id: SessionId::new(),
        model,
        timestamp: Utc::now(),
        ttft,
        total_latency,
        inter_token_latencies,
        input_tokens: summary.response_prompt_tokens.or(summary.request_prompt_tokens).unwrap_or(0),
        output_tokens,
        tokens_per_second,
        success: summary.is_success(),
        error: summary.error.as_ref().map(|e| e.to_string()),
    }
}

/// Adapts a `MetricsCollector` to `genbench_scheduler::Aggregator` so a
/// `Benchmarker` leg can fold scheduler events straight into it.
pub struct SchedulerMetricsAggregator {
    collector: MetricsCollector,
    strategy_name: String,
}

impl SchedulerMetricsAggregator {
    pub fn new(session_id: SessionId, strategy_name: impl Into<String>) -> Self {
        Self {
            collector: MetricsCollector::with_defaults(session_id).expect("default histogram config is valid"),
            strategy_name: strategy_name.into(),
        }
    }
}

impl genbench_scheduler::Aggregator for SchedulerMetricsAggregator {
    type Output = Result<AggregatedMetrics, MetricsError>;

    fn add_result(&mut self, event: &SchedulerEvent) {
        if let SchedulerEvent::RequestComplete { request, response, .. } = event {
            let metrics = response_to_metrics(response, Some(request.model.clone()));
            let _ = self.collector.record(metrics);
        }
    }

    fn compile(self) -> Self::Output {
        MetricsAggregator::aggregate(&self.collector, &self.strategy_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectorConfig;
    use genbench_core::RequestId;

    fn create_test_metrics(ttft_ms: u64, total_ms: u64, tokens_per_sec: f64) -> RequestMetrics {
        RequestMetrics {
            request_id: RequestId::new(),
            session_id: SessionId::new(),
            model: Some("gpt-4".to_string()),
            timestamp: Utc::now(),
            ttft: Duration::from_millis(ttft_ms),
            total_latency: Duration::from_millis(total_ms),
            inter_token_latencies: vec![Duration::from_millis(10), Duration::from_millis(15), Duration::from_millis(12)],
            input_tokens: 100,
            output_tokens: 50,
            tokens_per_second: tokens_per_sec,
            success: true,
            error: None,
        }
    }

    #[test]
    fn aggregate_empty_collector_errors() {
        let collector = MetricsCollector::with_defaults(SessionId::new()).unwrap();
        let result = MetricsAggregator::aggregate(&collector, "synchronous");
        assert!(matches!(result.unwrap_err(), MetricsError::NoMetrics));
    }

    #[test]
    fn aggregate_multiple_metrics_computes_percentiles() {
        let collector = MetricsCollector::new(SessionId::new(), CollectorConfig::default()).unwrap();
        for i in 0..100 {
            collector.record(create_test_metrics(100 + i, 1000 + i, 50.0)).unwrap();
        }

        let aggregated = MetricsAggregator::aggregate(&collector, "synchronous").unwrap();
        assert_eq!(aggregated.total_requests, 100);
        assert!(aggregated.ttft_distribution.p99 >= aggregated.ttft_distribution.p50);
    }

    #[test]
    fn aggregate_with_failures_reports_success_rate() {
        let collector = MetricsCollector::with_defaults(SessionId::new()).unwrap();
        for i in 0..90 {
            collector.record(create_test_metrics(100 + i, 1000 + i, 50.0)).unwrap();
        }
        for _ in 0..10 {
            let mut metrics = create_test_metrics(100, 1000, 50.0);
            metrics.success = false;
            metrics.error = Some("backend error".to_string());
            collector.record(metrics).unwrap();
        }

        let aggregated = MetricsAggregator::aggregate(&collector, "synchronous").unwrap();
        assert_eq!(aggregated.success_rate(), 90.0);
    }
}
