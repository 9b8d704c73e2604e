//! Metrics collector using HDR Histogram for accurate percentile
//! calculation across TTFT, inter-token latency, total latency, and
//! token throughput.

use crate::types::RequestMetrics;
use genbench_core::{RequestId, SessionId};
use hdrhistogram::Histogram;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Maximum value tracked in latency histograms, in nanoseconds.
    pub max_value_nanos: u64,
    /// Significant digits of histogram precision (1-5).
    pub significant_digits: u8,
    /// Whether to also track per-model histograms.
    pub track_per_model: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_value_nanos: 60_000_000_000,
            significant_digits: 3,
            track_per_model: true,
        }
    }
}

impl CollectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_value_seconds(mut self, seconds: u64) -> Self {
        self.max_value_nanos = seconds * 1_000_000_000;
        self
    }

    pub fn with_significant_digits(mut self, digits: u8) -> Self {
        self.significant_digits = digits.clamp(1, 5);
        self
    }

    pub fn with_per_model_tracking(mut self, enabled: bool) -> Self {
        self.track_per_model = enabled;
        self
    }
}

#[derive(Clone)]
pub struct HistogramSet {
    pub(crate) ttft: Histogram<u64>,
    pub(crate) inter_token: Histogram<u64>,
    pub(crate) total_latency: Histogram<u64>,
    /// Stored as tokens/sec * 1000 for precision.
    pub(crate) throughput: Histogram<u64>,
}

impl HistogramSet {
    fn new(config: &CollectorConfig) -> Result<Self, MetricsError> {
        let create_histogram = || {
            Histogram::new_with_max(config.max_value_nanos, config.significant_digits)
                .map_err(|e| MetricsError::HistogramCreation(e.to_string()))
        };

        Ok(Self {
            ttft: create_histogram()?,
            inter_token: create_histogram()?,
            total_latency: create_histogram()?,
            throughput: Histogram::new_with_max(1_000_000_000, config.significant_digits)
                .map_err(|e| MetricsError::HistogramCreation(e.to_string()))?,
        })
    }

    fn record(&mut self, metrics: &RequestMetrics) -> Result<(), MetricsError> {
        self.ttft
            .record(metrics.ttft.as_nanos() as u64)
            .map_err(|e| MetricsError::HistogramRecord(e.to_string()))?;

        self.total_latency
            .record(metrics.total_latency.as_nanos() as u64)
            .map_err(|e| MetricsError::HistogramRecord(e.to_string()))?;

        for latency in &metrics.inter_token_latencies {
            self.inter_token
                .record(latency.as_nanos() as u64)
                .map_err(|e| MetricsError::HistogramRecord(e.to_string()))?;
        }

        let throughput_scaled = (metrics.tokens_per_second * 1000.0) as u64;
        self.throughput
            .record(throughput_scaled)
            .map_err(|e| MetricsError::HistogramRecord(e.to_string()))?;

        Ok(())
    }
}

struct CollectorState {
    session_id: SessionId,
    config: CollectorConfig,
    global_histograms: HistogramSet,
    model_histograms: HashMap<String, HistogramSet>,
    request_metrics: Vec<RequestMetrics>,
    model_counts: HashMap<String, u64>,
    successful_requests: u64,
    failed_requests: u64,
    total_input_tokens: u64,
    total_output_tokens: u64,
}

impl CollectorState {
    fn new(session_id: SessionId, config: CollectorConfig) -> Result<Self, MetricsError> {
        Ok(Self {
            global_histograms: HistogramSet::new(&config)?,
            config,
            session_id,
            model_histograms: HashMap::new(),
            request_metrics: Vec::new(),
            model_counts: HashMap::new(),
            successful_requests: 0,
            failed_requests: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
        })
    }

    fn record(&mut self, metrics: RequestMetrics) -> Result<(), MetricsError> {
        if metrics.success {
            self.successful_requests += 1;
            self.global_histograms.record(&metrics)?;

            if self.config.track_per_model {
                if let Some(model) = metrics.model.clone() {
                    let hist = self
                        .model_histograms
                        .entry(model.clone())
                        .or_insert_with(|| HistogramSet::new(&self.config).expect("histogram config is valid"));
                    hist.record(&metrics)?;
                    *self.model_counts.entry(model).or_insert(0) += 1;
                }
            }

            self.total_input_tokens += metrics.input_tokens;
            self.total_output_tokens += metrics.output_tokens;
        } else {
            self.failed_requests += 1;
        }

        self.request_metrics.push(metrics);
        Ok(())
    }

    fn len(&self) -> usize {
        self.request_metrics.len()
    }

    fn is_empty(&self) -> bool {
        self.request_metrics.is_empty()
    }
}

/// Thread-safe collector shareable across worker tasks via `Arc`.
#[derive(Clone)]
pub struct MetricsCollector {
    state: Arc<Mutex<CollectorState>>,
}

impl MetricsCollector {
    pub fn new(session_id: SessionId, config: CollectorConfig) -> Result<Self, MetricsError> {
        let state = CollectorState::new(session_id, config)?;
        Ok(Self { state: Arc::new(Mutex::new(state)) })
    }

    pub fn with_defaults(session_id: SessionId) -> Result<Self, MetricsError> {
        Self::new(session_id, CollectorConfig::default())
    }

    pub fn record(&self, metrics: RequestMetrics) -> Result<(), MetricsError> {
        let mut state = self.state.lock().map_err(|e| MetricsError::LockError(e.to_string()))?;
        debug!(
            request_id = %metrics.request_id,
            model = ?metrics.model,
            success = metrics.success,
            "recording request metrics"
        );
        state.record(metrics)
    }

    pub fn get_request(&self, request_id: RequestId) -> Result<Option<RequestMetrics>, MetricsError> {
        let state = self.state.lock().map_err(|e| MetricsError::LockError(e.to_string()))?;
        Ok(state.request_metrics.iter().find(|m| m.request_id == request_id).cloned())
    }

    pub fn get_all_requests(&self) -> Result<Vec<RequestMetrics>, MetricsError> {
        let state = self.state.lock().map_err(|e| MetricsError::LockError(e.to_string()))?;
        Ok(state.request_metrics.clone())
    }

    pub fn len(&self) -> Result<usize, MetricsError> {
        let state = self.state.lock().map_err(|e| MetricsError::LockError(e.to_string()))?;
        Ok(state.len())
    }

    pub fn is_empty(&self) -> Result<bool, MetricsError> {
        let state = self.state.lock().map_err(|e| MetricsError::LockError(e.to_string()))?;
        Ok(state.is_empty())
    }

    pub fn session_id(&self) -> Result<SessionId, MetricsError> {
        let state = self.state.lock().map_err(|e| MetricsError::LockError(e.to_string()))?;
        Ok(state.session_id)
    }

    #[doc(hidden)]
    pub fn get_state_snapshot(&self) -> Result<CollectorStateSnapshot, MetricsError> {
        let state = self.state.lock().map_err(|e| MetricsError::LockError(e.to_string()))?;
        Ok(CollectorStateSnapshot {
            session_id: state.session_id,
            request_metrics: state.request_metrics.clone(),
            model_counts: state.model_counts.clone(),
            successful_requests: state.successful_requests,
            failed_requests: state.failed_requests,
            total_input_tokens: state.total_input_tokens,
            total_output_tokens: state.total_output_tokens,
            global_histograms: state.global_histograms.clone(),
        })
    }
}

#[doc(hidden)]
#[derive(Clone)]
pub struct CollectorStateSnapshot {
    pub session_id: SessionId,
    pub request_metrics: Vec<RequestMetrics>,
    pub model_counts: HashMap<String, u64>,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub global_histograms: HistogramSet,
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to create histogram: {0}")]
    HistogramCreation(String),
    #[error("failed to record value in histogram: {0}")]
    HistogramRecord(String),
    #[error("failed to acquire lock: {0}")]
    LockError(String),
    #[error("no metrics available for aggregation")]
    NoMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use genbench_core::{RequestId, SessionId};
    use std::time::Duration;

    fn create_test_metrics(model: &str, ttft_ms: u64, total_ms: u64, success: bool) -> RequestMetrics {
        RequestMetrics {
            request_id: RequestId::new(),
            session_id: SessionId::new(),
            model: Some(model.to_string()),
            timestamp: Utc::now(),
            ttft: Duration::from_millis(ttft_ms),
            total_latency: Duration::from_millis(total_ms),
            inter_token_latencies: vec![Duration::from_millis(10), Duration::from_millis(15)],
            input_tokens: 100,
            output_tokens: 50,
            tokens_per_second: 50.0,
            success,
            error: if success { None } else { Some("test error".to_string()) },
        }
    }

    #[test]
    fn collector_starts_empty() {
        let collector = MetricsCollector::with_defaults(SessionId::new()).unwrap();
        assert!(collector.is_empty().unwrap());
        assert_eq!(collector.len().unwrap(), 0);
    }

    #[test]
    fn record_tracks_success_and_failure_separately() {
        let collector = MetricsCollector::with_defaults(SessionId::new()).unwrap();
        collector.record(create_test_metrics("gpt-4", 100, 1000, true)).unwrap();
        collector.record(create_test_metrics("gpt-4", 100, 1000, false)).unwrap();
        assert_eq!(collector.len().unwrap(), 2);

        let snapshot = collector.get_state_snapshot().unwrap();
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
    }

    #[test]
    fn get_request_finds_by_id() {
        let collector = MetricsCollector::with_defaults(SessionId::new()).unwrap();
        let metrics = create_test_metrics("gpt-4", 100, 1000, true);
        let id = metrics.request_id;
        collector.record(metrics).unwrap();

        let found = collector.get_request(id).unwrap();
        assert_eq!(found.unwrap().request_id, id);
    }

    #[test]
    fn per_model_counts_are_tracked() {
        let collector = MetricsCollector::with_defaults(SessionId::new()).unwrap();
        for _ in 0..3 {
            collector.record(create_test_metrics("gpt-4", 100, 1000, true)).unwrap();
        }
        for _ in 0..2 {
            collector.record(create_test_metrics("gpt-3.5", 100, 1000, true)).unwrap();
        }

        let snapshot = collector.get_state_snapshot().unwrap();
        assert_eq!(snapshot.model_counts.get("gpt-4"), Some(&3));
        assert_eq!(snapshot.model_counts.get("gpt-3.5"), Some(&2));
    }
}
