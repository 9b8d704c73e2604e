//! Multi-format export system for genbench benchmark reports.
//!
//! Provides exporters for:
//! - JSON (human-readable and compact)
//! - Console (colored table output)
//! - Prometheus (exposition format)
//! - CSV (for data analysis)
//!
//! # Example
//!
//! ```no_run
//! use genbench_exporters::{Exporter, JsonExporter, ConsoleExporter};
//! use genbench_metrics::AggregatedMetrics;
//!
//! # fn get_metrics() -> AggregatedMetrics { unimplemented!() }
//! let metrics = get_metrics();
//!
//! let json_exporter = JsonExporter::new(true);
//! let json_output = json_exporter.export(&metrics).unwrap();
//!
//! let console_exporter = ConsoleExporter::new();
//! console_exporter.export(&metrics).unwrap();
//! ```

use genbench_metrics::{AggregatedMetrics, RequestMetrics};
use thiserror::Error;

pub mod console;
pub mod csv;
pub mod json;
pub mod prometheus;

pub use console::ConsoleExporter;
pub use csv::CsvExporter;
pub use json::JsonExporter;
pub use prometheus::PrometheusExporter;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("format error: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Exports benchmark reports to a target format.
pub trait Exporter {
    fn export(&self, metrics: &AggregatedMetrics) -> Result<String>;
    fn export_requests(&self, requests: &[RequestMetrics]) -> Result<String>;

    fn export_to_file(&self, metrics: &AggregatedMetrics, path: &std::path::Path) -> Result<()> {
        let output = self.export(metrics)?;
        std::fs::write(path, output)?;
        Ok(())
    }

    fn export_requests_to_file(&self, requests: &[RequestMetrics], path: &std::path::Path) -> Result<()> {
        let output = self.export_requests(requests)?;
        std::fs::write(path, output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genbench_metrics::{LatencyDistribution, RequestId, SessionId, ThroughputStats};
    use std::time::Duration;

    pub(crate) fn create_test_metrics() -> AggregatedMetrics {
        AggregatedMetrics {
            session_id: SessionId::new(),
            strategy_name: "synchronous".to_string(),
            start_time: chrono::Utc::now(),
            end_time: chrono::Utc::now() + chrono::Duration::seconds(10),
            total_requests: 9,
            successful_requests: 9,
            failed_requests: 0,
            ttft_distribution: LatencyDistribution {
                min: Duration::from_millis(100),
                max: Duration::from_millis(300),
                mean: Duration::from_millis(150),
                std_dev: Duration::from_millis(50),
                p50: Duration::from_millis(150),
                p90: Duration::from_millis(250),
                p95: Duration::from_millis(280),
                p99: Duration::from_millis(295),
                p99_9: Duration::from_millis(299),
                sample_count: 9,
            },
            inter_token_distribution: LatencyDistribution {
                min: Duration::from_millis(5),
                max: Duration::from_millis(20),
                mean: Duration::from_millis(10),
                std_dev: Duration::from_millis(3),
                p50: Duration::from_millis(10),
                p90: Duration::from_millis(15),
                p95: Duration::from_millis(18),
                p99: Duration::from_millis(19),
                p99_9: Duration::from_millis(20),
                sample_count: 27,
            },
            total_latency_distribution: LatencyDistribution {
                min: Duration::from_secs(1),
                max: Duration::from_secs(3),
                mean: Duration::from_secs(2),
                std_dev: Duration::from_millis(500),
                p50: Duration::from_secs(2),
                p90: Duration::from_millis(2500),
                p95: Duration::from_millis(2800),
                p99: Duration::from_millis(2950),
                p99_9: Duration::from_millis(2990),
                sample_count: 9,
            },
            throughput: ThroughputStats {
                mean_tokens_per_second: 50.0,
                min_tokens_per_second: 30.0,
                max_tokens_per_second: 70.0,
                std_dev_tokens_per_second: 10.0,
                p50_tokens_per_second: 50.0,
                p95_tokens_per_second: 65.0,
                p99_tokens_per_second: 68.0,
            },
            total_input_tokens: 1000,
            total_output_tokens: 2000,
            model_breakdown: vec![("llama-3-8b".to_string(), 5), ("llama-3-70b".to_string(), 4)],
        }
    }

    pub(crate) fn create_test_requests() -> Vec<RequestMetrics> {
        vec![
            RequestMetrics {
                request_id: RequestId::new(),
                session_id: SessionId::new(),
                model: Some("llama-3-8b".to_string()),
                timestamp: chrono::Utc::now(),
                ttft: Duration::from_millis(150),
                total_latency: Duration::from_secs(2),
                inter_token_latencies: vec![Duration::from_millis(10), Duration::from_millis(15), Duration::from_millis(12)],
                input_tokens: 100,
                output_tokens: 200,
                tokens_per_second: 50.0,
                success: true,
                error: None,
            },
            RequestMetrics {
                request_id: RequestId::new(),
                session_id: SessionId::new(),
                model: Some("llama-3-70b".to_string()),
                timestamp: chrono::Utc::now(),
                ttft: Duration::from_millis(180),
                total_latency: Duration::from_secs(3),
                inter_token_latencies: vec![Duration::from_millis(8), Duration::from_millis(12), Duration::from_millis(10)],
                input_tokens: 150,
                output_tokens: 300,
                tokens_per_second: 55.0,
                success: true,
                error: None,
            },
        ]
    }

    #[test]
    fn json_exporter_satisfies_the_exporter_trait() {
        let metrics = create_test_metrics();
        let exporter = JsonExporter::new(false);
        assert!(exporter.export(&metrics).is_ok());
    }
}
