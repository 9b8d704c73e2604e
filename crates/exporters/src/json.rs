//! JSON exporter for metrics
//!
//! Provides both human-readable (pretty-printed) and compact JSON output.

use crate::{Exporter, Result};
use genbench_metrics::{AggregatedMetrics, RequestMetrics};
use serde::Serialize;

/// JSON exporter with configurable formatting
#[derive(Debug, Clone)]
pub struct JsonExporter {
    /// Whether to pretty-print the output
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    ///
    /// * `pretty` - If true, output will be pretty-printed with indentation
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Create a compact JSON exporter (no pretty printing)
    pub fn compact() -> Self {
        Self::new(false)
    }

    /// Create a pretty-printed JSON exporter
    pub fn pretty() -> Self {
        Self::new(true)
    }

    /// Serialize any serializable value to JSON
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }

    /// Serialize one record per request as newline-delimited JSON, ignoring
    /// `pretty` (NDJSON readers expect one compact object per line). Lets a
    /// long benchmark run append results incrementally rather than holding
    /// every `RequestMetrics` in memory until the array can be closed.
    pub fn export_requests_ndjson(&self, requests: &[RequestMetrics]) -> Result<String> {
        let mut output = String::new();
        for request in requests {
            output.push_str(&serde_json::to_string(request)?);
            output.push('\n');
        }
        Ok(output)
    }
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Exporter for JsonExporter {
    fn export(&self, metrics: &AggregatedMetrics) -> Result<String> {
        self.serialize(metrics)
    }

    fn export_requests(&self, requests: &[RequestMetrics]) -> Result<String> {
        self.serialize(requests)
    }
}
