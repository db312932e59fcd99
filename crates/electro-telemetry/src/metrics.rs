//! Dispatch metrics.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `electro_requests_total` | Counter | `method`, `status` | Requests answered |
//! | `electro_request_duration_seconds` | Histogram | `method` | Request latency |
//! | `electro_handler_calls_total` | Counter | `handler` | Handler invocations |
//! | `electro_route_matches_total` | Counter | `pattern` | Route table matches |
//! | `electro_dispatch_unwinds_total` | Counter | `kind` | Stacks left by an error |
//!
//! Recording functions work whether or not a recorder is installed; without
//! one they are no-ops.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Requests answered.
pub const REQUESTS_TOTAL: &str = "electro_requests_total";
/// Request latency.
pub const REQUEST_DURATION_SECONDS: &str = "electro_request_duration_seconds";
/// Handler invocations.
pub const HANDLER_CALLS_TOTAL: &str = "electro_handler_calls_total";
/// Route table matches.
pub const ROUTE_MATCHES_TOTAL: &str = "electro_route_matches_total";
/// Stacks unwound by an error.
pub const DISPATCH_UNWINDS_TOTAL: &str = "electro_dispatch_unwinds_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the global Prometheus recorder.
///
/// Rendering is available through [`render_metrics`] afterwards.
///
/// # Errors
///
/// Returns [`TelemetryError::MetricsInit`] when a recorder is already
/// installed or the buckets are invalid.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&config.duration_buckets)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();
    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if [`init_metrics`] has not run.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests dispatched");
    describe_histogram!(REQUEST_DURATION_SECONDS, "Request dispatch duration in seconds");
    describe_counter!(HANDLER_CALLS_TOTAL, "Total handler invocations by handler");
    describe_counter!(ROUTE_MATCHES_TOTAL, "Total route matches by pattern");
    describe_counter!(DISPATCH_UNWINDS_TOTAL, "Total stacks unwound by an error, by error kind");
}

/// Records a completed request.
pub fn record_request(method: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(duration.as_secs_f64());
}

/// Records one handler invocation.
pub fn record_handler_call(handler: &'static str) {
    counter!(HANDLER_CALLS_TOTAL, "handler" => handler).increment(1);
}

/// Records a route match.
pub fn record_route_match(pattern: &str) {
    counter!(ROUTE_MATCHES_TOTAL, "pattern" => pattern.to_string()).increment(1);
}

/// Records a stack unwound by an error of `kind`.
pub fn record_unwind(kind: &'static str) {
    counter!(DISPATCH_UNWINDS_TOTAL, "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.duration_buckets.len(), 12);
    }

    #[test]
    fn test_disabled_init_is_noop() {
        let config = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_recording_without_recorder() {
        record_request("GET", 200, Duration::from_millis(12));
        record_handler_call("router");
        record_route_match("/users/@id");
        record_unwind("application");
    }
}
